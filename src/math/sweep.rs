use crate::math::{Rot, Transform, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Interpolable rigid motion over a time step.
///
/// Stores the center-of-mass positions and angles at the start and end of the
/// current step so that continuous collision detection can evaluate a body's
/// pose at any intermediate time. The body origin is offset from the center
/// of mass by `local_center`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Sweep {
    /// Center of mass in body-local coordinates
    pub local_center: Vec2,

    /// World center of mass at the start of the step
    pub c0: Vec2,

    /// World center of mass at the end of the step
    pub c: Vec2,

    /// Angle at the start of the step
    pub a0: f64,

    /// Angle at the end of the step
    pub a: f64,

    /// Fraction of the step already consumed; `c0`/`a0` are sampled here
    pub alpha0: f64,
}

impl Sweep {
    /// Returns the interpolated transform at `beta`, where `beta = 0`
    /// corresponds to `alpha0` and `beta = 1` to the end of the step
    pub fn transform_at(&self, beta: f64) -> Transform {
        let c = self.c0 * (1.0 - beta) + self.c * beta;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::new(angle);

        // Shift from the center of mass back to the body origin.
        Transform::new(c - q.rotate(self.local_center), q)
    }

    /// Advances the sweep start to `alpha`, with `alpha0 <= alpha < 1`
    pub fn advance(&mut self, alpha: f64) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += (self.c - self.c0) * beta;
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Normalizes the angles to the range [-2*PI, 2*PI]
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * std::f64::consts::PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}
