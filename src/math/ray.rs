use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Input for a ray cast, expressed as the segment `p1 -> p2` clipped to
/// `p1 + max_fraction * (p2 - p1)`
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RayCastInput {
    /// Start point of the segment
    pub p1: Vec2,

    /// End point of the segment
    pub p2: Vec2,

    /// Fraction of the segment to consider, in [0, 1]
    pub max_fraction: f64,
}

impl RayCastInput {
    /// Creates a new ray cast input covering the full segment
    #[inline]
    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        Self {
            p1,
            p2,
            max_fraction: 1.0,
        }
    }
}

/// Output of a successful ray cast. The hit point is
/// `p1 + fraction * (p2 - p1)`
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RayCastOutput {
    /// Surface normal at the hit point
    pub normal: Vec2,

    /// Fraction along the segment at which the hit occurred
    pub fraction: f64,
}
