use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::MassData;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A solid circle with a local-space center offset
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct CircleShape {
    /// Center of the circle in local coordinates
    pub position: Vec2,

    /// Radius of the circle
    pub radius: f64,
}

impl CircleShape {
    /// Creates a circle of the given radius centered at the local origin
    pub fn new(radius: f64) -> Self {
        Self {
            position: Vec2::zero(),
            radius,
        }
    }

    /// Creates a circle of the given radius centered at `position`
    pub fn with_position(position: Vec2, radius: f64) -> Self {
        Self { position, radius }
    }

    /// Computes the world-space AABB of the circle
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let p = xf.transform_point(self.position);
        let r = Vec2::new(self.radius, self.radius);
        Aabb::new(p - r, p + r)
    }

    /// Computes mass properties at the given density
    pub fn compute_mass(&self, density: f64) -> MassData {
        let mass = density * std::f64::consts::PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.position,
            // Inertia about the local origin: disk inertia plus the
            // parallel-axis term for the center offset.
            inertia: mass * (0.5 * self.radius * self.radius + self.position.length_squared()),
        }
    }

    /// Returns whether a world point lies inside the circle
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        let center = xf.transform_point(self.position);
        (point - center).length_squared() <= self.radius * self.radius
    }

    /// Casts a ray against the circle.
    ///
    /// Solves |p + t*d - c| = r as a quadratic in t; only entry hits with
    /// t in [0, max_fraction] are reported.
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let center = xf.transform_point(self.position);
        let s = input.p1 - center;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(&r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < crate::math::EPSILON {
            return None;
        }

        let t = -(c + sigma.sqrt());
        if 0.0 <= t && t <= input.max_fraction * rr {
            let fraction = t / rr;
            Some(RayCastOutput {
                fraction,
                normal: (s + r * fraction).normalize(),
            })
        } else {
            None
        }
    }
}
