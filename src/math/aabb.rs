use crate::math::{RayCastInput, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box for broad-phase collision detection.
/// Invariant: `lower <= upper` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Lower bound corner
    pub lower: Vec2,

    /// Upper bound corner
    pub upper: Vec2,
}

impl Aabb {
    /// Creates a new AABB from lower and upper bounds
    #[inline]
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// Creates an AABB centered at a position with the given half extents
    #[inline]
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            lower: center - half_extents,
            upper: center + half_extents,
        }
    }

    /// Returns whether the bounds are ordered and finite
    #[inline]
    pub fn is_valid(&self) -> bool {
        let d = self.upper - self.lower;
        d.x >= 0.0 && d.y >= 0.0 && self.lower.is_valid() && self.upper.is_valid()
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.lower + self.upper) * 0.5
    }

    /// Returns half the extents of the AABB
    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        (self.upper - self.lower) * 0.5
    }

    /// Returns the perimeter of the AABB
    #[inline]
    pub fn perimeter(&self) -> f64 {
        let d = self.upper - self.lower;
        2.0 * (d.x + d.y)
    }

    /// Checks if this AABB fully contains another AABB
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && self.upper.x >= other.upper.x
            && self.upper.y >= other.upper.y
    }

    /// Checks if this AABB overlaps another AABB
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.lower.x <= other.upper.x
            && self.lower.y <= other.upper.y
            && other.lower.x <= self.upper.x
            && other.lower.y <= self.upper.y
    }

    /// Returns the union of this AABB with another
    #[inline]
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            lower: self.lower.min(&other.lower),
            upper: self.upper.max(&other.upper),
        }
    }

    /// Expands this AABB to include another AABB
    #[inline]
    pub fn combine_with(&mut self, other: &Self) {
        self.lower = self.lower.min(&other.lower);
        self.upper = self.upper.max(&other.upper);
    }

    /// Returns this AABB inflated by a margin in all directions
    #[inline]
    pub fn extend(&self, margin: f64) -> Self {
        let m = Vec2::new(margin, margin);
        Self {
            lower: self.lower - m,
            upper: self.upper + m,
        }
    }

    /// Conservative segment intersection test used by tree ray casts.
    ///
    /// Returns the entry fraction along `p1 -> p2` if the segment pierces the
    /// box within `[0, max_fraction]`. From "Real-time Collision Detection",
    /// p. 179: clip the segment against each slab and track the running
    /// parameter interval.
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<f64> {
        let mut t_min = f64::MIN;
        let mut t_max = f64::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;
        let abs_d = d.abs();

        for i in 0..2 {
            if abs_d[i] < crate::math::EPSILON {
                // Parallel to this slab.
                if p[i] < self.lower[i] || self.upper[i] < p[i] {
                    return None;
                }
            } else {
                let inv_d = 1.0 / d[i];
                let mut t1 = (self.lower[i] - p[i]) * inv_d;
                let mut t2 = (self.upper[i] - p[i]) * inv_d;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        // The intersection must lie inside the queried segment span.
        if t_min < 0.0 || input.max_fraction < t_min {
            return None;
        }

        Some(t_min)
    }
}

impl Default for Aabb {
    #[inline]
    fn default() -> Self {
        Self {
            lower: Vec2::zero(),
            upper: Vec2::zero(),
        }
    }
}
