use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A rigid motion from a body-local frame to the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position of the local origin in world space
    pub p: Vec2,

    /// Rotation of the local frame
    pub q: Rot,
}

impl Transform {
    /// Creates a new transform from a position and rotation
    #[inline]
    pub fn new(p: Vec2, q: Rot) -> Self {
        Self { p, q }
    }

    /// Creates the identity transform
    #[inline]
    pub fn identity() -> Self {
        Self {
            p: Vec2::zero(),
            q: Rot::identity(),
        }
    }

    /// Creates a transform from a position and an angle in radians
    #[inline]
    pub fn from_position_angle(p: Vec2, angle: f64) -> Self {
        Self { p, q: Rot::new(angle) }
    }

    /// Maps a local point into the world frame
    #[inline]
    pub fn transform_point(&self, v: Vec2) -> Vec2 {
        self.q.rotate(v) + self.p
    }

    /// Maps a world point into the local frame
    #[inline]
    pub fn inv_transform_point(&self, v: Vec2) -> Vec2 {
        self.q.inv_rotate(v - self.p)
    }

    /// Composes two transforms, `self * other`
    #[inline]
    pub fn mul(&self, other: &Transform) -> Transform {
        Transform {
            p: self.q.rotate(other.p) + self.p,
            q: self.q.mul(&other.q),
        }
    }

    /// Composes the inverse of this transform with another, `self^-1 * other`
    #[inline]
    pub fn mul_t(&self, other: &Transform) -> Transform {
        Transform {
            p: self.q.inv_rotate(other.p - self.p),
            q: self.q.mul_t(&other.q),
        }
    }
}

impl Default for Transform {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}
