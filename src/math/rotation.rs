use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A 2D rotation stored as the sine and cosine of an angle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Rot {
    /// Sine of the rotation angle
    pub s: f64,

    /// Cosine of the rotation angle
    pub c: f64,
}

impl Rot {
    /// Creates a rotation from an angle in radians
    #[inline]
    pub fn new(angle: f64) -> Self {
        Self {
            s: angle.sin(),
            c: angle.cos(),
        }
    }

    /// Creates the identity rotation
    #[inline]
    pub fn identity() -> Self {
        Self { s: 0.0, c: 1.0 }
    }

    /// Sets the rotation from an angle in radians
    #[inline]
    pub fn set_angle(&mut self, angle: f64) {
        self.s = angle.sin();
        self.c = angle.cos();
    }

    /// Returns the rotation angle in radians in the range [-PI, PI]
    #[inline]
    pub fn angle(&self) -> f64 {
        self.s.atan2(self.c)
    }

    /// Returns the x axis of the rotated frame
    #[inline]
    pub fn x_axis(&self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Returns the y axis of the rotated frame
    #[inline]
    pub fn y_axis(&self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Composes two rotations, `self * other`
    #[inline]
    pub fn mul(&self, other: &Rot) -> Rot {
        // [c1 -s1][c2 -s2] = [c1c2-s1s2 -c1s2-s1c2]
        // [s1  c1][s2  c2]   [s1c2+c1s2 -s1s2+c1c2]
        Rot {
            s: self.s * other.c + self.c * other.s,
            c: self.c * other.c - self.s * other.s,
        }
    }

    /// Composes the inverse of this rotation with another, `self^T * other`
    #[inline]
    pub fn mul_t(&self, other: &Rot) -> Rot {
        Rot {
            s: self.c * other.s - self.s * other.c,
            c: self.c * other.c + self.s * other.s,
        }
    }

    /// Rotates a vector
    #[inline]
    pub fn rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Applies the inverse rotation to a vector
    #[inline]
    pub fn inv_rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }
}

impl Default for Rot {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}
