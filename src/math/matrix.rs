use crate::math::{Vec2, Vec3};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A 2x2 matrix stored in column-major order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Mat22 {
    /// First column
    pub ex: Vec2,

    /// Second column
    pub ey: Vec2,
}

impl Mat22 {
    /// Creates a new matrix from two columns
    #[inline]
    pub fn new(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    /// Creates a matrix from the four scalar entries
    #[inline]
    pub fn from_scalars(a11: f64, a12: f64, a21: f64, a22: f64) -> Self {
        Self {
            ex: Vec2::new(a11, a21),
            ey: Vec2::new(a12, a22),
        }
    }

    /// Creates the zero matrix
    #[inline]
    pub fn zero() -> Self {
        Self {
            ex: Vec2::zero(),
            ey: Vec2::zero(),
        }
    }

    /// Creates the identity matrix
    #[inline]
    pub fn identity() -> Self {
        Self {
            ex: Vec2::unit_x(),
            ey: Vec2::unit_y(),
        }
    }

    /// Multiplies the matrix by a vector
    #[inline]
    pub fn mul_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Returns the inverse of the matrix, or the zero matrix if singular
    pub fn inverse(&self) -> Mat22 {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat22 {
            ex: Vec2::new(det * d, -det * c),
            ey: Vec2::new(-det * b, det * a),
        }
    }

    /// Solves `A * x = b` without computing the full inverse.
    /// A singular matrix yields the zero vector.
    pub fn solve(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(
            det * (a22 * b.x - a12 * b.y),
            det * (a11 * b.y - a21 * b.x),
        )
    }
}

/// A 3x3 matrix stored in column-major order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Mat33 {
    /// First column
    pub ex: Vec3,

    /// Second column
    pub ey: Vec3,

    /// Third column
    pub ez: Vec3,
}

impl Mat33 {
    /// Creates a new matrix from three columns
    #[inline]
    pub fn new(ex: Vec3, ey: Vec3, ez: Vec3) -> Self {
        Self { ex, ey, ez }
    }

    /// Creates the zero matrix
    #[inline]
    pub fn zero() -> Self {
        Self {
            ex: Vec3::zero(),
            ey: Vec3::zero(),
            ez: Vec3::zero(),
        }
    }

    /// Multiplies the matrix by a vector
    #[inline]
    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        self.ex * v.x + self.ey * v.y + self.ez * v.z
    }

    /// Multiplies the upper-left 2x2 block by a vector
    #[inline]
    pub fn mul_vec22(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solves `A * x = b` for the full 3x3 system.
    /// A singular matrix yields the zero vector.
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(&self.ey.cross(&self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3::new(
            det * b.dot(&self.ey.cross(&self.ez)),
            det * self.ex.dot(&b.cross(&self.ez)),
            det * self.ex.dot(&self.ey.cross(&b)),
        )
    }

    /// Solves the upper-left 2x2 block of `A * x = b`.
    /// A singular block yields the zero vector.
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(
            det * (a22 * b.x - a12 * b.y),
            det * (a11 * b.y - a21 * b.x),
        )
    }

    /// Writes the inverse of the upper-left 2x2 block into `out`,
    /// zeroing the third row and column
    pub fn get_inverse22(&self, out: &mut Mat33) {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        out.ex = Vec3::new(det * d, -det * c, 0.0);
        out.ey = Vec3::new(-det * b, det * a, 0.0);
        out.ez = Vec3::zero();
    }

    /// Writes the symmetric inverse of the full matrix into `out`,
    /// treating the matrix as symmetric positive semi-definite
    pub fn get_sym_inverse33(&self, out: &mut Mat33) {
        let mut det = self.ex.dot(&self.ey.cross(&self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a13 = self.ez.x;
        let a22 = self.ey.y;
        let a23 = self.ez.y;
        let a33 = self.ez.z;

        out.ex = Vec3::new(
            det * (a22 * a33 - a23 * a23),
            det * (a13 * a23 - a12 * a33),
            det * (a12 * a23 - a13 * a22),
        );
        out.ey = Vec3::new(
            out.ex.y,
            det * (a11 * a33 - a13 * a13),
            det * (a13 * a12 - a11 * a23),
        );
        out.ez = Vec3::new(
            out.ex.z,
            out.ey.z,
            det * (a11 * a22 - a12 * a12),
        );
    }
}
