use crate::core::config::{MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use crate::error::PhysicsError;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::MassData;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A solid convex polygon with counter-clockwise winding.
///
/// Construction computes the convex hull of the input points, so the stored
/// vertex set is always convex; degenerate input is rejected.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PolygonShape {
    /// Hull vertices in counter-clockwise order
    pub vertices: Vec<Vec2>,

    /// Outward edge normals, one per vertex
    pub normals: Vec<Vec2>,

    /// Centroid of the hull in local coordinates
    pub centroid: Vec2,
}

impl PolygonShape {
    /// Creates a convex polygon from a set of points.
    ///
    /// The convex hull of the points is computed and vertices nearly
    /// coincident within the linear slop are welded. Fails when fewer than
    /// three distinct hull vertices remain or a coordinate is not finite.
    pub fn new(points: &[Vec2]) -> Result<Self> {
        if points.len() < 3 || points.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::InvalidParameter(format!(
                "Polygon requires 3 to {} vertices, got {}",
                MAX_POLYGON_VERTICES,
                points.len()
            )));
        }
        for p in points {
            if !p.is_valid() {
                return Err(PhysicsError::InvalidParameter(
                    "Polygon vertex is not finite".to_string(),
                ));
            }
        }

        // Weld nearly coincident points.
        let weld_tol = (0.5 * crate::core::config::LINEAR_SLOP).powi(2);
        let mut unique: Vec<Vec2> = Vec::with_capacity(points.len());
        for &p in points {
            if unique.iter().all(|v| v.distance_squared(&p) > weld_tol) {
                unique.push(p);
            }
        }

        if unique.len() < 3 {
            return Err(PhysicsError::InvalidParameter(
                "Polygon vertices are degenerate".to_string(),
            ));
        }

        // Gift wrapping from the rightmost point gives a counter-clockwise
        // convex hull.
        let mut i0 = 0;
        let mut x0 = unique[0].x;
        for (i, v) in unique.iter().enumerate().skip(1) {
            if v.x > x0 || (v.x == x0 && v.y < unique[i0].y) {
                i0 = i;
                x0 = v.x;
            }
        }

        let mut hull = Vec::with_capacity(unique.len());
        let mut ih = i0;
        loop {
            hull.push(ih);

            let mut ie = 0;
            for (j, _) in unique.iter().enumerate().skip(1) {
                if ie == ih {
                    ie = j;
                    continue;
                }

                let r = unique[ie] - unique[ih];
                let v = unique[j] - unique[ih];
                let c = r.cross(&v);
                if c < 0.0 || (c == 0.0 && v.length_squared() > r.length_squared()) {
                    ie = j;
                }
            }

            ih = ie;
            if ie == i0 {
                break;
            }
        }

        if hull.len() < 3 {
            return Err(PhysicsError::InvalidParameter(
                "Polygon is not convex or is degenerate".to_string(),
            ));
        }

        let vertices: Vec<Vec2> = hull.iter().map(|&i| unique[i]).collect();

        let mut normals = Vec::with_capacity(vertices.len());
        for i in 0..vertices.len() {
            let i2 = (i + 1) % vertices.len();
            let edge = vertices[i2] - vertices[i];
            if edge.length_squared() <= crate::math::EPSILON {
                return Err(PhysicsError::InvalidParameter(
                    "Polygon has a zero-length edge".to_string(),
                ));
            }
            normals.push(edge.perpendicular_cw().normalize());
        }

        let centroid = Self::compute_centroid(&vertices);

        Ok(Self {
            vertices,
            normals,
            centroid,
        })
    }

    /// Creates an axis-aligned box with the given half extents
    pub fn new_box(half_width: f64, half_height: f64) -> Self {
        Self {
            vertices: vec![
                Vec2::new(-half_width, -half_height),
                Vec2::new(half_width, -half_height),
                Vec2::new(half_width, half_height),
                Vec2::new(-half_width, half_height),
            ],
            normals: vec![
                Vec2::new(0.0, -1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(-1.0, 0.0),
            ],
            centroid: Vec2::zero(),
        }
    }

    /// Creates a box with the given half extents, centered at `center`
    /// and rotated by `angle`
    pub fn new_oriented_box(half_width: f64, half_height: f64, center: Vec2, angle: f64) -> Self {
        let mut shape = Self::new_box(half_width, half_height);
        let xf = Transform::from_position_angle(center, angle);

        for v in shape.vertices.iter_mut() {
            *v = xf.transform_point(*v);
        }
        for n in shape.normals.iter_mut() {
            *n = xf.q.rotate(*n);
        }
        shape.centroid = center;
        shape
    }

    /// Returns the skin radius of the polygon
    #[inline]
    pub fn radius(&self) -> f64 {
        POLYGON_RADIUS
    }

    fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
        // Triangle fan about the vertex mean; the mean keeps the triangles
        // well conditioned for thin hulls.
        let mut origin = Vec2::zero();
        for v in vertices {
            origin += *v;
        }
        origin /= vertices.len() as f64;

        let mut center = Vec2::zero();
        let mut area = 0.0;
        let inv3 = 1.0 / 3.0;

        for i in 0..vertices.len() {
            let e1 = vertices[i] - origin;
            let e2 = vertices[(i + 1) % vertices.len()] - origin;
            let triangle_area = 0.5 * e1.cross(&e2);
            area += triangle_area;
            center += (e1 + e2) * (triangle_area * inv3);
        }

        center / area + origin
    }

    /// Computes the world-space AABB of the polygon
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let mut lower = xf.transform_point(self.vertices[0]);
        let mut upper = lower;

        for v in self.vertices.iter().skip(1) {
            let w = xf.transform_point(*v);
            lower = lower.min(&w);
            upper = upper.max(&w);
        }

        let r = Vec2::new(self.radius(), self.radius());
        Aabb::new(lower - r, upper + r)
    }

    /// Computes mass properties at the given density by triangle
    /// decomposition about the vertex mean
    pub fn compute_mass(&self, density: f64) -> MassData {
        let mut origin = Vec2::zero();
        for v in &self.vertices {
            origin += *v;
        }
        origin /= self.vertices.len() as f64;

        let mut center = Vec2::zero();
        let mut area = 0.0;
        let mut inertia = 0.0;
        let inv3 = 1.0 / 3.0;

        for i in 0..self.vertices.len() {
            let e1 = self.vertices[i] - origin;
            let e2 = self.vertices[(i + 1) % self.vertices.len()] - origin;

            let d = e1.cross(&e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;

            center += (e1 + e2) * (triangle_area * inv3);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        center /= area;
        let center_local = center + origin;

        // Inertia relative to the local origin via the parallel axis theorem.
        let inertia_origin = density * inertia
            + mass * (center_local.length_squared() - center.length_squared());

        MassData {
            mass,
            center: center_local,
            inertia: inertia_origin,
        }
    }

    /// Returns whether a world point lies inside the polygon
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        let local = xf.q.inv_rotate(point - xf.p);

        for i in 0..self.vertices.len() {
            if self.normals[i].dot(&(local - self.vertices[i])) > 0.0 {
                return false;
            }
        }
        true
    }

    /// Casts a ray against the polygon by clipping the segment parameter
    /// interval against each face half-plane
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.q.inv_rotate(input.p1 - xf.p);
        let p2 = xf.q.inv_rotate(input.p2 - xf.p);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index: isize = -1;

        for i in 0..self.vertices.len() {
            // p = p1 + t * d; separation(t) = dot(normal, vertex - p)
            let numerator = self.normals[i].dot(&(self.vertices[i] - p1));
            let denominator = self.normals[i].dot(&d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else {
                if denominator < 0.0 && numerator < lower * denominator {
                    // The segment enters this half-plane.
                    lower = numerator / denominator;
                    index = i as isize;
                } else if denominator > 0.0 && numerator < upper * denominator {
                    // The segment exits this half-plane.
                    upper = numerator / denominator;
                }
            }

            if upper < lower {
                return None;
            }
        }

        debug_assert!(0.0 <= lower && lower <= input.max_fraction);

        if index >= 0 {
            Some(RayCastOutput {
                fraction: lower,
                normal: xf.q.rotate(self.normals[index as usize]),
            })
        } else {
            None
        }
    }
}
