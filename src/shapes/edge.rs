use crate::core::config::POLYGON_RADIUS;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::MassData;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A line segment with optional adjacent ghost vertices.
///
/// Ghost vertices carry connectivity from a surrounding chain so that the
/// narrow phase can build one-sided normals and suppress internal-vertex
/// collisions.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct EdgeShape {
    /// First endpoint of the segment
    pub vertex1: Vec2,

    /// Second endpoint of the segment
    pub vertex2: Vec2,

    /// Ghost vertex preceding `vertex1`, if connected
    pub vertex0: Option<Vec2>,

    /// Ghost vertex following `vertex2`, if connected
    pub vertex3: Option<Vec2>,

    /// Whether collision is one-sided, with the solid side to the right of
    /// `vertex1 -> vertex2`. Chain children are always one-sided.
    pub one_sided: bool,
}

impl EdgeShape {
    /// Creates an isolated two-sided edge between two points
    pub fn new(vertex1: Vec2, vertex2: Vec2) -> Self {
        Self {
            vertex1,
            vertex2,
            vertex0: None,
            vertex3: None,
            one_sided: false,
        }
    }

    /// Creates a one-sided edge with ghost vertices carrying the adjacent
    /// connectivity
    pub fn new_one_sided(vertex0: Vec2, vertex1: Vec2, vertex2: Vec2, vertex3: Vec2) -> Self {
        Self {
            vertex1,
            vertex2,
            vertex0: Some(vertex0),
            vertex3: Some(vertex3),
            one_sided: true,
        }
    }

    /// Returns the skin radius of the edge
    #[inline]
    pub fn radius(&self) -> f64 {
        POLYGON_RADIUS
    }

    /// Computes the world-space AABB of the edge
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let v1 = xf.transform_point(self.vertex1);
        let v2 = xf.transform_point(self.vertex2);

        let r = Vec2::new(self.radius(), self.radius());
        Aabb::new(v1.min(&v2) - r, v1.max(&v2) + r)
    }

    /// Edges have no area; mass is zero at the segment midpoint
    pub fn compute_mass(&self) -> MassData {
        MassData {
            mass: 0.0,
            center: (self.vertex1 + self.vertex2) * 0.5,
            inertia: 0.0,
        }
    }

    /// Casts a ray against the edge.
    ///
    /// The ray is moved into local space, intersected with the infinite line
    /// through the segment, then checked against the segment span.
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.q.inv_rotate(input.p1 - xf.p);
        let p2 = xf.q.inv_rotate(input.p2 - xf.p);
        let d = p2 - p1;

        let v1 = self.vertex1;
        let v2 = self.vertex2;
        let e = v2 - v1;

        // Segment normal, pointing to the left of v1->v2.
        let mut normal = Vec2::new(e.y, -e.x).normalize();

        // t = dot(normal, v1 - p1) / dot(normal, d)
        let numerator = normal.dot(&(v1 - p1));
        let denominator = normal.dot(&d);

        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + d * t;

        // q = v1 + s * e must lie within the segment.
        let rr = e.length_squared();
        if rr == 0.0 {
            return None;
        }
        let s = (q - v1).dot(&e) / rr;
        if s < 0.0 || 1.0 < s {
            return None;
        }

        if numerator > 0.0 {
            normal = -normal;
        }

        Some(RayCastOutput {
            fraction: t,
            normal: xf.q.rotate(normal),
        })
    }
}
