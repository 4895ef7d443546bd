use crate::core::config::{LINEAR_SLOP, POLYGON_RADIUS};
use crate::error::PhysicsError;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::{EdgeShape, MassData};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A chain of connected line segments.
///
/// Chains present one edge child per segment. Each child edge carries the
/// adjacent chain vertices as ghosts so edge collisions are one-sided and
/// internal vertices do not catch passing shapes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ChainShape {
    /// Chain vertices. For a loop the closing segment connects the last
    /// vertex back to the first.
    pub vertices: Vec<Vec2>,

    /// Whether the chain forms a closed loop
    pub is_loop: bool,

    /// Ghost vertex preceding the first vertex of an open chain
    pub prev_vertex: Option<Vec2>,

    /// Ghost vertex following the last vertex of an open chain
    pub next_vertex: Option<Vec2>,
}

impl ChainShape {
    /// Creates an open chain from a vertex list.
    /// Fails on fewer than two vertices or nearly coincident neighbors.
    pub fn new(vertices: &[Vec2]) -> Result<Self> {
        Self::validate(vertices, 2)?;
        Ok(Self {
            vertices: vertices.to_vec(),
            is_loop: false,
            prev_vertex: None,
            next_vertex: None,
        })
    }

    /// Creates a closed loop from a vertex list.
    /// Fails on fewer than three vertices or nearly coincident neighbors.
    pub fn new_loop(vertices: &[Vec2]) -> Result<Self> {
        Self::validate(vertices, 3)?;
        Ok(Self {
            vertices: vertices.to_vec(),
            is_loop: true,
            prev_vertex: None,
            next_vertex: None,
        })
    }

    fn validate(vertices: &[Vec2], min_count: usize) -> Result<()> {
        if vertices.len() < min_count {
            return Err(PhysicsError::InvalidParameter(format!(
                "Chain requires at least {} vertices, got {}",
                min_count,
                vertices.len()
            )));
        }
        for v in vertices {
            if !v.is_valid() {
                return Err(PhysicsError::InvalidParameter(
                    "Chain vertex is not finite".to_string(),
                ));
            }
        }
        for i in 1..vertices.len() {
            // Coincident vertices would produce zero-length edge children.
            if vertices[i - 1].distance_squared(&vertices[i]) <= (0.5 * LINEAR_SLOP).powi(2) {
                return Err(PhysicsError::InvalidParameter(
                    "Chain vertices are too close together".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the skin radius of the chain
    #[inline]
    pub fn radius(&self) -> f64 {
        POLYGON_RADIUS
    }

    /// Returns the number of edge children
    pub fn child_count(&self) -> usize {
        if self.is_loop {
            self.vertices.len()
        } else {
            self.vertices.len() - 1
        }
    }

    /// Builds the edge child at `index`, including ghost vertices from the
    /// adjacent chain segments
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        debug_assert!(index < self.child_count());
        let n = self.vertices.len();

        let v1 = self.vertices[index];
        let v2 = self.vertices[(index + 1) % n];

        let vertex0 = if index > 0 {
            Some(self.vertices[index - 1])
        } else if self.is_loop {
            Some(self.vertices[n - 1])
        } else {
            self.prev_vertex
        };

        let vertex3 = if index + 2 < n {
            Some(self.vertices[index + 2])
        } else if self.is_loop {
            Some(self.vertices[(index + 2) % n])
        } else {
            self.next_vertex
        };

        EdgeShape {
            vertex1: v1,
            vertex2: v2,
            vertex0,
            vertex3,
            one_sided: true,
        }
    }

    /// Computes the world-space AABB of the given edge child
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        let n = self.vertices.len();
        let v1 = xf.transform_point(self.vertices[child_index]);
        let v2 = xf.transform_point(self.vertices[(child_index + 1) % n]);

        let r = Vec2::new(self.radius(), self.radius());
        Aabb::new(v1.min(&v2) - r, v1.max(&v2) + r)
    }

    /// Chains have no area; mass is zero at the origin
    pub fn compute_mass(&self) -> MassData {
        MassData::default()
    }

    /// Casts a ray against the given edge child
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        let n = self.vertices.len();
        let edge = EdgeShape::new(
            self.vertices[child_index],
            self.vertices[(child_index + 1) % n],
        );
        edge.ray_cast(input, xf)
    }
}
