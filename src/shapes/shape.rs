use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::{ChainShape, CircleShape, EdgeShape, PolygonShape};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Mass properties computed for a shape at a given density
#[derive(Debug, Clone, Copy, Default)]
pub struct MassData {
    /// Total mass of the shape
    pub mass: f64,

    /// Centroid of the shape in local coordinates
    pub center: Vec2,

    /// Rotational inertia about the local origin
    pub inertia: f64,
}

/// Discriminant of a shape variant, used to key narrow-phase dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeType {
    Circle,
    Edge,
    Polygon,
    Chain,
}

/// A collision shape.
///
/// Shapes form a closed set, so they are represented as tagged variants
/// rather than trait objects; the narrow phase dispatches on the pair of
/// variant tags. Chains decompose into edge children for collision purposes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Shape {
    Circle(CircleShape),
    Edge(EdgeShape),
    Polygon(PolygonShape),
    Chain(ChainShape),
}

impl Shape {
    /// Returns the type tag of the shape
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle(_) => ShapeType::Circle,
            Shape::Edge(_) => ShapeType::Edge,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Chain(_) => ShapeType::Chain,
        }
    }

    /// Returns the skin radius of the shape
    pub fn radius(&self) -> f64 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Edge(e) => e.radius(),
            Shape::Polygon(p) => p.radius(),
            Shape::Chain(c) => c.radius(),
        }
    }

    /// Returns the number of child primitives.
    /// Chains present one edge child per segment; other shapes have one.
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(c) => c.child_count(),
            _ => 1,
        }
    }

    /// Computes the world-space AABB of the given child under a transform
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        match self {
            Shape::Circle(c) => c.compute_aabb(xf),
            Shape::Edge(e) => e.compute_aabb(xf),
            Shape::Polygon(p) => p.compute_aabb(xf),
            Shape::Chain(c) => c.compute_aabb(xf, child_index),
        }
    }

    /// Computes mass properties at the given density
    pub fn compute_mass(&self, density: f64) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Edge(e) => e.compute_mass(),
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Chain(c) => c.compute_mass(),
        }
    }

    /// Casts a ray against the given child of this shape
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Chain(c) => c.ray_cast(input, xf, child_index),
        }
    }

    /// Returns whether a world point lies inside the shape.
    /// Open one-sided shapes (edges, chains) never contain points.
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.test_point(xf, point),
            Shape::Polygon(p) => p.test_point(xf, point),
            Shape::Edge(_) | Shape::Chain(_) => false,
        }
    }
}
