use crate::core::config::MAX_MANIFOLD_POINTS;
use crate::math::{Transform, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// The feature kind that produced one side of a contact point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum FeatureType {
    #[default]
    Vertex,
    Face,
}

/// Identifies the vertex/face combination that produced a contact point.
/// Matching ids across narrow-phase updates lets accumulated impulses carry
/// over for warm starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ContactId {
    /// Feature index on shape A
    pub index_a: u8,

    /// Feature index on shape B
    pub index_b: u8,

    /// Feature kind on shape A
    pub type_a: FeatureType,

    /// Feature kind on shape B
    pub type_b: FeatureType,
}

impl ContactId {
    /// Swaps the A and B sides of the id
    pub fn swapped(self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// One contact point in a manifold, stored in the reference body's frame
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ManifoldPoint {
    /// Contact point, meaning depends on the manifold type
    pub local_point: Vec2,

    /// Accumulated normal impulse, persisted across steps
    pub normal_impulse: f64,

    /// Accumulated tangent impulse, persisted across steps
    pub tangent_impulse: f64,

    /// Feature id used to match points across updates
    pub id: ContactId,
}

/// Frame convention of a manifold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ManifoldType {
    /// Point on A, point on B; used for circle-circle
    #[default]
    Circles,

    /// Normal and reference point on face A; points local to B's frame
    /// clipped against A
    FaceA,

    /// Normal and reference point on face B
    FaceB,
}

/// Contact geometry between two fixtures: a normal and up to two points
/// expressed in the reference body's local frame. The normal always points
/// from A to B.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Manifold {
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],

    /// Normal in the reference body's local frame; unused for circles
    pub local_normal: Vec2,

    /// Reference point, meaning depends on the manifold type
    pub local_point: Vec2,

    pub manifold_type: ManifoldType,

    /// Number of active points
    pub point_count: usize,
}

/// World-space evaluation of a manifold: normal, contact points, and
/// penetration per point
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldManifold {
    /// World normal, pointing from A to B
    pub normal: Vec2,

    /// World contact points, midway between the overlapping surfaces
    pub points: [Vec2; MAX_MANIFOLD_POINTS],

    /// Signed penetration depth per point; negative when separated
    pub separations: [f64; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Evaluates a manifold in world coordinates given both transforms and
    /// skin radii
    pub fn initialize(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f64,
        xf_b: &Transform,
        radius_b: f64,
    ) -> Self {
        let mut out = WorldManifold::default();
        if manifold.point_count == 0 {
            return out;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                out.normal = Vec2::unit_x();
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points[0].local_point);
                if point_a.distance_squared(&point_b) > crate::math::EPSILON * crate::math::EPSILON {
                    out.normal = (point_b - point_a).normalize();
                }

                let c_a = point_a + out.normal * radius_a;
                let c_b = point_b - out.normal * radius_b;
                out.points[0] = (c_a + c_b) * 0.5;
                out.separations[0] = (c_b - c_a).dot(&out.normal);
            }
            ManifoldType::FaceA => {
                out.normal = xf_a.q.rotate(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_b.transform_point(manifold.points[i].local_point);
                    let c_a = clip_point
                        + out.normal * (radius_a - (clip_point - plane_point).dot(&out.normal));
                    let c_b = clip_point - out.normal * radius_b;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_b - c_a).dot(&out.normal);
                }
            }
            ManifoldType::FaceB => {
                out.normal = xf_b.q.rotate(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_a.transform_point(manifold.points[i].local_point);
                    let c_b = clip_point
                        + out.normal * (radius_b - (clip_point - plane_point).dot(&out.normal));
                    let c_a = clip_point - out.normal * radius_a;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_a - c_b).dot(&out.normal);
                }

                // Ensure the normal points from A to B.
                out.normal = -out.normal;
            }
        }

        out
    }
}

/// A vertex being clipped against a reference face
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipVertex {
    pub v: Vec2,
    pub id: ContactId,
}

/// Sutherland-Hodgman clipping of a two-vertex segment against a half-plane.
/// Returns the number of output vertices (0, 1, or 2).
pub fn clip_segment_to_line(
    v_out: &mut [ClipVertex; 2],
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f64,
    vertex_index_a: usize,
) -> usize {
    let mut count = 0;

    // Distances of the end points to the line.
    let distance0 = normal.dot(&v_in[0].v) - offset;
    let distance1 = normal.dot(&v_in[1].v) - offset;

    // Points behind the plane survive.
    if distance0 <= 0.0 {
        v_out[count] = v_in[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        v_out[count] = v_in[1];
        count += 1;
    }

    // The segment crosses the plane: emit the intersection vertex.
    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        v_out[count].v = v_in[0].v + (v_in[1].v - v_in[0].v) * interp;
        v_out[count].id = ContactId {
            index_a: vertex_index_a as u8,
            index_b: v_in[0].id.index_b,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Face,
        };
        count += 1;
    }

    count
}
