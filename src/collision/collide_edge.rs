use crate::collision::manifold::{
    clip_segment_to_line, ClipVertex, ContactId, FeatureType, Manifold, ManifoldType,
};
use crate::core::config::MAX_POLYGON_VERTICES;
use crate::math::{Transform, Vec2};
use crate::shapes::{CircleShape, EdgeShape, PolygonShape};

/// Builds the manifold between an edge and a circle.
///
/// The circle center is classified into the Voronoi regions of the segment.
/// Ghost vertices hand endpoint contacts over to the adjacent chain segment
/// so internal chain vertices never produce opposing normals.
pub fn collide_edge_and_circle(
    manifold: &mut Manifold,
    edge_a: &EdgeShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    // Circle center in the edge's frame.
    let q = xf_a.inv_transform_point(xf_b.transform_point(circle_b.position));

    let a = edge_a.vertex1;
    let b = edge_a.vertex2;
    let e = b - a;

    // Normal points to the left of the segment.
    let n = Vec2::new(e.y, -e.x);
    let offset = n.dot(&(q - a));

    if edge_a.one_sided && offset < 0.0 {
        return;
    }

    // Barycentric coordinates of the projection.
    let u = e.dot(&(b - q));
    let v = e.dot(&(q - a));

    let radius = edge_a.radius() + circle_b.radius;

    // Region A: closest to vertex1.
    if v <= 0.0 {
        let d = q - a;
        if d.length_squared() > radius * radius {
            return;
        }

        // The adjacent segment owns this contact if Q is behind vertex1.
        if let Some(a1) = edge_a.vertex0 {
            let e1 = a - a1;
            if e1.dot(&(a - q)) > 0.0 {
                return;
            }
        }

        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_normal = Vec2::zero();
        manifold.local_point = a;
        manifold.points[0].local_point = circle_b.position;
        manifold.points[0].id = ContactId {
            index_a: 0,
            index_b: 0,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Vertex,
        };
        return;
    }

    // Region B: closest to vertex2.
    if u <= 0.0 {
        let d = q - b;
        if d.length_squared() > radius * radius {
            return;
        }

        if let Some(b2) = edge_a.vertex3 {
            let e2 = b2 - b;
            if e2.dot(&(q - b)) > 0.0 {
                return;
            }
        }

        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_normal = Vec2::zero();
        manifold.local_point = b;
        manifold.points[0].local_point = circle_b.position;
        manifold.points[0].id = ContactId {
            index_a: 1,
            index_b: 0,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Vertex,
        };
        return;
    }

    // Region AB: closest to the interior of the segment.
    let den = e.length_squared();
    debug_assert!(den > 0.0);
    let p = (a * u + b * v) * (1.0 / den);
    let d = q - p;
    if d.length_squared() > radius * radius {
        return;
    }

    let normal = if offset < 0.0 { -n } else { n }.normalize();

    manifold.point_count = 1;
    manifold.manifold_type = ManifoldType::FaceA;
    manifold.local_normal = normal;
    manifold.local_point = a;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId {
        index_a: 0,
        index_b: 0,
        type_a: FeatureType::Face,
        type_b: FeatureType::Vertex,
    };
}

/// Polygon B transformed into the edge's frame
struct TempPolygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
}

#[derive(Clone, Copy, PartialEq)]
enum EpAxisType {
    EdgeA,
    EdgeB,
}

/// A candidate separating axis between the edge and the polygon
#[derive(Clone, Copy)]
struct EpAxis {
    kind: EpAxisType,
    index: usize,
    separation: f64,
    normal: Vec2,
}

fn compute_edge_separation(polygon_b: &TempPolygon, v1: Vec2, normal1: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        kind: EpAxisType::EdgeA,
        index: 0,
        separation: f64::MIN,
        normal: Vec2::zero(),
    };

    let axes = [normal1, -normal1];

    // Find the edge normal (front or back) with maximum separation.
    for (j, axis_j) in axes.iter().enumerate() {
        let mut sj = f64::MAX;
        for v in &polygon_b.vertices {
            let si = axis_j.dot(&(*v - v1));
            if si < sj {
                sj = si;
            }
        }

        if sj > axis.separation {
            axis.separation = sj;
            axis.normal = *axis_j;
            axis.index = j;
        }
    }

    axis
}

fn compute_polygon_separation(polygon_b: &TempPolygon, v1: Vec2, v2: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        kind: EpAxisType::EdgeB,
        index: 0,
        separation: f64::MIN,
        normal: Vec2::zero(),
    };

    for i in 0..polygon_b.vertices.len() {
        let n = -polygon_b.normals[i];
        let s1 = n.dot(&(polygon_b.vertices[i] - v1));
        let s2 = n.dot(&(polygon_b.vertices[i] - v2));
        let s = s1.min(s2);

        if s > axis.separation {
            axis.index = i;
            axis.separation = s;
            axis.normal = n;
        }
    }

    axis
}

/// Builds the manifold between an edge and a polygon.
///
/// SAT over the edge normal and the polygon face normals picks the reference
/// face. One-sided edges reject contacts behind the segment and clamp the
/// admissible normal arc using the ghost-vertex adjacency, so chains collide
/// smoothly without internal-vertex snagging.
pub fn collide_edge_and_polygon(
    manifold: &mut Manifold,
    edge_a: &EdgeShape,
    xf_a: &Transform,
    polygon_b: &PolygonShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    let xf = xf_a.mul_t(xf_b);
    let centroid_b = xf.transform_point(polygon_b.centroid);

    let v1 = edge_a.vertex1;
    let v2 = edge_a.vertex2;

    let edge1 = (v2 - v1).normalize();

    // Normal points to the left of the segment.
    let normal1 = Vec2::new(edge1.y, -edge1.x);
    let offset1 = normal1.dot(&(centroid_b - v1));

    if edge_a.one_sided && offset1 < 0.0 {
        return;
    }

    // Polygon B in the edge's frame.
    debug_assert!(polygon_b.vertices.len() <= MAX_POLYGON_VERTICES);
    let temp_b = TempPolygon {
        vertices: polygon_b.vertices.iter().map(|v| xf.transform_point(*v)).collect(),
        normals: polygon_b.normals.iter().map(|n| xf.q.rotate(*n)).collect(),
    };

    let radius = polygon_b.radius() + edge_a.radius();

    let edge_axis = compute_edge_separation(&temp_b, v1, normal1);
    if edge_axis.separation > radius {
        return;
    }

    let polygon_axis = compute_polygon_separation(&temp_b, v1, v2);
    if polygon_axis.separation > radius {
        return;
    }

    // Prefer the edge axis unless the polygon axis is clearly better.
    let k_relative_tol = 0.98;
    let k_absolute_tol = 0.001;
    let mut primary_axis = if polygon_axis.separation - radius
        > k_relative_tol * (edge_axis.separation - radius) + k_absolute_tol
    {
        polygon_axis
    } else {
        edge_axis
    };

    if edge_a.one_sided {
        // Gauss-map check: the contact normal must lie in the arc between
        // the adjacent edge normals, otherwise the neighbor owns it.
        let side1 = primary_axis.normal.dot(&edge1) <= 0.0;
        let sin_tol = 0.1;

        if side1 {
            if let Some(v0) = edge_a.vertex0 {
                let edge0 = (v1 - v0).normalize();
                let normal0 = Vec2::new(edge0.y, -edge0.x);
                let convex1 = edge0.cross(&edge1) >= 0.0;
                if convex1 {
                    if primary_axis.normal.cross(&normal0) > sin_tol {
                        return;
                    }
                } else {
                    primary_axis = edge_axis;
                }
            }
        } else if let Some(v3) = edge_a.vertex3 {
            let edge2 = (v3 - v2).normalize();
            let normal2 = Vec2::new(edge2.y, -edge2.x);
            let convex2 = edge1.cross(&edge2) >= 0.0;
            if convex2 {
                if normal2.cross(&primary_axis.normal) > sin_tol {
                    return;
                }
            } else {
                primary_axis = edge_axis;
            }
        }
    }

    // Reference face data.
    let (clip_points, ref_v1, ref_v2, ref_normal, ref_side_normal, ref_i1, ref_i2);

    if primary_axis.kind == EpAxisType::EdgeA {
        manifold.manifold_type = ManifoldType::FaceA;

        // Incident edge: polygon face most anti-parallel to the edge normal.
        let mut best_index = 0;
        let mut best_value = f64::MAX;
        for (i, n) in temp_b.normals.iter().enumerate() {
            let value = primary_axis.normal.dot(n);
            if value < best_value {
                best_value = value;
                best_index = i;
            }
        }

        let i1 = best_index;
        let i2 = (i1 + 1) % temp_b.vertices.len();

        clip_points = [
            ClipVertex {
                v: temp_b.vertices[i1],
                id: ContactId {
                    index_a: 0,
                    index_b: i1 as u8,
                    type_a: FeatureType::Face,
                    type_b: FeatureType::Vertex,
                },
            },
            ClipVertex {
                v: temp_b.vertices[i2],
                id: ContactId {
                    index_a: 0,
                    index_b: i2 as u8,
                    type_a: FeatureType::Face,
                    type_b: FeatureType::Vertex,
                },
            },
        ];

        ref_i1 = 0;
        ref_i2 = 1;
        ref_v1 = v1;
        ref_v2 = v2;
        ref_normal = primary_axis.normal;
        ref_side_normal = edge1;
    } else {
        manifold.manifold_type = ManifoldType::FaceB;

        clip_points = [
            ClipVertex {
                v: v2,
                id: ContactId {
                    index_a: 1,
                    index_b: primary_axis.index as u8,
                    type_a: FeatureType::Vertex,
                    type_b: FeatureType::Face,
                },
            },
            ClipVertex {
                v: v1,
                id: ContactId {
                    index_a: 0,
                    index_b: primary_axis.index as u8,
                    type_a: FeatureType::Vertex,
                    type_b: FeatureType::Face,
                },
            },
        ];

        ref_i1 = primary_axis.index;
        ref_i2 = (ref_i1 + 1) % temp_b.vertices.len();
        ref_v1 = temp_b.vertices[ref_i1];
        ref_v2 = temp_b.vertices[ref_i2];
        ref_normal = temp_b.normals[ref_i1];

        // The clipping plane tangent, counter-clockwise around B.
        ref_side_normal = ref_normal.cross_scalar(-1.0);
    }

    let side_offset1 = -ref_side_normal.dot(&ref_v1);
    let side_offset2 = ref_side_normal.dot(&ref_v2);

    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    let np = clip_segment_to_line(&mut clip_points1, &clip_points, -ref_side_normal, side_offset1, ref_i1);
    if np < 2 {
        return;
    }

    let np = clip_segment_to_line(&mut clip_points2, &clip_points1, ref_side_normal, side_offset2, ref_i2);
    if np < 2 {
        return;
    }

    if primary_axis.kind == EpAxisType::EdgeA {
        manifold.local_normal = ref_normal;
        manifold.local_point = ref_v1;
    } else {
        manifold.local_normal = polygon_b.normals[ref_i1];
        manifold.local_point = polygon_b.vertices[ref_i1];
    }

    let mut point_count = 0;
    for cp in clip_points2.iter() {
        let separation = ref_normal.dot(&(cp.v - ref_v1));

        if separation <= radius {
            let point = &mut manifold.points[point_count];
            if primary_axis.kind == EpAxisType::EdgeA {
                // Store in B's frame.
                point.local_point = xf.inv_transform_point(cp.v);
                point.id = cp.id;
            } else {
                point.local_point = cp.v;
                point.id = cp.id.swapped();
            }
            point_count += 1;
        }
    }

    manifold.point_count = point_count;
}
