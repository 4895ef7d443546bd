use crate::collision::manifold::{
    clip_segment_to_line, ClipVertex, ContactId, FeatureType, Manifold, ManifoldType,
};
use crate::core::config::MAX_MANIFOLD_POINTS;
use crate::math::{Transform, Vec2};
use crate::shapes::PolygonShape;

/// Finds the face of `poly1` with maximum separation from `poly2`.
/// Returns the separation and the face index.
fn max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (f64, usize) {
    // Work in poly2's frame.
    let xf = xf2.mul_t(xf1);

    let mut best_index = 0;
    let mut max_sep = f64::MIN;

    for i in 0..poly1.vertices.len() {
        let n = xf.q.rotate(poly1.normals[i]);
        let v1 = xf.transform_point(poly1.vertices[i]);

        // Deepest vertex of poly2 along -n.
        let mut si = f64::MAX;
        for v2 in &poly2.vertices {
            let s = n.dot(&(*v2 - v1));
            if s < si {
                si = s;
            }
        }

        if si > max_sep {
            max_sep = si;
            best_index = i;
        }
    }

    (max_sep, best_index)
}

/// Finds the incident edge on `poly2` that is most anti-parallel to the
/// reference face normal of `poly1`
fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    debug_assert!(edge1 < poly1.normals.len());

    // Reference normal in poly2's frame.
    let normal1 = xf2.q.inv_rotate(xf1.q.rotate(poly1.normals[edge1]));

    let mut index = 0;
    let mut min_dot = f64::MAX;
    for (i, n) in poly2.normals.iter().enumerate() {
        let dot = normal1.dot(n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (i1 + 1) % poly2.vertices.len();

    [
        ClipVertex {
            v: xf2.transform_point(poly2.vertices[i1]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i1 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
        ClipVertex {
            v: xf2.transform_point(poly2.vertices[i2]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i2 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
    ]
}

/// Builds the manifold between two convex polygons using SAT with
/// reference/incident edge clipping.
///
/// The polygon with the deeper penetrating face becomes the reference; the
/// most anti-parallel edge of the other polygon is clipped against the
/// reference face side planes, and points below the reference face survive.
pub fn collide_polygons(
    manifold: &mut Manifold,
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;
    let total_radius = poly_a.radius() + poly_b.radius();

    let (separation_a, edge_a) = max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return;
    }

    let (separation_b, edge_b) = max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return;
    }

    let (poly1, poly2, xf1, xf2, edge1, flip);
    let k_tol = 0.1 * crate::core::config::LINEAR_SLOP;

    if separation_b > separation_a + k_tol {
        poly1 = poly_b;
        poly2 = poly_a;
        xf1 = xf_b;
        xf2 = xf_a;
        edge1 = edge_b;
        manifold.manifold_type = ManifoldType::FaceB;
        flip = true;
    } else {
        poly1 = poly_a;
        poly2 = poly_b;
        xf1 = xf_a;
        xf2 = xf_b;
        edge1 = edge_a;
        manifold.manifold_type = ManifoldType::FaceA;
        flip = false;
    }

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.vertices.len();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % count1;

    let mut v11 = poly1.vertices[iv1];
    let mut v12 = poly1.vertices[iv2];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.q.rotate(local_tangent);

    v11 = xf1.transform_point(v11);
    v12 = xf1.transform_point(v12);

    // Side offsets extended by the total skin radius.
    let side_offset1 = -tangent.dot(&v11) + total_radius;
    let side_offset2 = tangent.dot(&v12) + total_radius;

    // Clip the incident edge against the extruded side planes of edge1.
    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    let np = clip_segment_to_line(&mut clip_points1, &incident_edge, -tangent, side_offset1, iv1);
    if np < 2 {
        return;
    }

    let np = clip_segment_to_line(&mut clip_points2, &clip_points1, tangent, side_offset2, iv2);
    if np < 2 {
        return;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    let normal = xf1.q.rotate(local_normal);
    let front_offset = normal.dot(&v11);

    let mut point_count = 0;
    for cp in clip_points2.iter().take(MAX_MANIFOLD_POINTS) {
        let separation = normal.dot(&cp.v) - front_offset;

        if separation <= total_radius {
            let point = &mut manifold.points[point_count];
            point.local_point = xf2.inv_transform_point(cp.v);
            point.id = if flip { cp.id.swapped() } else { cp.id };
            point_count += 1;
        }
    }

    manifold.point_count = point_count;
}
