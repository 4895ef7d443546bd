use crate::collision::manifold::{ContactId, Manifold, ManifoldType};
use crate::math::{Transform, Vec2};
use crate::shapes::{CircleShape, PolygonShape};

/// Builds the manifold between two circles: at most one point, of type
/// `Circles`
pub fn collide_circles(
    manifold: &mut Manifold,
    circle_a: &CircleShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    let p_a = xf_a.transform_point(circle_a.position);
    let p_b = xf_b.transform_point(circle_b.position);

    let d = p_b - p_a;
    let dist_sqr = d.length_squared();
    let r = circle_a.radius + circle_b.radius;
    if dist_sqr > r * r {
        return;
    }

    manifold.manifold_type = ManifoldType::Circles;
    manifold.local_point = circle_a.position;
    manifold.local_normal = Vec2::zero();
    manifold.point_count = 1;

    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId::default();
}

/// Builds the manifold between a polygon and a circle by classifying the
/// circle center against the closest face or vertex region
pub fn collide_polygon_and_circle(
    manifold: &mut Manifold,
    polygon_a: &PolygonShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    // Circle center in the polygon's frame.
    let c = xf_b.transform_point(circle_b.position);
    let c_local = xf_a.inv_transform_point(c);

    let total_radius = polygon_a.radius() + circle_b.radius;
    let vertex_count = polygon_a.vertices.len();

    // Find the face of maximum separation.
    let mut normal_index = 0;
    let mut separation = f64::MIN;
    for i in 0..vertex_count {
        let s = polygon_a.normals[i].dot(&(c_local - polygon_a.vertices[i]));
        if s > total_radius {
            // Early out: a separating axis exists.
            return;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let vert_index1 = normal_index;
    let vert_index2 = (vert_index1 + 1) % vertex_count;
    let v1 = polygon_a.vertices[vert_index1];
    let v2 = polygon_a.vertices[vert_index2];

    // Center inside the polygon: use the face normal directly.
    if separation < crate::math::EPSILON {
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = polygon_a.normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        manifold.points[0].local_point = circle_b.position;
        manifold.points[0].id = ContactId::default();
        return;
    }

    // Voronoi regions of the face.
    let u1 = (c_local - v1).dot(&(v2 - v1));
    let u2 = (c_local - v2).dot(&(v1 - v2));

    if u1 <= 0.0 {
        if c_local.distance_squared(&v1) > total_radius * total_radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = (c_local - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(&v2) > total_radius * total_radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = (c_local - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        let s = (c_local - face_center).dot(&polygon_a.normals[vert_index1]);
        if s > total_radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = polygon_a.normals[vert_index1];
        manifold.local_point = face_center;
    }

    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId::default();
}
