use phys2d::math::{Aabb, Mat22, Mat33, RayCastInput, Rot, Sweep, Transform, Vec2, Vec3};

const TOL: f64 = 1e-12;

#[test]
fn test_vec2_basics() {
    let a = Vec2::new(3.0, 4.0);
    let b = Vec2::new(-1.0, 2.0);

    assert_eq!(a + b, Vec2::new(2.0, 6.0));
    assert_eq!(a - b, Vec2::new(4.0, 2.0));
    assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
    assert!((a.length() - 5.0).abs() < TOL);
    assert!((a.dot(&b) - 5.0).abs() < TOL);
    assert!((a.cross(&b) - 10.0).abs() < TOL);

    let n = a.normalize();
    assert!((n.length() - 1.0).abs() < TOL);

    // Ordered-pair interop: indexing and array round trip.
    assert_eq!(a[0], 3.0);
    assert_eq!(a[1], 4.0);
    let arr: [f64; 2] = a.into();
    assert_eq!(Vec2::from(arr), a);

    let na = a.to_nalgebra();
    assert_eq!(Vec2::from_nalgebra(&na), a);
}

#[test]
fn test_vec2_perpendicular() {
    let a = Vec2::new(1.0, 0.0);
    assert_eq!(a.perpendicular(), Vec2::new(0.0, 1.0));
    assert_eq!(a.perpendicular_cw(), Vec2::new(0.0, -1.0));
    assert!(a.dot(&a.perpendicular()).abs() < TOL);
}

#[test]
fn test_rotation_compose_and_invert() {
    let q1 = Rot::new(0.3);
    let q2 = Rot::new(0.5);

    let q12 = q1.mul(&q2);
    assert!((q12.angle() - 0.8).abs() < 1e-9);

    // q1^T * q1 = identity
    let identity = q1.mul_t(&q1);
    assert!(identity.angle().abs() < 1e-9);

    let v = Vec2::new(1.0, 0.0);
    let rotated = Rot::new(std::f64::consts::FRAC_PI_2).rotate(v);
    assert!((rotated.x).abs() < 1e-9);
    assert!((rotated.y - 1.0).abs() < 1e-9);

    let back = q1.inv_rotate(q1.rotate(v));
    assert!((back - v).length() < 1e-9);
}

#[test]
fn test_transform_round_trip() {
    let xf = Transform::from_position_angle(Vec2::new(2.0, -3.0), 0.7);
    let p = Vec2::new(1.5, 4.0);

    let world = xf.transform_point(p);
    let local = xf.inv_transform_point(world);
    assert!((local - p).length() < 1e-9);

    // Composition agrees with sequential application.
    let xf2 = Transform::from_position_angle(Vec2::new(-1.0, 0.5), -0.2);
    let composed = xf.mul(&xf2);
    let a = composed.transform_point(p);
    let b = xf.transform_point(xf2.transform_point(p));
    assert!((a - b).length() < 1e-9);
}

#[test]
fn test_sweep_interpolation() {
    let sweep = Sweep {
        local_center: Vec2::zero(),
        c0: Vec2::new(0.0, 0.0),
        c: Vec2::new(10.0, 0.0),
        a0: 0.0,
        a: 1.0,
        alpha0: 0.0,
    };

    let xf0 = sweep.transform_at(0.0);
    assert!((xf0.p - Vec2::zero()).length() < TOL);

    let xf1 = sweep.transform_at(1.0);
    assert!((xf1.p - Vec2::new(10.0, 0.0)).length() < TOL);

    let mid = sweep.transform_at(0.5);
    assert!((mid.p.x - 5.0).abs() < TOL);
    assert!((mid.q.angle() - 0.5).abs() < 1e-9);
}

#[test]
fn test_sweep_advance() {
    let mut sweep = Sweep {
        local_center: Vec2::zero(),
        c0: Vec2::new(0.0, 0.0),
        c: Vec2::new(10.0, 0.0),
        a0: 0.0,
        a: 2.0,
        alpha0: 0.0,
    };

    sweep.advance(0.5);
    assert!((sweep.alpha0 - 0.5).abs() < TOL);
    assert!((sweep.c0.x - 5.0).abs() < TOL);
    assert!((sweep.a0 - 1.0).abs() < TOL);

    // The end state is untouched.
    assert!((sweep.c.x - 10.0).abs() < TOL);
}

#[test]
fn test_aabb_overlap_and_combine() {
    let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    let b = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0));
    let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));

    assert!(a.overlaps(&b));
    assert!(!a.overlaps(&c));

    let combined = a.combine(&b);
    assert!(combined.contains(&a));
    assert!(combined.contains(&b));
    assert!((combined.perimeter() - 12.0).abs() < TOL);
}

#[test]
fn test_aabb_ray_cast() {
    let aabb = Aabb::new(Vec2::new(1.0, -1.0), Vec2::new(2.0, 1.0));

    // Straight hit from the left.
    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
    let fraction = aabb.ray_cast(&input).expect("ray should hit");
    assert!((fraction - 0.25).abs() < 1e-9);

    // Pointing away.
    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(-4.0, 0.0));
    assert!(aabb.ray_cast(&input).is_none());

    // Parallel miss.
    let input = RayCastInput::new(Vec2::new(0.0, 5.0), Vec2::new(4.0, 5.0));
    assert!(aabb.ray_cast(&input).is_none());
}

#[test]
fn test_mat22_solve() {
    let m = Mat22::from_scalars(2.0, 1.0, 1.0, 3.0);
    let b = Vec2::new(5.0, 10.0);
    let x = m.solve(b);

    let check = m.mul_vec(x);
    assert!((check - b).length() < 1e-9);

    // A singular matrix yields no impulse rather than an error.
    let singular = Mat22::from_scalars(1.0, 2.0, 2.0, 4.0);
    assert_eq!(singular.solve(b), Vec2::zero());
}

#[test]
fn test_mat33_solve() {
    let m = Mat33::new(
        Vec3::new(4.0, 1.0, 0.0),
        Vec3::new(1.0, 3.0, 1.0),
        Vec3::new(0.0, 1.0, 2.0),
    );
    let b = Vec3::new(1.0, 2.0, 3.0);

    let x = m.solve33(b);
    let check = m.mul_vec(x);
    assert!((check.x - b.x).abs() < 1e-9);
    assert!((check.y - b.y).abs() < 1e-9);
    assert!((check.z - b.z).abs() < 1e-9);

    let x2 = m.solve22(Vec2::new(1.0, 2.0));
    let check2 = m.mul_vec22(x2);
    assert!((check2.x - 1.0).abs() < 1e-9);
    assert!((check2.y - 2.0).abs() < 1e-9);
}
