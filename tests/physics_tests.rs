use phys2d::bodies::{BodyDef, BodyType, FixtureDef};
use phys2d::collision::Contact;
use phys2d::constraints::{DistanceJointDef, JointDef, RevoluteJointDef};
use phys2d::core::events::{ContactListener, RayCastBehavior};
use phys2d::core::{ContactHandle, World};
use phys2d::math::{Aabb, Vec2};
use phys2d::shapes::{CircleShape, EdgeShape, PolygonShape, Shape};

const DT: f64 = 1.0 / 60.0;

fn dynamic_body_def(position: Vec2) -> BodyDef {
    BodyDef {
        body_type: BodyType::Dynamic,
        position,
        ..BodyDef::default()
    }
}

fn box_fixture(half_width: f64, half_height: f64) -> FixtureDef {
    FixtureDef::new(Shape::Polygon(PolygonShape::new_box(half_width, half_height)))
}

#[test]
fn test_free_fall_matches_integrator() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    world.set_allow_sleeping(false);

    let body = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 10.0)))
        .unwrap();
    world
        .create_fixture(body, FixtureDef::new(Shape::Circle(CircleShape::new(0.5))))
        .unwrap();

    // Semi-implicit Euler: velocity updates before position.
    let mut expected_y = 10.0;
    let mut expected_vy = 0.0;

    for _ in 0..60 {
        world.step(DT, 8, 3);

        expected_vy += -10.0 * DT;
        expected_y += expected_vy * DT;

        let body_ref = world.body(body).unwrap();
        assert!((body_ref.position().y - expected_y).abs() < 1e-6);
        assert!((body_ref.linear_velocity().y - expected_vy).abs() < 1e-6);
    }
}

#[test]
fn test_box_rests_on_ground_edge() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(
            ground,
            FixtureDef::new(Shape::Edge(EdgeShape::new(
                Vec2::new(-20.0, 0.0),
                Vec2::new(20.0, 0.0),
            ))),
        )
        .unwrap();

    // A unit box (mass 1) dropped from height 10.
    let falling = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 10.0)))
        .unwrap();
    world.create_fixture(falling, box_fixture(0.5, 0.5)).unwrap();

    // Simulate 3 seconds: fall, impact, settle.
    for _ in 0..180 {
        world.step(DT, 8, 3);
    }

    let body = world.body(falling).unwrap();
    let y = body.position().y;

    // Resting height is the half extent, give or take the collision slop
    // and skin.
    assert!(y > 0.45 && y < 0.56, "resting height {}", y);
    assert!(body.linear_velocity().length() < 0.01);

    // The supporting contact carries roughly the body's weight per step:
    // total normal impulse per step ~ m * g * dt.
    let mut total_normal_impulse = 0.0;
    for edge in body.contact_edges() {
        let contact = world.contact(edge.contact).unwrap();
        if contact.is_touching() {
            for i in 0..contact.manifold.point_count {
                let point = &contact.manifold.points[i];

                // Impulse invariants: normal impulses never pull, and
                // friction stays inside the cone.
                assert!(point.normal_impulse >= 0.0);
                assert!(
                    point.tangent_impulse.abs()
                        <= contact.friction * point.normal_impulse + 1e-9
                );

                total_normal_impulse += point.normal_impulse;
            }
        }
    }
    let weight_impulse = 1.0 * 10.0 * DT;
    assert!(
        (total_normal_impulse - weight_impulse).abs() < 0.5 * weight_impulse,
        "normal impulse {} vs weight impulse {}",
        total_normal_impulse,
        weight_impulse
    );
}

#[test]
fn test_revolute_bridge_settles() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(
            ground,
            FixtureDef::new(Shape::Edge(EdgeShape::new(
                Vec2::new(-40.0, 0.0),
                Vec2::new(40.0, 0.0),
            ))),
        )
        .unwrap();

    // 30 planks chained with revolute joints, hung between two anchors.
    let count = 30;
    let mut planks = Vec::new();
    let mut prev = ground;

    for i in 0..count {
        let x = -15.0 + 1.0 * i as f64;
        let plank = world
            .create_body(&dynamic_body_def(Vec2::new(x, 5.0)))
            .unwrap();
        let mut fixture = box_fixture(0.5, 0.125);
        fixture.density = 20.0;
        fixture.friction = 0.2;
        world.create_fixture(plank, fixture).unwrap();

        let anchor = Vec2::new(x - 0.5, 5.0);
        let mut def = RevoluteJointDef::new(prev, plank);
        def.local_anchor_a = world.body(prev).unwrap().local_point(anchor);
        def.local_anchor_b = world.body(plank).unwrap().local_point(anchor);
        world.create_joint(&JointDef::Revolute(def)).unwrap();

        planks.push(plank);
        prev = plank;
    }

    // Pin the far end back to the ground.
    let anchor = Vec2::new(-15.0 + 1.0 * count as f64 - 0.5, 5.0);
    let mut def = RevoluteJointDef::new(prev, ground);
    def.local_anchor_a = world.body(prev).unwrap().local_point(anchor);
    def.local_anchor_b = world.body(ground).unwrap().local_point(anchor);
    world.create_joint(&JointDef::Revolute(def)).unwrap();

    // One second of simulated fall-in plus settling time.
    for _ in 0..400 {
        world.step(DT, 8, 3);
    }

    let middle = world.body(planks[count / 2]).unwrap();
    assert!(
        middle.linear_velocity().length() < 0.1,
        "middle plank velocity {}",
        middle.linear_velocity().length()
    );

    // The bridge sags below its anchors but holds together.
    assert!(middle.position().y < 5.0);
    assert!(middle.position().y > 0.0);
}

#[test]
fn test_determinism_bitwise() {
    fn run() -> Vec<(f64, f64, f64)> {
        let mut world = World::new(Vec2::new(0.0, -10.0));

        let ground = world.create_body(&BodyDef::default()).unwrap();
        world
            .create_fixture(
                ground,
                FixtureDef::new(Shape::Edge(EdgeShape::new(
                    Vec2::new(-20.0, 0.0),
                    Vec2::new(20.0, 0.0),
                ))),
            )
            .unwrap();

        let mut boxes = Vec::new();
        for i in 0..8 {
            let body = world
                .create_body(&dynamic_body_def(Vec2::new(
                    0.1 * (i % 3) as f64,
                    1.0 + 1.05 * i as f64,
                )))
                .unwrap();
            world.create_fixture(body, box_fixture(0.5, 0.5)).unwrap();
            boxes.push(body);
        }

        for _ in 0..120 {
            world.step(DT, 8, 3);
        }

        boxes
            .iter()
            .map(|&b| {
                let body = world.body(b).unwrap();
                (body.position().x, body.position().y, body.angle())
            })
            .collect()
    }

    let first = run();
    let second = run();

    // Identical inputs produce bitwise identical trajectories.
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.0.to_bits(), b.0.to_bits());
        assert_eq!(a.1.to_bits(), b.1.to_bits());
        assert_eq!(a.2.to_bits(), b.2.to_bits());
    }
}

#[test]
fn test_velocity_clamped_per_step() {
    let mut world = World::new(Vec2::zero());
    world.set_continuous_physics(false);

    let body = world
        .create_body(&BodyDef {
            body_type: BodyType::Dynamic,
            position: Vec2::zero(),
            linear_velocity: Vec2::new(1.0e6, 0.0),
            ..BodyDef::default()
        })
        .unwrap();
    world
        .create_fixture(body, FixtureDef::new(Shape::Circle(CircleShape::new(0.5))))
        .unwrap();

    world.step(DT, 8, 3);

    // The integrator limits translation per step, which bounds the
    // effective velocity.
    let body_ref = world.body(body).unwrap();
    let max_speed = phys2d::core::config::MAX_TRANSLATION / DT;
    assert!(body_ref.linear_velocity().length() <= max_speed + 1e-9);
    assert!(body_ref.position().length() <= phys2d::core::config::MAX_TRANSLATION + 1e-9);
}

#[test]
fn test_sleeping_after_rest() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(
            ground,
            FixtureDef::new(Shape::Edge(EdgeShape::new(
                Vec2::new(-20.0, 0.0),
                Vec2::new(20.0, 0.0),
            ))),
        )
        .unwrap();

    let body = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 2.0)))
        .unwrap();
    world.create_fixture(body, box_fixture(0.5, 0.5)).unwrap();

    // Plenty of time to land and pass the sleep timer.
    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    assert!(!world.body(body).unwrap().is_awake());

    // Waking the body by force re-enters simulation.
    world
        .body_mut(body)
        .unwrap()
        .apply_force_to_center(Vec2::new(100.0, 0.0), true);
    assert!(world.body(body).unwrap().is_awake());
}

#[test]
fn test_distance_joint_reaction_force() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let anchor = world
        .create_body(&BodyDef {
            position: Vec2::new(0.0, 10.0),
            ..BodyDef::default()
        })
        .unwrap();
    // A static anchor body needs no fixture for joints to work.

    let hanging = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 5.0)))
        .unwrap();
    let mut fixture = FixtureDef::new(Shape::Circle(CircleShape::new(0.5)));
    fixture.density = 1.0 / (std::f64::consts::PI * 0.25);
    world.create_fixture(hanging, fixture).unwrap();

    let mut def = DistanceJointDef::new(anchor, hanging);
    def.length = 5.0;
    let joint = world.create_joint(&JointDef::Distance(def)).unwrap();

    for _ in 0..300 {
        world.step(DT, 8, 3);
    }

    // At rest the rod carries the body's weight: |F| = m * g.
    let mass = world.body(hanging).unwrap().mass();
    let force = world.joint(joint).unwrap().reaction_force(1.0 / DT);
    assert!(
        (force.length() - mass * 10.0).abs() < 0.5,
        "reaction force {} vs weight {}",
        force.length(),
        mass * 10.0
    );
}

#[test]
fn test_bullet_does_not_tunnel() {
    let mut world = World::new(Vec2::zero());

    // A thin static wall at x = 5.
    let wall = world
        .create_body(&BodyDef {
            position: Vec2::new(5.0, 0.0),
            ..BodyDef::default()
        })
        .unwrap();
    world.create_fixture(wall, box_fixture(0.05, 5.0)).unwrap();

    // A small, fast bullet crossing several meters per step.
    let bullet = world
        .create_body(&BodyDef {
            body_type: BodyType::Dynamic,
            position: Vec2::zero(),
            linear_velocity: Vec2::new(100.0, 0.0),
            bullet: true,
            ..BodyDef::default()
        })
        .unwrap();
    let mut fixture = FixtureDef::new(Shape::Circle(CircleShape::new(0.1)));
    fixture.restitution = 0.0;
    world.create_fixture(bullet, fixture).unwrap();

    for _ in 0..30 {
        world.step(DT, 8, 3);
    }

    // The bullet must be stopped at (or bounced off) the wall, never
    // beyond it.
    let x = world.body(bullet).unwrap().position().x;
    assert!(x < 5.0, "bullet tunneled to x = {}", x);
}

// Relay begin/end counts through a static cell: the listener is owned by
// the world, so results are read back out of band.
use std::sync::atomic::{AtomicUsize, Ordering};

static BEGINS: AtomicUsize = AtomicUsize::new(0);
static ENDS: AtomicUsize = AtomicUsize::new(0);

struct AtomicListener;

impl ContactListener for AtomicListener {
    fn begin_contact(&mut self, _handle: ContactHandle, _contact: &mut Contact) {
        BEGINS.fetch_add(1, Ordering::SeqCst);
    }

    fn end_contact(&mut self, _handle: ContactHandle, _contact: &mut Contact) {
        ENDS.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_contact_events_fire_in_order() {
    BEGINS.store(0, Ordering::SeqCst);
    ENDS.store(0, Ordering::SeqCst);

    let mut world = World::new(Vec2::zero());
    world.set_contact_listener(Box::new(AtomicListener));
    world.set_allow_sleeping(false);

    // A projectile passing through a sensor region.
    let sensor = world.create_body(&BodyDef::default()).unwrap();
    let mut sensor_fixture = box_fixture(1.0, 1.0);
    sensor_fixture.is_sensor = true;
    world.create_fixture(sensor, sensor_fixture).unwrap();

    let mover = world
        .create_body(&BodyDef {
            body_type: BodyType::Dynamic,
            position: Vec2::new(-5.0, 0.0),
            linear_velocity: Vec2::new(5.0, 0.0),
            ..BodyDef::default()
        })
        .unwrap();
    world
        .create_fixture(mover, FixtureDef::new(Shape::Circle(CircleShape::new(0.2))))
        .unwrap();

    for _ in 0..240 {
        world.step(DT, 8, 3);
    }

    // The body entered and left the sensor exactly once.
    assert_eq!(BEGINS.load(Ordering::SeqCst), 1);
    assert_eq!(ENDS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_query_aabb_and_ray_cast() {
    let mut world = World::new(Vec2::zero());

    let left = world
        .create_body(&BodyDef {
            position: Vec2::new(-2.0, 0.0),
            ..BodyDef::default()
        })
        .unwrap();
    world.create_fixture(left, box_fixture(0.5, 0.5)).unwrap();

    let right = world
        .create_body(&BodyDef {
            position: Vec2::new(2.0, 0.0),
            ..BodyDef::default()
        })
        .unwrap();
    world.create_fixture(right, box_fixture(0.5, 0.5)).unwrap();

    // Query around the left box only.
    let mut found = Vec::new();
    world.query_aabb(
        &Aabb::new(Vec2::new(-3.0, -1.0), Vec2::new(-1.0, 1.0)),
        |fixture| {
            found.push(fixture.body);
            true
        },
    );
    assert_eq!(found, vec![left]);

    // A ray through both boxes clipped to the closest hit.
    let mut closest: Option<(Vec2, f64)> = None;
    world.ray_cast(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0), |_fixture, point, _normal, fraction| {
        closest = Some((point, fraction));
        RayCastBehavior::Clip(fraction)
    });

    let (point, _fraction) = closest.expect("ray should hit");
    assert!((point.x - -2.5).abs() < 1e-6, "hit at {}", point.x);

    // Early termination stops at the first reported fixture.
    let mut reports = 0;
    world.ray_cast(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0), |_f, _p, _n, _fr| {
        reports += 1;
        RayCastBehavior::Terminate
    });
    assert_eq!(reports, 1);
}

#[test]
fn test_destroy_body_cascades() {
    let mut world = World::new(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(
            ground,
            FixtureDef::new(Shape::Edge(EdgeShape::new(
                Vec2::new(-20.0, 0.0),
                Vec2::new(20.0, 0.0),
            ))),
        )
        .unwrap();

    let a = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 0.5)))
        .unwrap();
    world.create_fixture(a, box_fixture(0.5, 0.5)).unwrap();

    let b = world
        .create_body(&dynamic_body_def(Vec2::new(0.0, 1.5)))
        .unwrap();
    world.create_fixture(b, box_fixture(0.5, 0.5)).unwrap();

    let mut def = RevoluteJointDef::new(a, b);
    def.local_anchor_a = Vec2::new(0.0, 0.5);
    def.local_anchor_b = Vec2::new(0.0, -0.5);
    let joint = world.create_joint(&JointDef::Revolute(def)).unwrap();

    // Let contacts form.
    for _ in 0..30 {
        world.step(DT, 8, 3);
    }
    assert!(world.contact_count() > 0);
    assert_eq!(world.joint_count(), 1);

    world.destroy_body(a).unwrap();

    // The joint and the destroyed body's contacts are gone; the body
    // handle is invalid.
    assert_eq!(world.joint_count(), 0);
    assert!(world.body(a).is_err());
    assert!(world.joint(joint).is_err());

    // Slot reuse must not resurrect the stale handle: a new body takes the
    // freed slot under a fresh generation.
    let replacement = world
        .create_body(&dynamic_body_def(Vec2::new(5.0, 1.0)))
        .unwrap();
    world.create_fixture(replacement, box_fixture(0.5, 0.5)).unwrap();
    assert_ne!(replacement, a);
    assert!(world.body(a).is_err());
    assert!(world.body(replacement).is_ok());

    // The survivors keep simulating and the tree stays consistent.
    for _ in 0..30 {
        world.step(DT, 8, 3);
    }
    world.validate_broad_phase();
}

#[test]
fn test_invalid_arguments_rejected() {
    let mut world = World::new(Vec2::zero());

    // Non-finite position.
    let bad = world.create_body(&BodyDef {
        position: Vec2::new(f64::NAN, 0.0),
        ..BodyDef::default()
    });
    assert!(bad.is_err());

    // Negative density.
    let body = world.create_body(&BodyDef::default()).unwrap();
    let mut fixture = FixtureDef::new(Shape::Circle(CircleShape::new(1.0)));
    fixture.density = -1.0;
    assert!(world.create_fixture(body, fixture).is_err());

    // The world is left unchanged by failed calls.
    assert_eq!(world.body_count(), 1);
    assert!(world.body(body).unwrap().fixtures().is_empty());
}
