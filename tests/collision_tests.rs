use phys2d::collision::{
    collide_circles, collide_polygons, distance, time_of_impact, BroadPhase, DistanceInput,
    DistanceProxy, DynamicTree, Manifold, SimplexCache, ToiInput, ToiState,
};
use phys2d::math::{Aabb, RayCastInput, Sweep, Transform, Vec2};
use phys2d::shapes::{CircleShape, PolygonShape, Shape};

fn circle_proxy(radius: f64) -> DistanceProxy {
    DistanceProxy::from_shape(&Shape::Circle(CircleShape::new(radius)), 0)
}

fn stationary_sweep(position: Vec2) -> Sweep {
    Sweep {
        local_center: Vec2::zero(),
        c0: position,
        c: position,
        a0: 0.0,
        a: 0.0,
        alpha0: 0.0,
    }
}

#[test]
fn test_distance_overlapping_circles() {
    // Two unit circles with centers 1.9 apart overlap once radii are
    // applied.
    let input = DistanceInput {
        proxy_a: circle_proxy(1.0),
        proxy_b: circle_proxy(1.0),
        transform_a: Transform::identity(),
        transform_b: Transform::from_position_angle(Vec2::new(1.9, 0.0), 0.0),
        use_radii: true,
    };

    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);

    assert_eq!(output.distance, 0.0);
}

#[test]
fn test_distance_separated_circles() {
    let input = DistanceInput {
        proxy_a: circle_proxy(1.0),
        proxy_b: circle_proxy(1.0),
        transform_a: Transform::identity(),
        transform_b: Transform::from_position_angle(Vec2::new(2.1, 0.0), 0.0),
        use_radii: true,
    };

    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);

    assert!((output.distance - 0.1).abs() < 1e-12);
    // Witness points lie on the skin surfaces along the center line.
    assert!((output.point_a.x - 1.0).abs() < 1e-9);
    assert!((output.point_b.x - 1.1).abs() < 1e-9);
}

#[test]
fn test_distance_cache_warm_start() {
    let input = DistanceInput {
        proxy_a: DistanceProxy::from_shape(
            &Shape::Polygon(PolygonShape::new_box(1.0, 1.0)),
            0,
        ),
        proxy_b: DistanceProxy::from_shape(
            &Shape::Polygon(PolygonShape::new_box(1.0, 1.0)),
            0,
        ),
        transform_a: Transform::identity(),
        transform_b: Transform::from_position_angle(Vec2::new(5.0, 0.0), 0.0),
        use_radii: false,
    };

    let mut cache = SimplexCache::default();
    let first = distance(&mut cache, &input);
    let second = distance(&mut cache, &input);

    assert!((first.distance - 3.0).abs() < 1e-9);
    assert!((second.distance - first.distance).abs() < 1e-12);
    // The warmed call converges at least as fast.
    assert!(second.iterations <= first.iterations);
}

#[test]
fn test_toi_initial_overlap() {
    // Sweep B holds at (1.9, 0): the circles overlap at t = 0.
    let input = ToiInput {
        proxy_a: circle_proxy(1.0),
        proxy_b: circle_proxy(1.0),
        sweep_a: stationary_sweep(Vec2::zero()),
        sweep_b: stationary_sweep(Vec2::new(1.9, 0.0)),
        t_max: 1.0,
    };

    let output = time_of_impact(&input);
    assert_eq!(output.state, ToiState::Overlapped);
    assert_eq!(output.t, 0.0);
}

#[test]
fn test_toi_approaching_circles() {
    // B flies toward A; the impact happens before the sweep ends.
    let mut sweep_b = stationary_sweep(Vec2::new(10.0, 0.0));
    sweep_b.c = Vec2::new(0.0, 0.0);

    let input = ToiInput {
        proxy_a: circle_proxy(1.0),
        proxy_b: circle_proxy(1.0),
        sweep_a: stationary_sweep(Vec2::zero()),
        sweep_b,
        t_max: 1.0,
    };

    let output = time_of_impact(&input);
    assert_eq!(output.state, ToiState::Touching);

    // Surfaces meet when centers are 2 apart, at t close to 0.8.
    assert!(output.t > 0.7 && output.t < 0.85, "t = {}", output.t);
}

#[test]
fn test_toi_separated() {
    let mut sweep_b = stationary_sweep(Vec2::new(10.0, 5.0));
    sweep_b.c = Vec2::new(5.0, 5.0);

    let input = ToiInput {
        proxy_a: circle_proxy(1.0),
        proxy_b: circle_proxy(1.0),
        sweep_a: stationary_sweep(Vec2::zero()),
        sweep_b,
        t_max: 1.0,
    };

    let output = time_of_impact(&input);
    assert_eq!(output.state, ToiState::Separated);
    assert_eq!(output.t, 1.0);
}

#[test]
fn test_collide_circles_manifold() {
    let a = CircleShape::new(1.0);
    let b = CircleShape::new(1.0);

    let mut manifold = Manifold::default();
    collide_circles(
        &mut manifold,
        &a,
        &Transform::identity(),
        &b,
        &Transform::from_position_angle(Vec2::new(1.5, 0.0), 0.0),
    );
    assert_eq!(manifold.point_count, 1);

    collide_circles(
        &mut manifold,
        &a,
        &Transform::identity(),
        &b,
        &Transform::from_position_angle(Vec2::new(3.0, 0.0), 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn test_collide_polygons_manifold() {
    let a = PolygonShape::new_box(1.0, 1.0);
    let b = PolygonShape::new_box(1.0, 1.0);

    // Overlapping side by side produces a two-point face manifold.
    let mut manifold = Manifold::default();
    collide_polygons(
        &mut manifold,
        &a,
        &Transform::identity(),
        &b,
        &Transform::from_position_angle(Vec2::new(1.9, 0.0), 0.0),
    );
    assert_eq!(manifold.point_count, 2);

    // Feature ids must be distinct so warm starting can match points.
    assert_ne!(manifold.points[0].id, manifold.points[1].id);

    collide_polygons(
        &mut manifold,
        &a,
        &Transform::identity(),
        &b,
        &Transform::from_position_angle(Vec2::new(5.0, 0.0), 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn test_polygon_hull_validation() {
    // Fewer than three distinct vertices is degenerate.
    let degenerate = PolygonShape::new(&[
        Vec2::new(0.0, 0.0),
        Vec2::new(0.001, 0.0),
        Vec2::new(0.0, 0.001),
    ]);
    assert!(degenerate.is_err());

    // A valid triangle keeps counter-clockwise winding.
    let triangle = PolygonShape::new(&[
        Vec2::new(0.0, 0.0),
        Vec2::new(2.0, 0.0),
        Vec2::new(1.0, 1.5),
    ])
    .unwrap();
    assert_eq!(triangle.vertices.len(), 3);

    let mut area = 0.0;
    for i in 0..3 {
        let v1 = triangle.vertices[i];
        let v2 = triangle.vertices[(i + 1) % 3];
        area += v1.cross(&v2);
    }
    assert!(area > 0.0);
}

#[test]
fn test_shape_ray_cast_matches_aabb() {
    // A ray that pierces the shape must also pierce its AABB; a ray that
    // misses the AABB must miss the shape.
    let shapes: Vec<Shape> = vec![
        Shape::Circle(CircleShape::with_position(Vec2::new(1.0, 2.0), 0.5)),
        Shape::Polygon(PolygonShape::new_box(1.0, 0.5)),
    ];
    let xf = Transform::from_position_angle(Vec2::new(0.5, -0.25), 0.3);

    let rays = [
        (Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)),
        (Vec2::new(-5.0, 2.0), Vec2::new(5.0, 2.0)),
        (Vec2::new(0.0, -5.0), Vec2::new(0.0, 5.0)),
        (Vec2::new(-3.0, -3.0), Vec2::new(3.0, 3.0)),
        (Vec2::new(-5.0, 10.0), Vec2::new(5.0, 10.0)),
    ];

    for shape in &shapes {
        let aabb = shape.compute_aabb(&xf, 0);
        for (p1, p2) in rays {
            let input = RayCastInput::new(p1, p2);
            let shape_hit = shape.ray_cast(&input, &xf, 0).is_some();
            let aabb_hit = aabb.ray_cast(&input).is_some();

            if shape_hit {
                assert!(aabb_hit, "shape hit outside its own AABB");
            }
            if !aabb_hit {
                assert!(!shape_hit, "shape hit though the AABB was missed");
            }
        }
    }
}

// Small deterministic generator so the stress test is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn random_aabb(rng: &mut Lcg) -> Aabb {
    let center = Vec2::new(rng.range(-50.0, 50.0), rng.range(-50.0, 50.0));
    let half = Vec2::new(rng.range(0.1, 3.0), rng.range(0.1, 3.0));
    Aabb::from_center_half_extents(center, half)
}

#[test]
fn test_dynamic_tree_stress() {
    let mut rng = Lcg(0x123456789);
    let mut tree: DynamicTree<usize> = DynamicTree::new();
    let mut live: Vec<(i32, Aabb)> = Vec::new();

    // Seed the tree.
    for i in 0..128 {
        let aabb = random_aabb(&mut rng);
        let id = tree.create_proxy(aabb, i);
        live.push((id, aabb));
    }
    tree.validate();

    // Random create/destroy/move churn.
    for op in 0..10_000 {
        let choice = rng.next_f64();
        if choice < 0.3 && live.len() > 16 {
            let index = (rng.next_f64() * live.len() as f64) as usize % live.len();
            let (id, _) = live.swap_remove(index);
            tree.destroy_proxy(id);
        } else if choice < 0.5 {
            let aabb = random_aabb(&mut rng);
            let id = tree.create_proxy(aabb, op);
            live.push((id, aabb));
        } else {
            let index = (rng.next_f64() * live.len() as f64) as usize % live.len();
            let aabb = random_aabb(&mut rng);
            let displacement = Vec2::new(rng.range(-1.0, 1.0), rng.range(-1.0, 1.0));
            tree.move_proxy(live[index].0, aabb, displacement);
            live[index].1 = aabb;
        }
    }

    tree.validate();

    // Query results must match a brute-force oracle over the fat AABBs.
    for _ in 0..50 {
        let query = random_aabb(&mut rng);

        let mut reported = Vec::new();
        tree.query(&query, |id| {
            reported.push(id);
            true
        });
        reported.sort_unstable();

        let mut expected: Vec<i32> = live
            .iter()
            .filter(|(id, _)| tree.fat_aabb(*id).overlaps(&query))
            .map(|(id, _)| *id)
            .collect();
        expected.sort_unstable();

        assert_eq!(reported, expected);
    }
}

#[test]
fn test_broad_phase_pair_emission() {
    let mut broad_phase: BroadPhase<u32> = BroadPhase::new();

    // Three boxes in a row; adjacent fat AABBs overlap, the ends do not.
    let a = broad_phase.create_proxy(
        Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)),
        0,
    );
    let b = broad_phase.create_proxy(
        Aabb::new(Vec2::new(0.9, 0.0), Vec2::new(1.9, 1.0)),
        1,
    );
    let c = broad_phase.create_proxy(
        Aabb::new(Vec2::new(10.0, 0.0), Vec2::new(11.0, 1.0)),
        2,
    );
    let _ = (a, b, c);

    let mut pairs = Vec::new();
    broad_phase.update_pairs(|x, y| pairs.push((x.min(y), x.max(y))));

    assert_eq!(pairs, vec![(0, 1)]);

    // With an empty move buffer nothing is emitted.
    let mut pairs2 = Vec::new();
    broad_phase.update_pairs(|x, y| pairs2.push((x, y)));
    assert!(pairs2.is_empty());

    // Moving one proxy re-reports its overlaps exactly once.
    broad_phase.move_proxy(
        a,
        Aabb::new(Vec2::new(9.0, 0.0), Vec2::new(10.5, 1.0)),
        Vec2::new(9.0, 0.0),
    );
    let mut pairs3 = Vec::new();
    broad_phase.update_pairs(|x, y| pairs3.push((x.min(y), x.max(y))));
    assert_eq!(pairs3, vec![(0, 2)]);
}
