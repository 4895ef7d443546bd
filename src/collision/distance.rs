use crate::core::config::MAX_DISTANCE_ITERATIONS;
use crate::math::{Transform, Vec2};
use crate::shapes::Shape;

/// A point cloud plus radius standing in for a convex shape in distance
/// queries. Chains contribute the two vertices of the requested edge child.
#[derive(Debug, Clone, Default)]
pub struct DistanceProxy {
    /// Support vertices in shape-local coordinates
    pub vertices: Vec<Vec2>,

    /// Skin radius around the convex hull of the vertices
    pub radius: f64,
}

impl DistanceProxy {
    /// Builds a proxy for the given child of a shape
    pub fn from_shape(shape: &Shape, child_index: usize) -> Self {
        match shape {
            Shape::Circle(c) => Self {
                vertices: vec![c.position],
                radius: c.radius,
            },
            Shape::Polygon(p) => Self {
                vertices: p.vertices.clone(),
                radius: p.radius(),
            },
            Shape::Edge(e) => Self {
                vertices: vec![e.vertex1, e.vertex2],
                radius: e.radius(),
            },
            Shape::Chain(c) => {
                let edge = c.child_edge(child_index);
                Self {
                    vertices: vec![edge.vertex1, edge.vertex2],
                    radius: c.radius(),
                }
            }
        }
    }

    /// Returns the index of the support vertex in direction `d`
    pub fn support(&self, d: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(&d);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let value = v.dot(&d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }

    /// Returns the vertex at `index`
    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }
}

/// Cached simplex from a previous distance call, used to warm start the
/// next one. The metric is the simplex perimeter; a large mismatch against
/// the rebuilt simplex invalidates the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexCache {
    /// Length or area measure of the cached simplex
    pub metric: f64,

    /// Number of cached support points
    pub count: usize,

    /// Support vertex indices on proxy A
    pub index_a: [usize; 3],

    /// Support vertex indices on proxy B
    pub index_b: [usize; 3],
}

/// Input for a distance query between two transformed proxies
#[derive(Debug, Clone)]
pub struct DistanceInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,

    /// Whether to shrink the result by the proxy radii
    pub use_radii: bool,
}

/// Output of a distance query
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceOutput {
    /// Closest point on proxy A in world coordinates
    pub point_a: Vec2,

    /// Closest point on proxy B in world coordinates
    pub point_b: Vec2,

    /// Distance between the closest points
    pub distance: f64,

    /// Number of GJK iterations used
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    /// Support point on proxy A in world coordinates
    w_a: Vec2,

    /// Support point on proxy B in world coordinates
    w_b: Vec2,

    /// Minkowski difference point, `w_b - w_a`
    w: Vec2,

    /// Barycentric weight for the closest point
    a: f64,

    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        &mut self,
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) {
        debug_assert!(cache.count <= 3);

        self.count = cache.count;
        for i in 0..self.count {
            let v = &mut self.v[i];
            v.index_a = cache.index_a[i];
            v.index_b = cache.index_b[i];
            let w_a_local = proxy_a.vertex(v.index_a);
            let w_b_local = proxy_b.vertex(v.index_b);
            v.w_a = xf_a.transform_point(w_a_local);
            v.w_b = xf_b.transform_point(w_b_local);
            v.w = v.w_b - v.w_a;
            v.a = 0.0;
        }

        // If the cached simplex is far from the current configuration,
        // rebuild from scratch.
        if self.count > 1 {
            let metric1 = cache.metric;
            let metric2 = self.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < crate::math::EPSILON {
                self.count = 0;
            }
        }

        if self.count == 0 {
            let v = &mut self.v[0];
            v.index_a = 0;
            v.index_b = 0;
            let w_a_local = proxy_a.vertex(0);
            let w_b_local = proxy_b.vertex(0);
            v.w_a = xf_a.transform_point(w_a_local);
            v.w_b = xf_b.transform_point(w_b_local);
            v.w = v.w_b - v.w_a;
            v.a = 1.0;
            self.count = 1;
        }
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a;
            cache.index_b[i] = self.v[i].index_b;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(&(-self.v[0].w));
                if sgn > 0.0 {
                    // Origin is left of e12.
                    Vec2::scalar_cross(1.0, e12)
                } else {
                    // Origin is right of e12.
                    e12.cross_scalar(1.0)
                }
            }
            _ => Vec2::zero(),
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].w * self.v[0].a + self.v[1].w * self.v[1].a,
            3 => Vec2::zero(),
            _ => Vec2::zero(),
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.v[0].w_a, self.v[0].w_b),
            2 => (
                self.v[0].w_a * self.v[0].a + self.v[1].w_a * self.v[1].a,
                self.v[0].w_b * self.v[0].a + self.v[1].w_b * self.v[1].a,
            ),
            3 => {
                let p = self.v[0].w_a * self.v[0].a
                    + self.v[1].w_a * self.v[1].a
                    + self.v[2].w_a * self.v[2].a;
                (p, p)
            }
            _ => (Vec2::zero(), Vec2::zero()),
        }
    }

    fn metric(&self) -> f64 {
        match self.count {
            1 => 0.0,
            2 => self.v[0].w.distance(&self.v[1].w),
            3 => (self.v[1].w - self.v[0].w).cross(&(self.v[2].w - self.v[0].w)),
            _ => 0.0,
        }
    }

    /// Solves the line-segment simplex: finds the closest point to the
    /// origin on the segment and drops vertices outside its Voronoi region
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // Region of w1.
        let d12_2 = -w1.dot(&e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Region of w2.
        let d12_1 = w2.dot(&e12);
        if d12_1 <= 0.0 {
            self.v[0] = self.v[1];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Interior of the segment.
        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Solves the triangle simplex via barycentric Voronoi regions
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let w1e12 = w1.dot(&e12);
        let w2e12 = w2.dot(&e12);
        let d12_1 = w2e12;
        let d12_2 = -w1e12;

        let e13 = w3 - w1;
        let w1e13 = w1.dot(&e13);
        let w3e13 = w3.dot(&e13);
        let d13_1 = w3e13;
        let d13_2 = -w1e13;

        let e23 = w3 - w2;
        let w2e23 = w2.dot(&e23);
        let w3e23 = w3.dot(&e23);
        let d23_1 = w3e23;
        let d23_2 = -w2e23;

        let n123 = e12.cross(&e13);
        let d123_1 = n123 * w2.cross(&w3);
        let d123_2 = n123 * w3.cross(&w1);
        let d123_3 = n123 * w1.cross(&w2);

        // Vertex w1 region.
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge w1-w2 region.
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // Edge w1-w3 region.
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // Vertex w2 region.
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[0] = self.v[1];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Vertex w3 region.
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[0] = self.v[2];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge w2-w3 region.
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // The origin is inside the triangle.
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }
}

/// Computes the closest points between two convex proxies under fixed
/// transforms using GJK.
///
/// The simplex evolves toward the origin of the Minkowski difference until
/// it contains the origin (overlap) or no further progress is possible. The
/// cache warm starts repeated calls on the same pair. With `use_radii` set,
/// the result is shrunk by the proxy radii and reported as overlapping when
/// the adjusted distance vanishes.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let xf_a = input.transform_a;
    let xf_b = input.transform_b;

    let mut simplex = Simplex::default();
    simplex.read_cache(cache, proxy_a, &xf_a, proxy_b, &xf_b);

    // Support indices from the prior iteration, used to detect cycling.
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    let mut iterations = 0;
    while iterations < MAX_DISTANCE_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => unreachable!(),
        }

        // A 3-simplex encloses the origin: overlap.
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < crate::math::EPSILON * crate::math::EPSILON {
            // The origin is on an edge or vertex of the simplex; overlap
            // cannot be decided by pushing further.
            break;
        }

        // New support point in the search direction.
        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = proxy_a.support(xf_a.q.inv_rotate(-d));
        vertex.w_a = xf_a.transform_point(proxy_a.vertex(vertex.index_a));
        vertex.index_b = proxy_b.support(xf_b.q.inv_rotate(d));
        vertex.w_b = xf_b.transform_point(proxy_b.vertex(vertex.index_b));
        vertex.w = vertex.w_b - vertex.w_a;

        iterations += 1;

        // Main termination criterion: the new vertex repeats an old one.
        let mut duplicate = false;
        for i in 0..save_count {
            if simplex.v[simplex.count].index_a == save_a[i]
                && simplex.v[simplex.count].index_b == save_b[i]
            {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            break;
        }

        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = point_a.distance(&point_b);

    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius;
        let r_b = proxy_b.radius;

        if dist > r_a + r_b && dist > crate::math::EPSILON {
            // The shapes are separated; move the witness points onto the
            // skin surfaces.
            dist -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += normal * r_a;
            point_b -= normal * r_b;
        } else {
            // The skins overlap; collapse to a single midpoint.
            let p = (point_a + point_b) * 0.5;
            point_a = p;
            point_b = p;
            dist = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations,
    }
}

/// Returns whether two shape children overlap under the given transforms
pub fn test_overlap(
    shape_a: &Shape,
    child_a: usize,
    shape_b: &Shape,
    child_b: usize,
    xf_a: &Transform,
    xf_b: &Transform,
) -> bool {
    let input = DistanceInput {
        proxy_a: DistanceProxy::from_shape(shape_a, child_a),
        proxy_b: DistanceProxy::from_shape(shape_b, child_b),
        transform_a: *xf_a,
        transform_b: *xf_b,
        use_radii: true,
    };

    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);

    output.distance < 10.0 * crate::math::EPSILON
}
