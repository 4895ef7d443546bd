use crate::collision::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::core::config::{LINEAR_SLOP, MAX_TOI_ITERATIONS, MAX_TOI_ROOT_ITERATIONS};
use crate::math::{Sweep, Vec2};

/// Input for a time-of-impact query between two swept proxies
#[derive(Debug, Clone)]
pub struct ToiInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,

    /// Upper bound of the search interval, usually 1 for a full step
    pub t_max: f64,
}

/// Classification of a time-of-impact result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToiState {
    /// No result computed
    Unknown,

    /// Iteration cap reached; `t` holds the best known time
    Failed,

    /// The proxies were already overlapping at the start of the interval
    Overlapped,

    /// First touch found at `t`
    Touching,

    /// The proxies never come within tolerance in `[0, t_max]`
    Separated,
}

/// Output of a time-of-impact query
#[derive(Debug, Clone, Copy)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f64,
}

enum SeparationType {
    Points,
    FaceA,
    FaceB,
}

/// A separating axis between two swept proxies, derived from the closest
/// features reported by GJK at some time
struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    kind: SeparationType,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: &Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: &Sweep,
        t1: f64,
    ) -> Self {
        debug_assert!(0 < cache.count && cache.count < 3);

        let xf_a = sweep_a.transform_at(t1);
        let xf_b = sweep_b.transform_at(t1);

        if cache.count == 1 {
            // Closest features are single points.
            let local_point_a = proxy_a.vertex(cache.index_a[0]);
            let local_point_b = proxy_b.vertex(cache.index_b[0]);
            let point_a = xf_a.transform_point(local_point_a);
            let point_b = xf_b.transform_point(local_point_b);
            let axis = (point_b - point_a).normalize();

            Self {
                proxy_a,
                proxy_b,
                sweep_a: *sweep_a,
                sweep_b: *sweep_b,
                kind: SeparationType::Points,
                local_point: Vec2::zero(),
                axis,
            }
        } else if cache.index_a[0] == cache.index_a[1] {
            // Two points on B, one on A: use B's face normal.
            let local_point_b1 = proxy_b.vertex(cache.index_b[0]);
            let local_point_b2 = proxy_b.vertex(cache.index_b[1]);

            let mut axis = (local_point_b2 - local_point_b1).cross_scalar(1.0).normalize();
            let normal = xf_b.q.rotate(axis);

            let local_point = (local_point_b1 + local_point_b2) * 0.5;
            let point_b = xf_b.transform_point(local_point);

            let local_point_a = proxy_a.vertex(cache.index_a[0]);
            let point_a = xf_a.transform_point(local_point_a);

            let s = (point_a - point_b).dot(&normal);
            if s < 0.0 {
                axis = -axis;
            }

            Self {
                proxy_a,
                proxy_b,
                sweep_a: *sweep_a,
                sweep_b: *sweep_b,
                kind: SeparationType::FaceB,
                local_point,
                axis,
            }
        } else {
            // Two points on A: use A's face normal.
            let local_point_a1 = proxy_a.vertex(cache.index_a[0]);
            let local_point_a2 = proxy_a.vertex(cache.index_a[1]);

            let mut axis = (local_point_a2 - local_point_a1).cross_scalar(1.0).normalize();
            let normal = xf_a.q.rotate(axis);

            let local_point = (local_point_a1 + local_point_a2) * 0.5;
            let point_a = xf_a.transform_point(local_point);

            let local_point_b = proxy_b.vertex(cache.index_b[0]);
            let point_b = xf_b.transform_point(local_point_b);

            let s = (point_b - point_a).dot(&normal);
            if s < 0.0 {
                axis = -axis;
            }

            Self {
                proxy_a,
                proxy_b,
                sweep_a: *sweep_a,
                sweep_b: *sweep_b,
                kind: SeparationType::FaceA,
                local_point,
                axis,
            }
        }
    }

    /// Finds the support points minimizing separation at time `t`.
    /// Returns the separation and the chosen vertex indices.
    fn find_min_separation(&self, t: f64) -> (f64, usize, usize) {
        let xf_a = self.sweep_a.transform_at(t);
        let xf_b = self.sweep_b.transform_at(t);

        match self.kind {
            SeparationType::Points => {
                let axis_a = xf_a.q.inv_rotate(self.axis);
                let axis_b = xf_b.q.inv_rotate(-self.axis);

                let index_a = self.proxy_a.support(axis_a);
                let index_b = self.proxy_b.support(axis_b);

                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&self.axis), index_a, index_b)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q.rotate(self.axis);
                let point_a = xf_a.transform_point(self.local_point);

                let axis_b = xf_b.q.inv_rotate(-normal);
                let index_b = self.proxy_b.support(axis_b);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&normal), usize::MAX, index_b)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q.rotate(self.axis);
                let point_b = xf_b.transform_point(self.local_point);

                let axis_a = xf_a.q.inv_rotate(-normal);
                let index_a = self.proxy_a.support(axis_a);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(&normal), index_a, usize::MAX)
            }
        }
    }

    /// Evaluates separation for fixed support indices at time `t`
    fn evaluate(&self, index_a: usize, index_b: usize, t: f64) -> f64 {
        let xf_a = self.sweep_a.transform_at(t);
        let xf_b = self.sweep_b.transform_at(t);

        match self.kind {
            SeparationType::Points => {
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&self.axis)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q.rotate(self.axis);
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&normal)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q.rotate(self.axis);
                let point_b = xf_b.transform_point(self.local_point);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(&normal)
            }
        }
    }
}

/// Computes the first time in `[0, t_max]` at which two swept proxies come
/// within a target tolerance of touching, or proves they stay apart.
///
/// The outer loop alternates GJK distance queries with scalar root finding
/// along the current separating axis. Non-rotating sweeps converge in one
/// iteration; deep rotation may exhaust the cap, in which case the state is
/// `Failed` and the caller falls back to discrete collision next step.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations make the root finder multimodal; normalizing keeps the
    // angles in range.
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = input.proxy_a.radius + input.proxy_b.radius;
    let target = LINEAR_SLOP.max(total_radius - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    let mut output = ToiOutput {
        state: ToiState::Unknown,
        t: t_max,
    };

    let mut cache = SimplexCache::default();

    // The outer loop progressively attempts to find new separating axes
    // until the sweeps are exhausted or a touch time is found.
    for _ in 0..MAX_TOI_ITERATIONS {
        let xf_a = sweep_a.transform_at(t1);
        let xf_b = sweep_b.transform_at(t1);

        let distance_input = DistanceInput {
            proxy_a: input.proxy_a.clone(),
            proxy_b: input.proxy_b.clone(),
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii: false,
        };
        let distance_output = distance(&mut cache, &distance_input);

        // The shape cores are overlapping beyond recovery.
        if distance_output.distance <= 0.0 {
            output.state = ToiState::Overlapped;
            output.t = 0.0;
            break;
        }

        // The core distance excludes the skin radii; shapes whose skins
        // already penetrate at the start of the sweep are overlapped, not a
        // root to be found.
        if t1 == 0.0 && distance_output.distance < total_radius - tolerance {
            output.state = ToiState::Overlapped;
            output.t = 0.0;
            break;
        }

        if distance_output.distance < target + tolerance {
            output.state = ToiState::Touching;
            output.t = t1;
            break;
        }

        let fcn = SeparationFunction::new(&cache, &input.proxy_a, &sweep_a, &input.proxy_b, &sweep_b, t1);

        // Resolve the deepest point at t2 by successively rooting the
        // separation function along the axis.
        let mut done = false;
        let mut t2 = t_max;
        let mut push_back_iters = 0;
        loop {
            let (mut s2, index_a, index_b) = fcn.find_min_separation(t2);

            // The final configuration is separated along this axis.
            if s2 > target + tolerance {
                output.state = ToiState::Separated;
                output.t = t_max;
                done = true;
                break;
            }

            // The axis crosses the target band inside [t1, t2]; advance t1.
            if s2 > target - tolerance {
                t1 = t2;
                break;
            }

            let mut s1 = fcn.evaluate(index_a, index_b, t1);

            // The initial overlap exceeds the target: either numerical
            // drift or an initial touch.
            if s1 < target - tolerance {
                output.state = ToiState::Failed;
                output.t = t1;
                done = true;
                break;
            }

            if s1 <= target + tolerance {
                output.state = ToiState::Touching;
                output.t = t1;
                done = true;
                break;
            }

            // Root find on target - s(t), alternating bisection with the
            // secant rule for cubic convergence.
            let mut a1 = t1;
            let mut a2 = t2;
            for root_iters in 0..MAX_TOI_ROOT_ITERATIONS {
                let t = if root_iters & 1 == 1 {
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    0.5 * (a1 + a2)
                };

                let s = fcn.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }
            }

            push_back_iters += 1;
            if push_back_iters == crate::core::config::MAX_POLYGON_VERTICES {
                break;
            }
        }

        if done {
            break;
        }

        output.state = ToiState::Failed;
        output.t = t1;
    }

    if output.state == ToiState::Failed {
        log::warn!("time of impact root finder failed to converge, t = {}", output.t);
    }

    ToiOutput {
        state: output.state,
        t: output.t,
    }
}
