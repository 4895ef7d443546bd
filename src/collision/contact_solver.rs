use crate::bodies::Body;
use crate::collision::contact::Contact;
use crate::collision::manifold::{ManifoldType, WorldManifold};
use crate::core::config::{
    BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS, TOI_BAUMGARTE,
    VELOCITY_THRESHOLD,
};
use crate::core::{Arena, BodyHandle, ContactHandle, Position, TimeStep, Velocity};
use crate::math::{Mat22, Rot, Transform, Vec2};

/// Velocity solver state for one manifold point
#[derive(Debug, Clone, Copy, Default)]
struct VelocityConstraintPoint {
    /// Contact point relative to body A's center
    r_a: Vec2,

    /// Contact point relative to body B's center
    r_b: Vec2,

    normal_impulse: f64,
    tangent_impulse: f64,
    normal_mass: f64,
    tangent_mass: f64,

    /// Restitution bias from the approach velocity
    velocity_bias: f64,
}

/// Velocity constraint for one contact
#[derive(Debug, Clone)]
pub(crate) struct ContactVelocityConstraint {
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    normal: Vec2,

    /// Block-solver effective mass of the 2-point system
    normal_mass: Mat22,
    k: Mat22,

    index_a: usize,
    index_b: usize,
    inv_mass_a: f64,
    inv_mass_b: f64,
    inv_i_a: f64,
    inv_i_b: f64,
    friction: f64,
    restitution: f64,
    tangent_speed: f64,
    point_count: usize,
}

impl ContactVelocityConstraint {
    /// Returns the accumulated normal impulse of point `i`
    pub fn normal_impulse(&self, i: usize) -> f64 {
        self.points[i].normal_impulse
    }

    /// Returns the accumulated tangent impulse of point `i`
    pub fn tangent_impulse(&self, i: usize) -> f64 {
        self.points[i].tangent_impulse
    }

    /// Returns the number of manifold points
    pub fn point_count(&self) -> usize {
        self.point_count
    }
}

/// Position solver state for one contact
#[derive(Debug, Clone)]
struct ContactPositionConstraint {
    local_points: [Vec2; MAX_MANIFOLD_POINTS],
    local_normal: Vec2,
    local_point: Vec2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f64,
    inv_mass_b: f64,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_i_a: f64,
    inv_i_b: f64,
    manifold_type: ManifoldType,
    radius_a: f64,
    radius_b: f64,
    point_count: usize,
}

/// Evaluation of one position constraint point at the current poses
struct PositionSolverManifold {
    normal: Vec2,
    point: Vec2,
    separation: f64,
}

impl PositionSolverManifold {
    fn new(pc: &ContactPositionConstraint, xf_a: &Transform, xf_b: &Transform, index: usize) -> Self {
        debug_assert!(pc.point_count > 0);

        match pc.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(pc.local_point);
                let point_b = xf_b.transform_point(pc.local_points[0]);
                let normal = (point_b - point_a).normalize();
                let point = (point_a + point_b) * 0.5;
                let separation = (point_b - point_a).dot(&normal) - pc.radius_a - pc.radius_b;
                Self { normal, point, separation }
            }
            ManifoldType::FaceA => {
                let normal = xf_a.q.rotate(pc.local_normal);
                let plane_point = xf_a.transform_point(pc.local_point);

                let clip_point = xf_b.transform_point(pc.local_points[index]);
                let separation =
                    (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b;
                Self {
                    normal,
                    point: clip_point,
                    separation,
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q.rotate(pc.local_normal);
                let plane_point = xf_b.transform_point(pc.local_point);

                let clip_point = xf_a.transform_point(pc.local_points[index]);
                let separation =
                    (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b;
                Self {
                    // Flip so the normal points from A to B.
                    normal: -normal,
                    point: clip_point,
                    separation,
                }
            }
        }
    }
}

/// Sequential-impulse contact solver over one island.
///
/// Built from the island's touching contacts; solves normal impulses first
/// (clamped non-negative, accumulated) then friction impulses (clamped to
/// the friction cone), with warm starting from the previous step's
/// manifold impulses. Two-point manifolds use a block solve when the
/// constraint matrix is well conditioned.
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,
    handles: Vec<ContactHandle>,
}

impl ContactSolver {
    /// Gathers constraint data from the island contacts
    pub fn new(
        step: TimeStep,
        handles: &[ContactHandle],
        contacts: &Arena<Contact, ContactHandle>,
        bodies: &Arena<Body, BodyHandle>,
    ) -> Self {
        let mut velocity_constraints = Vec::with_capacity(handles.len());
        let mut position_constraints = Vec::with_capacity(handles.len());

        for &handle in handles {
            let contact = contacts.get(handle).expect("island contact missing");

            let body_a = bodies.get(contact.fixture_a.body).expect("contact body missing");
            let body_b = bodies.get(contact.fixture_b.body).expect("contact body missing");
            let fixture_a = body_a.fixture(contact.fixture_a.id).expect("fixture missing");
            let fixture_b = body_b.fixture(contact.fixture_b.id).expect("fixture missing");

            let radius_a = fixture_a.shape.radius();
            let radius_b = fixture_b.shape.radius();
            let manifold = &contact.manifold;

            debug_assert!(manifold.point_count > 0);

            let mut vc = ContactVelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                normal: Vec2::zero(),
                normal_mass: Mat22::zero(),
                k: Mat22::zero(),
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_inertia,
                inv_i_b: body_b.inv_inertia,
                friction: contact.friction,
                restitution: contact.restitution,
                tangent_speed: contact.tangent_speed,
                point_count: manifold.point_count,
            };

            let mut pc = ContactPositionConstraint {
                local_points: [Vec2::zero(); MAX_MANIFOLD_POINTS],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                local_center_a: body_a.sweep.local_center,
                local_center_b: body_b.sweep.local_center,
                inv_i_a: body_a.inv_inertia,
                inv_i_b: body_b.inv_inertia,
                manifold_type: manifold.manifold_type,
                radius_a,
                radius_b,
                point_count: manifold.point_count,
            };

            for i in 0..manifold.point_count {
                let mp = &manifold.points[i];
                let vcp = &mut vc.points[i];

                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * mp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }

                pc.local_points[i] = mp.local_point;
            }

            velocity_constraints.push(vc);
            position_constraints.push(pc);
        }

        Self {
            velocity_constraints,
            position_constraints,
            handles: handles.to_vec(),
        }
    }

    /// Computes effective masses and restitution bias at the current poses
    pub fn initialize_velocity_constraints(
        &mut self,
        positions: &[Position],
        velocities: &[Velocity],
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
        {
            let radius_a = pc.radius_a;
            let radius_b = pc.radius_b;

            let index_a = vc.index_a;
            let index_b = vc.index_b;

            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let c_a = positions[index_a].c;
            let a_a = positions[index_a].a;
            let v_a = velocities[index_a].v;
            let w_a = velocities[index_a].w;

            let c_b = positions[index_b].c;
            let a_b = positions[index_b].a;
            let v_b = velocities[index_b].v;
            let w_b = velocities[index_b].w;

            let q_a = Rot::new(a_a);
            let q_b = Rot::new(a_b);
            let xf_a = Transform::new(c_a - q_a.rotate(pc.local_center_a), q_a);
            let xf_b = Transform::new(c_b - q_b.rotate(pc.local_center_b), q_b);

            // Rebuild the world manifold from the stored local manifold.
            let manifold = crate::collision::manifold::Manifold {
                points: {
                    let mut pts: [crate::collision::manifold::ManifoldPoint; MAX_MANIFOLD_POINTS] =
                        Default::default();
                    for i in 0..pc.point_count {
                        pts[i].local_point = pc.local_points[i];
                    }
                    pts
                },
                local_normal: pc.local_normal,
                local_point: pc.local_point,
                manifold_type: pc.manifold_type,
                point_count: pc.point_count,
            };
            let world_manifold =
                WorldManifold::initialize(&manifold, &xf_a, radius_a, &xf_b, radius_b);

            vc.normal = world_manifold.normal;

            for i in 0..vc.point_count {
                let vcp = &mut vc.points[i];

                vcp.r_a = world_manifold.points[i] - c_a;
                vcp.r_b = world_manifold.points[i] - c_b;

                let rn_a = vcp.r_a.cross(&vc.normal);
                let rn_b = vcp.r_b.cross(&vc.normal);

                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let tangent = vc.normal.cross_scalar(1.0);

                let rt_a = vcp.r_a.cross(&tangent);
                let rt_b = vcp.r_b.cross(&tangent);

                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                // Restitution bias from the approach speed.
                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(
                    &(v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                        - v_a
                        - Vec2::scalar_cross(w_a, vcp.r_a)),
                );
                if v_rel < -VELOCITY_THRESHOLD {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            // Prepare the block solver when both points are independent
            // enough; otherwise fall back to point-by-point solving.
            if vc.point_count == 2 {
                let vcp1 = vc.points[0];
                let vcp2 = vc.points[1];

                let rn1_a = vcp1.r_a.cross(&vc.normal);
                let rn1_b = vcp1.r_b.cross(&vc.normal);
                let rn2_a = vcp2.r_a.cross(&vc.normal);
                let rn2_b = vcp2.r_b.cross(&vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                let max_condition = 1000.0;
                if k11 * k11 < max_condition * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::from_scalars(k11, k12, k12, k22);
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // The constraints are nearly redundant; drop one.
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Applies the accumulated impulses from the previous step
    pub fn warm_start(&mut self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let index_a = vc.index_a;
            let index_b = vc.index_b;
            let m_a = vc.inv_mass_a;
            let i_a = vc.inv_i_a;
            let m_b = vc.inv_mass_b;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[index_a].v;
            let mut w_a = velocities[index_a].w;
            let mut v_b = velocities[index_b].v;
            let mut w_b = velocities[index_b].w;

            let normal = vc.normal;
            let tangent = normal.cross_scalar(1.0);

            for i in 0..vc.point_count {
                let vcp = &vc.points[i];
                let p = normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                w_a -= i_a * vcp.r_a.cross(&p);
                v_a -= p * m_a;
                w_b += i_b * vcp.r_b.cross(&p);
                v_b += p * m_b;
            }

            velocities[index_a].v = v_a;
            velocities[index_a].w = w_a;
            velocities[index_b].v = v_b;
            velocities[index_b].w = w_b;
        }
    }

    /// One velocity iteration over all contacts: friction then normal
    /// impulses, clamped and accumulated
    pub fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in self.velocity_constraints.iter_mut() {
            let index_a = vc.index_a;
            let index_b = vc.index_b;
            let m_a = vc.inv_mass_a;
            let i_a = vc.inv_i_a;
            let m_b = vc.inv_mass_b;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[index_a].v;
            let mut w_a = velocities[index_a].w;
            let mut v_b = velocities[index_b].v;
            let mut w_b = velocities[index_b].w;

            let normal = vc.normal;
            let tangent = normal.cross_scalar(1.0);
            let friction = vc.friction;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Solve tangent constraints first because non-penetration is
            // more important than friction.
            for i in 0..vc.point_count {
                let vcp = &mut vc.points[i];

                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);

                let vt = dv.dot(&tangent) - vc.tangent_speed;
                let mut lambda = vcp.tangent_mass * (-vt);

                // Clamp to the friction cone of the accumulated impulse.
                let max_friction = friction * vcp.normal_impulse;
                let new_impulse =
                    crate::math::clamp(vcp.tangent_impulse + lambda, -max_friction, max_friction);
                lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = tangent * lambda;

                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(&p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(&p);
            }

            // Normal constraints.
            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];

                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);
                let vn = dv.dot(&normal);

                let mut lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                // Accumulated impulses stay non-negative.
                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = normal * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(&p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(&p);
            } else {
                // Block solver for the coupled two-point system, after
                // "Numerical Methods for Least Squares Problems": enumerate
                // the four cases of the LCP and accept the first with a
                // feasible impulse and velocity.
                let a = Vec2::new(vc.points[0].normal_impulse, vc.points[1].normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = v_b + Vec2::scalar_cross(w_b, vc.points[0].r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vc.points[0].r_a);
                let dv2 = v_b + Vec2::scalar_cross(w_b, vc.points[1].r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vc.points[1].r_a);

                let mut vn1 = dv1.dot(&normal);
                let mut vn2 = dv2.dot(&normal);

                let mut b = Vec2::new(vn1 - vc.points[0].velocity_bias, vn2 - vc.points[1].velocity_bias);
                b -= vc.k.mul_vec(a);

                let x = 'solve: {
                    // Case 1: both points accumulate.
                    let candidate = -vc.normal_mass.mul_vec(b);
                    if candidate.x >= 0.0 && candidate.y >= 0.0 {
                        break 'solve candidate;
                    }

                    // Case 2: point 1 accumulates, point 2 separates.
                    let x1 = -vc.points[0].normal_mass * b.x;
                    vn2 = vc.k.ex.y * x1 + b.y;
                    if x1 >= 0.0 && vn2 >= 0.0 {
                        break 'solve Vec2::new(x1, 0.0);
                    }

                    // Case 3: point 2 accumulates, point 1 separates.
                    let x2 = -vc.points[1].normal_mass * b.y;
                    vn1 = vc.k.ey.x * x2 + b.x;
                    if x2 >= 0.0 && vn1 >= 0.0 {
                        break 'solve Vec2::new(0.0, x2);
                    }

                    // Case 4: both separate.
                    vn1 = b.x;
                    vn2 = b.y;
                    if vn1 >= 0.0 && vn2 >= 0.0 {
                        break 'solve Vec2::zero();
                    }

                    // No feasible case; numerical trouble. Keep the old
                    // impulses for this iteration.
                    a
                };

                let d = x - a;

                let p1 = normal * d.x;
                let p2 = normal * d.y;
                v_a -= (p1 + p2) * m_a;
                w_a -= i_a * (vc.points[0].r_a.cross(&p1) + vc.points[1].r_a.cross(&p2));
                v_b += (p1 + p2) * m_b;
                w_b += i_b * (vc.points[0].r_b.cross(&p1) + vc.points[1].r_b.cross(&p2));

                vc.points[0].normal_impulse = x.x;
                vc.points[1].normal_impulse = x.y;
            }

            velocities[index_a].v = v_a;
            velocities[index_a].w = w_a;
            velocities[index_b].v = v_b;
            velocities[index_b].w = w_b;
        }
    }

    /// Writes the accumulated impulses back into the contact manifolds so
    /// the next step can warm start
    pub fn store_impulses(&self, contacts: &mut Arena<Contact, ContactHandle>) {
        for (vc, &handle) in self.velocity_constraints.iter().zip(self.handles.iter()) {
            if let Some(contact) = contacts.get_mut(handle) {
                for i in 0..vc.point_count {
                    contact.manifold.points[i].normal_impulse = vc.points[i].normal_impulse;
                    contact.manifold.points[i].tangent_impulse = vc.points[i].tangent_impulse;
                }
            }
        }
    }

    /// Returns the per-contact velocity constraints, parallel to the island
    /// contact list; used for `post_solve` reporting
    pub fn velocity_constraints(&self) -> &[ContactVelocityConstraint] {
        &self.velocity_constraints
    }

    /// One position iteration: push the deepest points apart with a
    /// Baumgarte fraction. Returns true when the worst separation is within
    /// tolerance.
    pub fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        self.solve_position_constraints_impl(positions, None)
    }

    /// TOI position iteration: only the two sub-stepped bodies get mass;
    /// everything else acts as static geometry
    pub fn solve_toi_position_constraints(
        &mut self,
        positions: &mut [Position],
        toi_index_a: usize,
        toi_index_b: usize,
    ) -> bool {
        self.solve_position_constraints_impl(positions, Some((toi_index_a, toi_index_b)))
    }

    fn solve_position_constraints_impl(
        &mut self,
        positions: &mut [Position],
        toi_indices: Option<(usize, usize)>,
    ) -> bool {
        let mut min_separation = 0.0f64;

        let baumgarte = if toi_indices.is_some() {
            TOI_BAUMGARTE
        } else {
            BAUMGARTE
        };

        for pc in &self.position_constraints {
            let index_a = pc.index_a;
            let index_b = pc.index_b;
            let local_center_a = pc.local_center_a;
            let local_center_b = pc.local_center_b;

            let (m_a, i_a, m_b, i_b) = match toi_indices {
                None => (pc.inv_mass_a, pc.inv_i_a, pc.inv_mass_b, pc.inv_i_b),
                Some((toi_a, toi_b)) => {
                    // Only the TOI bodies move; other island members are
                    // treated as having infinite mass.
                    let (mut m_a, mut i_a) = (0.0, 0.0);
                    if index_a == toi_a || index_a == toi_b {
                        m_a = pc.inv_mass_a;
                        i_a = pc.inv_i_a;
                    }
                    let (mut m_b, mut i_b) = (0.0, 0.0);
                    if index_b == toi_a || index_b == toi_b {
                        m_b = pc.inv_mass_b;
                        i_b = pc.inv_i_b;
                    }
                    (m_a, i_a, m_b, i_b)
                }
            };

            let mut c_a = positions[index_a].c;
            let mut a_a = positions[index_a].a;
            let mut c_b = positions[index_b].c;
            let mut a_b = positions[index_b].a;

            // Solve normal constraints point by point.
            for j in 0..pc.point_count {
                let q_a = Rot::new(a_a);
                let q_b = Rot::new(a_b);
                let xf_a = Transform::new(c_a - q_a.rotate(local_center_a), q_a);
                let xf_b = Transform::new(c_b - q_b.rotate(local_center_b), q_b);

                let psm = PositionSolverManifold::new(pc, &xf_a, &xf_b, j);
                let normal = psm.normal;
                let point = psm.point;
                let separation = psm.separation;

                let r_a = point - c_a;
                let r_b = point - c_b;

                min_separation = min_separation.min(separation);

                // Clamp the correction to prevent overshoot while allowing
                // the slop to remain.
                let correction = crate::math::clamp(
                    baumgarte * (separation + LINEAR_SLOP),
                    -MAX_LINEAR_CORRECTION,
                    0.0,
                );

                let rn_a = r_a.cross(&normal);
                let rn_b = r_b.cross(&normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

                // A zero effective mass gets no impulse this iteration.
                let impulse = if k > 0.0 { -correction / k } else { 0.0 };

                let p = normal * impulse;

                c_a -= p * m_a;
                a_a -= i_a * r_a.cross(&p);
                c_b += p * m_b;
                a_b += i_b * r_b.cross(&p);
            }

            positions[index_a].c = c_a;
            positions[index_a].a = a_a;
            positions[index_b].c = c_b;
            positions[index_b].a = a_b;
        }

        // Allow up to 3 slops of residual penetration because the solver
        // may push the slop back in elsewhere.
        min_separation >= -3.0 * LINEAR_SLOP
    }
}
