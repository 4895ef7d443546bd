use crate::bodies::{Body, BodyType};
use crate::collision::contact_solver::ContactSolver;
use crate::collision::Contact;
use crate::constraints::Joint;
use crate::core::config::{
    ANGULAR_SLEEP_TOLERANCE, LINEAR_SLEEP_TOLERANCE, MAX_ROTATION, MAX_ROTATION_SQUARED,
    MAX_TRANSLATION, MAX_TRANSLATION_SQUARED, TIME_TO_SLEEP,
};
use crate::core::events::{ContactImpulse, ContactListener};
use crate::core::{Arena, BodyHandle, ContactHandle, JointHandle, Position, TimeStep, Velocity};
use crate::math::Vec2;

/// A transient connected component of awake bodies plus the contacts and
/// joints among them, solved as a unit.
///
/// Built by depth-first traversal of the contact and joint graph from each
/// unvisited awake dynamic seed; static bodies join islands but never seed
/// or continue the traversal.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub bodies: Vec<BodyHandle>,
    pub contacts: Vec<ContactHandle>,
    pub joints: Vec<JointHandle>,
}

impl Island {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }
}

/// Reports accumulated contact impulses to the listener after a solve
fn report<'a>(
    island: &Island,
    solver: &ContactSolver,
    contacts: &Arena<Contact, ContactHandle>,
    listener: &mut Option<&'a mut dyn ContactListener>,
) {
    let listener = match listener.as_deref_mut() {
        Some(l) => l,
        None => return,
    };

    for (i, vc) in solver.velocity_constraints().iter().enumerate() {
        let handle = island.contacts[i];
        let contact = match contacts.get(handle) {
            Some(c) => c,
            None => continue,
        };

        let mut impulse = ContactImpulse {
            count: vc.point_count(),
            ..Default::default()
        };
        for j in 0..vc.point_count() {
            impulse.normal_impulses[j] = vc.normal_impulse(j);
            impulse.tangent_impulses[j] = vc.tangent_impulse(j);
        }

        listener.post_solve(handle, contact, &impulse);
    }
}

/// Solves one island for a discrete step: integrate forces, solve velocity
/// constraints with warm starting, integrate positions with clamps, then
/// correct positions and update sleep state.
#[allow(clippy::too_many_arguments)]
pub(crate) fn solve_island<'a>(
    island: &Island,
    step: &TimeStep,
    gravity: Vec2,
    allow_sleep: bool,
    bodies: &mut Arena<Body, BodyHandle>,
    contacts: &mut Arena<Contact, ContactHandle>,
    joints: &mut Arena<Joint, JointHandle>,
    listener: &mut Option<&'a mut dyn ContactListener>,
) {
    let h = step.dt;

    let mut positions: Vec<Position> = Vec::with_capacity(island.bodies.len());
    let mut velocities: Vec<Velocity> = Vec::with_capacity(island.bodies.len());

    // Integrate velocities and copy state into the solver arrays.
    for &handle in &island.bodies {
        let body = bodies.get_mut(handle).unwrap();

        let c = body.sweep.c;
        let a = body.sweep.a;
        let mut v = body.linear_velocity;
        let mut w = body.angular_velocity;

        // Store the step start for CCD sweeps.
        body.sweep.c0 = body.sweep.c;
        body.sweep.a0 = body.sweep.a;

        if body.body_type() == BodyType::Dynamic {
            v += (gravity * body.gravity_scale + body.force * body.inv_mass) * h;
            w += h * body.inv_inertia * body.torque;

            // Apply damping as the solution of dv/dt = -c*v, using the
            // Pade approximation v2 = v1 * 1 / (1 + c * dt).
            v *= 1.0 / (1.0 + h * body.linear_damping);
            w *= 1.0 / (1.0 + h * body.angular_damping);
        }

        positions.push(Position { c, a });
        velocities.push(Velocity { v, w });
    }

    let mut contact_solver = ContactSolver::new(*step, &island.contacts, contacts, bodies);
    contact_solver.initialize_velocity_constraints(&positions, &velocities);

    if step.warm_starting {
        contact_solver.warm_start(&mut velocities);
    }

    for &handle in &island.joints {
        let joint = joints.get_mut(handle).unwrap();
        joint.init_velocity_constraints(step, bodies, &positions, &mut velocities);
    }

    // Velocity iterations.
    for _ in 0..step.velocity_iterations {
        for &handle in &island.joints {
            let joint = joints.get_mut(handle).unwrap();
            joint.solve_velocity_constraints(step, &mut velocities);
        }
        contact_solver.solve_velocity_constraints(&mut velocities);
    }

    contact_solver.store_impulses(contacts);

    // Integrate positions with per-step translation and rotation clamps.
    for i in 0..island.bodies.len() {
        let mut c = positions[i].c;
        let mut a = positions[i].a;
        let mut v = velocities[i].v;
        let mut w = velocities[i].w;

        let translation = v * h;
        if translation.length_squared() > MAX_TRANSLATION_SQUARED {
            v *= MAX_TRANSLATION / translation.length();
        }

        let rotation = h * w;
        if rotation * rotation > MAX_ROTATION_SQUARED {
            w *= MAX_ROTATION / rotation.abs();
        }

        c += v * h;
        a += h * w;

        positions[i].c = c;
        positions[i].a = a;
        velocities[i].v = v;
        velocities[i].w = w;
    }

    // Position iterations with early exit on convergence.
    let mut position_solved = false;
    for _ in 0..step.position_iterations {
        let contacts_okay = contact_solver.solve_position_constraints(&mut positions);

        let mut joints_okay = true;
        for &handle in &island.joints {
            let joint = joints.get_mut(handle).unwrap();
            let joint_okay = joint.solve_position_constraints(&mut positions);
            joints_okay = joints_okay && joint_okay;
        }

        if contacts_okay && joints_okay {
            position_solved = true;
            break;
        }
    }

    // Copy state back to the bodies.
    for (i, &handle) in island.bodies.iter().enumerate() {
        let body = bodies.get_mut(handle).unwrap();
        body.sweep.c = positions[i].c;
        body.sweep.a = positions[i].a;
        body.linear_velocity = velocities[i].v;
        body.angular_velocity = velocities[i].w;
        body.synchronize_transform();
    }

    report(island, &contact_solver, contacts, listener);

    if allow_sleep {
        let mut min_sleep_time = f64::MAX;

        let lin_tol_sqr = LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE;
        let ang_tol_sqr = ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;

        for &handle in &island.bodies {
            let body = bodies.get_mut(handle).unwrap();
            if body.body_type() == BodyType::Static {
                continue;
            }

            if !body.is_sleep_allowed()
                || body.angular_velocity * body.angular_velocity > ang_tol_sqr
                || body.linear_velocity.length_squared() > lin_tol_sqr
            {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += h;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }

        if min_sleep_time >= TIME_TO_SLEEP && position_solved {
            for &handle in &island.bodies {
                let body = bodies.get_mut(handle).unwrap();
                body.set_awake(false);
            }
        }
    }
}

/// Solves a TOI sub-step island: position-only recovery of the impact pair
/// followed by a velocity solve without warm starting.
#[allow(clippy::too_many_arguments)]
pub(crate) fn solve_toi_island<'a>(
    island: &Island,
    sub_step: &TimeStep,
    toi_index_a: usize,
    toi_index_b: usize,
    bodies: &mut Arena<Body, BodyHandle>,
    contacts: &mut Arena<Contact, ContactHandle>,
    listener: &mut Option<&'a mut dyn ContactListener>,
) {
    debug_assert!(toi_index_a < island.bodies.len());
    debug_assert!(toi_index_b < island.bodies.len());

    let mut positions: Vec<Position> = Vec::with_capacity(island.bodies.len());
    let mut velocities: Vec<Velocity> = Vec::with_capacity(island.bodies.len());

    for &handle in &island.bodies {
        let body = bodies.get(handle).unwrap();
        positions.push(Position {
            c: body.sweep.c,
            a: body.sweep.a,
        });
        velocities.push(Velocity {
            v: body.linear_velocity,
            w: body.angular_velocity,
        });
    }

    let mut contact_solver = ContactSolver::new(*sub_step, &island.contacts, contacts, bodies);

    // Solve TOI-based position constraints.
    for _ in 0..sub_step.position_iterations {
        let contacts_okay =
            contact_solver.solve_toi_position_constraints(&mut positions, toi_index_a, toi_index_b);
        if contacts_okay {
            break;
        }
    }

    // Leap of faith to the safe position of the impact pair: the recovered
    // poses become the sweep start for the remainder of the step.
    {
        let handle_a = island.bodies[toi_index_a];
        let body_a = bodies.get_mut(handle_a).unwrap();
        body_a.sweep.c0 = positions[toi_index_a].c;
        body_a.sweep.a0 = positions[toi_index_a].a;
    }
    {
        let handle_b = island.bodies[toi_index_b];
        let body_b = bodies.get_mut(handle_b).unwrap();
        body_b.sweep.c0 = positions[toi_index_b].c;
        body_b.sweep.a0 = positions[toi_index_b].a;
    }

    // No warm starting needed for this sub-step; impulses were flushed by
    // the discrete solve.
    contact_solver.initialize_velocity_constraints(&positions, &velocities);

    for _ in 0..sub_step.velocity_iterations {
        contact_solver.solve_velocity_constraints(&mut velocities);
    }

    // Impulses are not stored for warm starting; the discrete phase owns
    // the accumulators.

    let h = sub_step.dt;

    for i in 0..island.bodies.len() {
        let mut c = positions[i].c;
        let mut a = positions[i].a;
        let mut v = velocities[i].v;
        let mut w = velocities[i].w;

        let translation = v * h;
        if translation.length_squared() > MAX_TRANSLATION_SQUARED {
            v *= MAX_TRANSLATION / translation.length();
        }

        let rotation = h * w;
        if rotation * rotation > MAX_ROTATION_SQUARED {
            w *= MAX_ROTATION / rotation.abs();
        }

        c += v * h;
        a += h * w;

        positions[i].c = c;
        positions[i].a = a;
        velocities[i].v = v;
        velocities[i].w = w;

        let body = bodies.get_mut(island.bodies[i]).unwrap();
        body.sweep.c = c;
        body.sweep.a = a;
        body.linear_velocity = v;
        body.angular_velocity = w;
        body.synchronize_transform();
    }

    report(island, &contact_solver, contacts, listener);
}
