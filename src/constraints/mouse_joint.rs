use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Mat22, Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a mouse joint: drags a point on body B toward a moving
/// world target through a critically-dampable spring
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MouseJointDef {
    /// A ground body; not moved by the joint
    pub body_a: crate::core::BodyHandle,

    /// The dragged body
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    /// World target the anchor is pulled toward
    pub target: Vec2,

    /// Maximum constraint force, usually expressed as a multiple of the
    /// body weight
    pub max_force: f64,

    /// Response frequency in hertz
    pub frequency_hz: f64,

    /// Damping ratio; 1 is critical damping
    pub damping_ratio: f64,
}

impl MouseJointDef {
    /// Creates a mouse joint definition targeting the body's current anchor
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, target: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            target,
            max_force: 0.0,
            frequency_hz: 5.0,
            damping_ratio: 0.7,
        }
    }
}

/// A soft point constraint pulling body B toward a user-controlled target
#[derive(Debug)]
pub struct MouseJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    /// Anchor on body B in local coordinates, captured at creation
    pub local_anchor_b: Vec2,

    target: Vec2,
    pub max_force: f64,
    pub frequency_hz: f64,
    pub damping_ratio: f64,

    impulse: Vec2,

    // Solver temp
    b: JointBodyData,
    r_b: Vec2,
    mass: Mat22,
    c: Vec2,
    gamma: f64,
    beta: f64,
}

impl MouseJoint {
    pub(crate) fn new(def: &MouseJointDef, local_anchor_b: Vec2) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_b,
            target: def.target,
            max_force: def.max_force,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec2::zero(),
            b: JointBodyData::default(),
            r_b: Vec2::zero(),
            mass: Mat22::zero(),
            c: Vec2::zero(),
            gamma: 0.0,
            beta: 0.0,
        }
    }

    /// Returns the current drag target
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Moves the drag target; the body is woken by the world wrapper
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        step: &TimeStep,
        bodies: &Arena<Body, BodyHandle>,
        positions: &[Position],
        velocities: &mut [Velocity],
    ) {
        self.b = JointBodyData::capture(bodies.get(self.body_b).unwrap());

        let c_b = positions[self.b.index].c;
        let a_b = positions[self.b.index].a;
        let q_b = Rot::new(a_b);

        let mass = bodies.get(self.body_b).unwrap().mass();

        // Frequency, damping, and gamma follow the soft-constraint
        // formulation.
        let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;
        let d = 2.0 * mass * self.damping_ratio * omega;
        let k = mass * omega * omega;

        let dt = step.dt;
        self.gamma = dt * (d + dt * k);
        if self.gamma != 0.0 {
            self.gamma = 1.0 / self.gamma;
        }
        self.beta = dt * k * self.gamma;

        self.r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);

        // K = diag(invMass) + skew(rB) * invI * skew(rB)^T + gamma * I
        let m_b = self.b.inv_mass;
        let i_b = self.b.inv_i;
        let k_matrix = Mat22::from_scalars(
            m_b + i_b * self.r_b.y * self.r_b.y + self.gamma,
            -i_b * self.r_b.x * self.r_b.y,
            -i_b * self.r_b.x * self.r_b.y,
            m_b + i_b * self.r_b.x * self.r_b.x + self.gamma,
        );

        self.mass = k_matrix.inverse();

        self.c = (c_b + self.r_b - self.target) * self.beta;

        // A little damping helps the target track smoothly.
        velocities[self.b.index].w *= 0.98;

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            velocities[self.b.index].v += self.impulse * m_b;
            velocities[self.b.index].w += i_b * self.r_b.cross(&self.impulse);
        } else {
            self.impulse = Vec2::zero();
        }
    }

    pub(crate) fn solve_velocity_constraints(
        &mut self,
        step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        let v_b = velocities[self.b.index].v;
        let w_b = velocities[self.b.index].w;

        // Cdot = v + cross(w, r)
        let c_dot = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let mut impulse =
            self.mass.mul_vec(-(c_dot + self.c + self.impulse * self.gamma));

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse = self.impulse.normalize() * max_impulse;
        }
        impulse = self.impulse - old_impulse;

        velocities[self.b.index].v = v_b + impulse * self.b.inv_mass;
        velocities[self.b.index].w = w_b + self.b.inv_i * self.r_b.cross(&impulse);
    }

    pub(crate) fn solve_position_constraints(&mut self, _positions: &mut [Position]) -> bool {
        // The mouse joint is a velocity-level spring; nothing to correct.
        true
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.impulse * inv_dt
    }

    /// Mouse joints carry no reaction torque
    pub fn reaction_torque(&self, _inv_dt: f64) -> f64 {
        0.0
    }
}
