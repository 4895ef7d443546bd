use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::config::LINEAR_SLOP;
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a distance joint: keeps two local anchor points a fixed
/// distance apart, optionally softened into a spring-damper
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DistanceJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    /// Anchor point on body A in local coordinates
    pub local_anchor_a: Vec2,

    /// Anchor point on body B in local coordinates
    pub local_anchor_b: Vec2,

    /// Rest length between the anchors
    pub length: f64,

    /// Spring frequency in hertz; 0 makes the joint rigid
    pub frequency_hz: f64,

    /// Spring damping ratio; 1 is critical damping
    pub damping_ratio: f64,
}

impl DistanceJointDef {
    /// Creates a rigid distance joint definition
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            length: 1.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }
}

/// A point-to-point distance constraint along the axis between two anchors
#[derive(Debug)]
pub struct DistanceJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length: f64,
    pub frequency_hz: f64,
    pub damping_ratio: f64,

    /// Accumulated axial impulse
    impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    gamma: f64,
    bias: f64,
    mass: f64,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length.max(LINEAR_SLOP),
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            u: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            gamma: 0.0,
            bias: 0.0,
            mass: 0.0,
        }
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        step: &TimeStep,
        bodies: &Arena<Body, BodyHandle>,
        positions: &[Position],
        velocities: &mut [Velocity],
    ) {
        self.a = JointBodyData::capture(bodies.get(self.body_a).unwrap());
        self.b = JointBodyData::capture(bodies.get(self.body_b).unwrap());

        let c_a = positions[self.a.index].c;
        let a_a = positions[self.a.index].a;
        let c_b = positions[self.b.index].c;
        let a_b = positions[self.b.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        self.r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        self.r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);
        self.u = c_b + self.r_b - c_a - self.r_a;

        // Handle singularity.
        let length = self.u.length();
        if length > LINEAR_SLOP {
            self.u /= length;
        } else {
            self.u = Vec2::zero();
        }

        let cr_a_u = self.r_a.cross(&self.u);
        let cr_b_u = self.r_b.cross(&self.u);
        let mut inv_mass = self.a.inv_mass
            + self.a.inv_i * cr_a_u * cr_a_u
            + self.b.inv_mass
            + self.b.inv_i * cr_b_u * cr_b_u;

        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency_hz > 0.0 {
            let c = length - self.length;

            let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;

            // Damping and spring coefficients.
            let d = 2.0 * self.mass * self.damping_ratio * omega;
            let k = self.mass * omega * omega;

            let dt = step.dt;
            self.gamma = dt * (d + dt * k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * dt * k * self.gamma;

            inv_mass += self.gamma;
            self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;

            let p = self.u * self.impulse;
            velocities[self.a.index].v -= p * self.a.inv_mass;
            velocities[self.a.index].w -= self.a.inv_i * self.r_a.cross(&p);
            velocities[self.b.index].v += p * self.b.inv_mass;
            velocities[self.b.index].w += self.b.inv_i * self.r_b.cross(&p);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(
        &mut self,
        _step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        let v_a = velocities[self.a.index].v;
        let w_a = velocities[self.a.index].w;
        let v_b = velocities[self.b.index].v;
        let w_b = velocities[self.b.index].w;

        let vp_a = v_a + Vec2::scalar_cross(w_a, self.r_a);
        let vp_b = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let c_dot = self.u.dot(&(vp_b - vp_a));

        let impulse = -self.mass * (c_dot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = self.u * impulse;
        velocities[self.a.index].v = v_a - p * self.a.inv_mass;
        velocities[self.a.index].w = w_a - self.a.inv_i * self.r_a.cross(&p);
        velocities[self.b.index].v = v_b + p * self.b.inv_mass;
        velocities[self.b.index].w = w_b + self.b.inv_i * self.r_b.cross(&p);
    }

    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        // Springs carry no positional constraint.
        if self.frequency_hz > 0.0 {
            return true;
        }

        let mut c_a = positions[self.a.index].c;
        let mut a_a = positions[self.a.index].a;
        let mut c_b = positions[self.b.index].c;
        let mut a_b = positions[self.b.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);
        let mut u = c_b + r_b - c_a - r_a;

        let length = u.normalize_mut();
        let c = crate::math::clamp(
            length - self.length,
            -crate::core::config::MAX_LINEAR_CORRECTION,
            crate::core::config::MAX_LINEAR_CORRECTION,
        );

        let impulse = -self.mass * c;
        let p = u * impulse;

        c_a -= p * self.a.inv_mass;
        a_a -= self.a.inv_i * r_a.cross(&p);
        c_b += p * self.b.inv_mass;
        a_b += self.b.inv_i * r_b.cross(&p);

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;

        c.abs() < LINEAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.u * (inv_dt * self.impulse)
    }

    /// Distance joints carry no reaction torque
    pub fn reaction_torque(&self, _inv_dt: f64) -> f64 {
        0.0
    }
}
