use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::config::LINEAR_SLOP;
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a pulley joint: an idealized rope through two ground
/// anchors, with `length_a + ratio * length_b` held constant
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PulleyJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    /// World anchor the A-side rope hangs from
    pub ground_anchor_a: Vec2,

    /// World anchor the B-side rope hangs from
    pub ground_anchor_b: Vec2,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// Rest length of the A-side rope
    pub length_a: f64,

    /// Rest length of the B-side rope
    pub length_b: f64,

    /// Block-and-tackle ratio applied to the B side
    pub ratio: f64,
}

impl PulleyJointDef {
    /// Creates a pulley joint definition with unit ratio
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: true,
            ground_anchor_a: Vec2::new(-1.0, 1.0),
            ground_anchor_b: Vec2::new(1.0, 1.0),
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            length_a: 0.0,
            length_b: 0.0,
            ratio: 1.0,
        }
    }
}

/// A pulley constraint over two ground anchors
#[derive(Debug)]
pub struct PulleyJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub ground_anchor_a: Vec2,
    pub ground_anchor_b: Vec2,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length_a: f64,
    pub length_b: f64,
    pub ratio: f64,

    /// Total rope length budget, `length_a + ratio * length_b`
    constant: f64,

    /// Accumulated rope impulse
    impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    u_a: Vec2,
    u_b: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f64,
}

impl PulleyJoint {
    pub(crate) fn new(def: &PulleyJointDef) -> Self {
        debug_assert!(def.ratio > crate::math::EPSILON);
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length_a: def.length_a,
            length_b: def.length_b,
            ratio: def.ratio,
            constant: def.length_a + def.ratio * def.length_b,
            impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            u_a: Vec2::zero(),
            u_b: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
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

        // Rope directions from the ground anchors.
        self.u_a = c_a + self.r_a - self.ground_anchor_a;
        self.u_b = c_b + self.r_b - self.ground_anchor_b;

        let length_a = self.u_a.length();
        let length_b = self.u_b.length();

        if length_a > 10.0 * LINEAR_SLOP {
            self.u_a /= length_a;
        } else {
            self.u_a = Vec2::zero();
        }

        if length_b > 10.0 * LINEAR_SLOP {
            self.u_b /= length_b;
        } else {
            self.u_b = Vec2::zero();
        }

        let cr_a = self.r_a.cross(&self.u_a);
        let cr_b = self.r_b.cross(&self.u_b);

        let m_a = self.a.inv_mass + self.a.inv_i * cr_a * cr_a;
        let m_b = self.b.inv_mass + self.b.inv_i * cr_b * cr_b;

        self.mass = m_a + self.ratio * self.ratio * m_b;

        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;

            let p_a = self.u_a * (-self.impulse);
            let p_b = self.u_b * (-self.ratio * self.impulse);

            velocities[self.a.index].v += p_a * self.a.inv_mass;
            velocities[self.a.index].w += self.a.inv_i * self.r_a.cross(&p_a);
            velocities[self.b.index].v += p_b * self.b.inv_mass;
            velocities[self.b.index].w += self.b.inv_i * self.r_b.cross(&p_b);
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

        let c_dot = -self.u_a.dot(&vp_a) - self.ratio * self.u_b.dot(&vp_b);
        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        let p_a = self.u_a * (-impulse);
        let p_b = self.u_b * (-self.ratio * impulse);

        velocities[self.a.index].v = v_a + p_a * self.a.inv_mass;
        velocities[self.a.index].w = w_a + self.a.inv_i * self.r_a.cross(&p_a);
        velocities[self.b.index].v = v_b + p_b * self.b.inv_mass;
        velocities[self.b.index].w = w_b + self.b.inv_i * self.r_b.cross(&p_b);
    }

    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        let mut c_a = positions[self.a.index].c;
        let mut a_a = positions[self.a.index].a;
        let mut c_b = positions[self.b.index].c;
        let mut a_b = positions[self.b.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        // Anchor arms are recomputed at the current poses rather than
        // reusing the velocity-phase values.
        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);

        let mut u_a = c_a + r_a - self.ground_anchor_a;
        let mut u_b = c_b + r_b - self.ground_anchor_b;

        let length_a = u_a.length();
        let length_b = u_b.length();

        if length_a > 10.0 * LINEAR_SLOP {
            u_a /= length_a;
        } else {
            u_a = Vec2::zero();
        }

        if length_b > 10.0 * LINEAR_SLOP {
            u_b /= length_b;
        } else {
            u_b = Vec2::zero();
        }

        let cr_a = r_a.cross(&u_a);
        let cr_b = r_b.cross(&u_b);

        let m_a = self.a.inv_mass + self.a.inv_i * cr_a * cr_a;
        let m_b = self.b.inv_mass + self.b.inv_i * cr_b * cr_b;

        let mut mass = m_a + self.ratio * self.ratio * m_b;
        if mass > 0.0 {
            mass = 1.0 / mass;
        }

        let c = self.constant - length_a - self.ratio * length_b;
        let linear_error = c.abs();

        let impulse = -mass * c;

        let p_a = u_a * (-impulse);
        let p_b = u_b * (-self.ratio * impulse);

        c_a += p_a * self.a.inv_mass;
        a_a += self.a.inv_i * r_a.cross(&p_a);
        c_b += p_b * self.b.inv_mass;
        a_b += self.b.inv_i * r_b.cross(&p_b);

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;

        linear_error < LINEAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.u_b * (inv_dt * self.impulse)
    }

    /// Pulley joints carry no reaction torque
    pub fn reaction_torque(&self, _inv_dt: f64) -> f64 {
        0.0
    }

    /// Returns the current length of the A-side rope
    pub fn current_length_a(&self, bodies: &Arena<Body, BodyHandle>) -> f64 {
        let body = bodies.get(self.body_a).unwrap();
        let p = body.world_point(self.local_anchor_a);
        (p - self.ground_anchor_a).length()
    }

    /// Returns the current length of the B-side rope
    pub fn current_length_b(&self, bodies: &Arena<Body, BodyHandle>) -> f64 {
        let body = bodies.get(self.body_b).unwrap();
        let p = body.world_point(self.local_anchor_b);
        (p - self.ground_anchor_b).length()
    }
}
