use crate::bodies::Body;
use crate::constraints::joint::{JointBodyData, LimitState};
use crate::core::config::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a rope joint: enforces a maximum distance between two
/// anchors, going slack below it
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RopeJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// Maximum separation between the anchors
    pub max_length: f64,
}

impl RopeJointDef {
    /// Creates a rope joint definition
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            max_length: 0.0,
        }
    }
}

/// An inextensible rope: a one-sided distance limit between two anchors
#[derive(Debug)]
pub struct RopeJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub max_length: f64,

    impulse: f64,
    length: f64,
    state: LimitState,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f64,
}

impl RopeJoint {
    pub(crate) fn new(def: &RopeJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            impulse: 0.0,
            length: 0.0,
            state: LimitState::Inactive,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            u: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: 0.0,
        }
    }

    /// Returns whether the rope is currently taut
    pub fn limit_state(&self) -> LimitState {
        self.state
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

        self.length = self.u.length();

        let c = self.length - self.max_length;
        self.state = if c > 0.0 {
            LimitState::AtUpper
        } else {
            LimitState::Inactive
        };

        if self.length > LINEAR_SLOP {
            self.u /= self.length;
        } else {
            self.u = Vec2::zero();
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = self.r_a.cross(&self.u);
        let cr_b = self.r_b.cross(&self.u);
        let inv_mass = self.a.inv_mass
            + self.a.inv_i * cr_a * cr_a
            + self.b.inv_mass
            + self.b.inv_i * cr_b * cr_b;

        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

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
        step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        let v_a = velocities[self.a.index].v;
        let w_a = velocities[self.a.index].w;
        let v_b = velocities[self.b.index].v;
        let w_b = velocities[self.b.index].w;

        // Cdot = dot(u, v + cross(w, r))
        let vp_a = v_a + Vec2::scalar_cross(w_a, self.r_a);
        let vp_b = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let c = self.length - self.max_length;
        let mut c_dot = self.u.dot(&(vp_b - vp_a));

        // Predictive constraint to catch the rope before it overshoots.
        if c < 0.0 {
            c_dot += step.inv_dt * c;
        }

        let mut impulse = -self.mass * c_dot;
        let old_impulse = self.impulse;
        // Rope impulses only pull inward.
        self.impulse = (self.impulse + impulse).min(0.0);
        impulse = self.impulse - old_impulse;

        let p = self.u * impulse;
        velocities[self.a.index].v = v_a - p * self.a.inv_mass;
        velocities[self.a.index].w = w_a - self.a.inv_i * self.r_a.cross(&p);
        velocities[self.b.index].v = v_b + p * self.b.inv_mass;
        velocities[self.b.index].w = w_b + self.b.inv_i * self.r_b.cross(&p);
    }

    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
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
        let mut c = length - self.max_length;

        c = crate::math::clamp(c, 0.0, MAX_LINEAR_CORRECTION);

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

        length - self.max_length < LINEAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.u * (inv_dt * self.impulse)
    }

    /// Rope joints carry no reaction torque
    pub fn reaction_torque(&self, _inv_dt: f64) -> f64 {
        0.0
    }
}
