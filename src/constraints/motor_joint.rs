use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Mat22, Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a motor joint: drives body B toward a target offset and
/// angle relative to body A, limited by maximum force and torque. Useful
/// for animated platforms and kinematic-style control of dynamic bodies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MotorJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    /// Target position of body B's origin in body A's frame
    pub linear_offset: Vec2,

    /// Target angle of body B relative to body A
    pub angular_offset: f64,

    /// Maximum friction force in newtons
    pub max_force: f64,

    /// Maximum friction torque in newton-meters
    pub max_torque: f64,

    /// Position correction factor in [0, 1]
    pub correction_factor: f64,
}

impl MotorJointDef {
    /// Creates a motor joint definition holding the bodies' current
    /// relative pose
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            linear_offset: Vec2::zero(),
            angular_offset: 0.0,
            max_force: 1.0,
            max_torque: 1.0,
            correction_factor: 0.3,
        }
    }
}

/// A velocity-level drive toward a relative pose
#[derive(Debug)]
pub struct MotorJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub linear_offset: Vec2,
    pub angular_offset: f64,
    pub max_force: f64,
    pub max_torque: f64,
    pub correction_factor: f64,

    linear_impulse: Vec2,
    angular_impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    linear_error: Vec2,
    angular_error: f64,
    linear_mass: Mat22,
    angular_mass: f64,
}

impl MotorJoint {
    pub(crate) fn new(def: &MotorJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            linear_offset: def.linear_offset,
            angular_offset: def.angular_offset,
            max_force: def.max_force,
            max_torque: def.max_torque,
            correction_factor: def.correction_factor,
            linear_impulse: Vec2::zero(),
            angular_impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            linear_error: Vec2::zero(),
            angular_error: 0.0,
            linear_mass: Mat22::zero(),
            angular_mass: 0.0,
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

        // Anchors at the centers of mass.
        self.r_a = q_a.rotate(self.linear_offset - self.a.local_center);
        self.r_b = q_b.rotate(-self.b.local_center);

        self.linear_error = c_b + self.r_b - c_a - self.r_a;
        self.angular_error = a_b - a_a - self.angular_offset;

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let k = Mat22::from_scalars(
            m_a + m_b + i_a * self.r_a.y * self.r_a.y + i_b * self.r_b.y * self.r_b.y,
            -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
            -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
            m_a + m_b + i_a * self.r_a.x * self.r_a.x + i_b * self.r_b.x * self.r_b.x,
        );

        self.linear_mass = k.inverse();

        self.angular_mass = i_a + i_b;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        if step.warm_starting {
            self.linear_impulse *= step.dt_ratio;
            self.angular_impulse *= step.dt_ratio;

            let p = self.linear_impulse;
            velocities[self.a.index].v -= p * m_a;
            velocities[self.a.index].w -= i_a * (self.r_a.cross(&p) + self.angular_impulse);
            velocities[self.b.index].v += p * m_b;
            velocities[self.b.index].w += i_b * (self.r_b.cross(&p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::zero();
            self.angular_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(
        &mut self,
        step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        let mut v_a = velocities[self.a.index].v;
        let mut w_a = velocities[self.a.index].w;
        let mut v_b = velocities[self.b.index].v;
        let mut w_b = velocities[self.b.index].w;

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let inv_h = step.inv_dt;

        // Angular drive.
        {
            let c_dot = w_b - w_a + inv_h * self.correction_factor * self.angular_error;
            let mut impulse = -self.angular_mass * c_dot;

            let old_impulse = self.angular_impulse;
            let max_impulse = step.dt * self.max_torque;
            self.angular_impulse =
                crate::math::clamp(self.angular_impulse + impulse, -max_impulse, max_impulse);
            impulse = self.angular_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Linear drive.
        {
            let c_dot = v_b + Vec2::scalar_cross(w_b, self.r_b)
                - v_a
                - Vec2::scalar_cross(w_a, self.r_a)
                + self.linear_error * (inv_h * self.correction_factor);

            let mut impulse = -self.linear_mass.mul_vec(c_dot);
            let old_impulse = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = step.dt * self.max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalize() * max_impulse;
            }

            impulse = self.linear_impulse - old_impulse;

            v_a -= impulse * m_a;
            w_a -= i_a * self.r_a.cross(&impulse);
            v_b += impulse * m_b;
            w_b += i_b * self.r_b.cross(&impulse);
        }

        velocities[self.a.index].v = v_a;
        velocities[self.a.index].w = w_a;
        velocities[self.b.index].v = v_b;
        velocities[self.b.index].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, _positions: &mut [Position]) -> bool {
        // Position error decays through the velocity-level correction term.
        true
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.linear_impulse * inv_dt
    }

    /// Reaction torque on body B
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.angular_impulse
    }
}
