use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::config::LINEAR_SLOP;
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a wheel joint: body B slides along an axis fixed in body
/// A through a spring-damper, with free rotation and an optional rotational
/// motor. The standard vehicle suspension constraint.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WheelJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// Suspension axis in body A's frame
    pub local_axis_a: Vec2,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_torque: f64,

    /// Suspension frequency in hertz
    pub frequency_hz: f64,

    /// Suspension damping ratio
    pub damping_ratio: f64,
}

impl WheelJointDef {
    /// Creates a wheel joint definition suspended along `axis`
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, axis: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            local_axis_a: axis.normalize(),
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            frequency_hz: 2.0,
            damping_ratio: 0.7,
        }
    }
}

/// A suspension constraint: one translational degree of freedom with a
/// spring, one free rotation with an optional motor
#[derive(Debug)]
pub struct WheelJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_torque: f64,
    pub frequency_hz: f64,
    pub damping_ratio: f64,

    impulse: f64,
    motor_impulse: f64,
    spring_impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    ax: Vec2,
    ay: Vec2,
    s_ax: f64,
    s_bx: f64,
    s_ay: f64,
    s_by: f64,
    mass: f64,
    motor_mass: f64,
    spring_mass: f64,
    bias: f64,
    gamma: f64,
}

impl WheelJoint {
    pub(crate) fn new(def: &WheelJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a: def.local_axis_a.normalize(),
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            ax: Vec2::zero(),
            ay: Vec2::zero(),
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
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

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let c_a = positions[self.a.index].c;
        let a_a = positions[self.a.index].a;
        let c_b = positions[self.b.index].c;
        let a_b = positions[self.b.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);
        let d = c_b + r_b - c_a - r_a;

        // Point-to-line constraint perpendicular to the axis.
        {
            self.ay = q_a.rotate(self.local_axis_a.perpendicular());
            self.s_ay = (d + r_a).cross(&self.ay);
            self.s_by = r_b.cross(&self.ay);

            self.mass =
                m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;

            if self.mass > 0.0 {
                self.mass = 1.0 / self.mass;
            }
        }

        // Suspension spring along the axis.
        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;

        if self.frequency_hz > 0.0 {
            self.ax = q_a.rotate(self.local_axis_a);
            self.s_ax = (d + r_a).cross(&self.ax);
            self.s_bx = r_b.cross(&self.ax);

            let inv_mass =
                m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;

            if inv_mass > 0.0 {
                self.spring_mass = 1.0 / inv_mass;

                let c = d.dot(&self.ax);

                let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;
                let damp = 2.0 * self.spring_mass * self.damping_ratio * omega;
                let k = self.spring_mass * omega * omega;

                let dt = step.dt;
                self.gamma = dt * (damp + dt * k);
                if self.gamma > 0.0 {
                    self.gamma = 1.0 / self.gamma;
                }

                self.bias = c * dt * k * self.gamma;

                self.spring_mass = inv_mass + self.gamma;
                if self.spring_mass > 0.0 {
                    self.spring_mass = 1.0 / self.spring_mass;
                }
            }
        } else {
            self.spring_impulse = 0.0;
        }

        // Rotational motor.
        if self.enable_motor {
            self.motor_mass = i_a + i_b;
            if self.motor_mass > 0.0 {
                self.motor_mass = 1.0 / self.motor_mass;
            }
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            self.spring_impulse *= step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let p = self.ay * self.impulse + self.ax * self.spring_impulse;
            let l_a = self.impulse * self.s_ay + self.spring_impulse * self.s_ax
                + self.motor_impulse;
            let l_b = self.impulse * self.s_by + self.spring_impulse * self.s_bx
                + self.motor_impulse;

            velocities[self.a.index].v -= p * m_a;
            velocities[self.a.index].w -= i_a * l_a;
            velocities[self.b.index].v += p * m_b;
            velocities[self.b.index].w += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
            self.motor_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(
        &mut self,
        step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let mut v_a = velocities[self.a.index].v;
        let mut w_a = velocities[self.a.index].w;
        let mut v_b = velocities[self.b.index].v;
        let mut w_b = velocities[self.b.index].w;

        // Solve spring constraint.
        {
            let c_dot = self.ax.dot(&(v_b - v_a)) + self.s_bx * w_b - self.s_ax * w_a;
            let impulse = -self.spring_mass
                * (c_dot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = self.ax * impulse;
            let l_a = impulse * self.s_ax;
            let l_b = impulse * self.s_bx;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        }

        // Solve rotational motor constraint.
        {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;

            let old_impulse = self.motor_impulse;
            let max_impulse = step.dt * self.max_motor_torque;
            self.motor_impulse =
                crate::math::clamp(self.motor_impulse + impulse, -max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Solve point-to-line constraint.
        {
            let c_dot = self.ay.dot(&(v_b - v_a)) + self.s_by * w_b - self.s_ay * w_a;
            let impulse = -self.mass * c_dot;
            self.impulse += impulse;

            let p = self.ay * impulse;
            let l_a = impulse * self.s_ay;
            let l_b = impulse * self.s_by;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        }

        velocities[self.a.index].v = v_a;
        velocities[self.a.index].w = w_a;
        velocities[self.b.index].v = v_b;
        velocities[self.b.index].w = w_b;
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
        let d = c_b - c_a + r_b - r_a;

        let ay = q_a.rotate(self.local_axis_a.perpendicular());

        let s_ay = (d + r_a).cross(&ay);
        let s_by = r_b.cross(&ay);

        let c = d.dot(&ay);

        let k = self.a.inv_mass
            + self.b.inv_mass
            + self.a.inv_i * self.s_ay * self.s_ay
            + self.b.inv_i * self.s_by * self.s_by;

        let impulse = if k != 0.0 { -c / k } else { 0.0 };

        let p = ay * impulse;
        let l_a = impulse * s_ay;
        let l_b = impulse * s_by;

        c_a -= p * self.a.inv_mass;
        a_a -= self.a.inv_i * l_a;
        c_b += p * self.b.inv_mass;
        a_b += self.b.inv_i * l_b;

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;

        c.abs() <= LINEAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        (self.ay * self.impulse + self.ax * self.spring_impulse) * inv_dt
    }

    /// Reaction torque on body B
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.motor_impulse
    }
}
