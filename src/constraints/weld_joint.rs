use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::config::{ANGULAR_SLOP, LINEAR_SLOP};
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Mat33, Rot, Vec2, Vec3};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a weld joint: locks relative translation and rotation,
/// optionally softened into a torsional spring
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WeldJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// `angle_b - angle_a` at rest
    pub reference_angle: f64,

    /// Rotational spring frequency in hertz; 0 makes the weld rigid
    pub frequency_hz: f64,

    /// Rotational spring damping ratio
    pub damping_ratio: f64,
}

impl WeldJointDef {
    /// Creates a rigid weld joint definition
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            reference_angle: 0.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }
}

/// A constraint that welds two bodies together
#[derive(Debug)]
pub struct WeldJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: f64,
    pub frequency_hz: f64,
    pub damping_ratio: f64,

    /// Accumulated (x, y, angular) impulses
    impulse: Vec3,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
    gamma: f64,
    bias: f64,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec3::zero(),
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: Mat33::zero(),
            gamma: 0.0,
            bias: 0.0,
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

        let a_a = positions[self.a.index].a;
        let a_b = positions[self.b.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        self.r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        self.r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let mut k = Mat33::zero();
        k.ex.x = m_a + m_b + self.r_a.y * self.r_a.y * i_a + self.r_b.y * self.r_b.y * i_b;
        k.ey.x = -self.r_a.y * self.r_a.x * i_a - self.r_b.y * self.r_b.x * i_b;
        k.ez.x = -self.r_a.y * i_a - self.r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + self.r_a.x * self.r_a.x * i_a + self.r_b.x * self.r_b.x * i_b;
        k.ez.y = self.r_a.x * i_a + self.r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        if self.frequency_hz > 0.0 {
            k.get_inverse22(&mut self.mass);

            let mut inv_i = i_a + i_b;
            let m = if inv_i > 0.0 { 1.0 / inv_i } else { 0.0 };

            let c = a_b - a_a - self.reference_angle;

            let omega = 2.0 * std::f64::consts::PI * self.frequency_hz;
            let d = 2.0 * m * self.damping_ratio * omega;
            let spring_k = m * omega * omega;

            let dt = step.dt;
            self.gamma = dt * (d + dt * spring_k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * dt * spring_k * self.gamma;

            inv_i += self.gamma;
            self.mass.ez.z = if inv_i != 0.0 { 1.0 / inv_i } else { 0.0 };
        } else if k.ez.z == 0.0 {
            k.get_inverse22(&mut self.mass);
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            k.get_sym_inverse33(&mut self.mass);
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);

            velocities[self.a.index].v -= p * m_a;
            velocities[self.a.index].w -= i_a * (self.r_a.cross(&p) + self.impulse.z);
            velocities[self.b.index].v += p * m_b;
            velocities[self.b.index].w += i_b * (self.r_b.cross(&p) + self.impulse.z);
        } else {
            self.impulse = Vec3::zero();
        }
    }

    pub(crate) fn solve_velocity_constraints(
        &mut self,
        _step: &TimeStep,
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

        if self.frequency_hz > 0.0 {
            // Soft angular row solved separately from the point rows.
            let c_dot2 = w_b - w_a;

            let impulse2 =
                -self.mass.ez.z * (c_dot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;

            w_a -= i_a * impulse2;
            w_b += i_b * impulse2;

            let c_dot1 = v_b + Vec2::scalar_cross(w_b, self.r_b)
                - v_a
                - Vec2::scalar_cross(w_a, self.r_a);

            let impulse1 = -self.mass.mul_vec22(c_dot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            let p = impulse1;

            v_a -= p * m_a;
            w_a -= i_a * self.r_a.cross(&p);
            v_b += p * m_b;
            w_b += i_b * self.r_b.cross(&p);
        } else {
            let c_dot1 = v_b + Vec2::scalar_cross(w_b, self.r_b)
                - v_a
                - Vec2::scalar_cross(w_a, self.r_a);
            let c_dot2 = w_b - w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let impulse = -self.mass.mul_vec(c_dot);
            self.impulse += impulse;

            let p = Vec2::new(impulse.x, impulse.y);

            v_a -= p * m_a;
            w_a -= i_a * (self.r_a.cross(&p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.r_b.cross(&p) + impulse.z);
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

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);

        let position_error;
        let angular_error;

        let mut k = Mat33::zero();
        k.ex.x = m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b;
        k.ey.x = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        k.ez.x = -r_a.y * i_a - r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b;
        k.ez.y = r_a.x * i_a + r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        if self.frequency_hz > 0.0 {
            let c1 = c_b + r_b - c_a - r_a;

            position_error = c1.length();
            angular_error = 0.0;

            let p = -k.solve22(c1);

            c_a -= p * m_a;
            a_a -= i_a * r_a.cross(&p);
            c_b += p * m_b;
            a_b += i_b * r_b.cross(&p);
        } else {
            let c1 = c_b + r_b - c_a - r_a;
            let c2 = a_b - a_a - self.reference_angle;

            position_error = c1.length();
            angular_error = c2.abs();

            let c = Vec3::new(c1.x, c1.y, c2);

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(c)
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);

            c_a -= p * m_a;
            a_a -= i_a * (r_a.cross(&p) + impulse.z);
            c_b += p * m_b;
            a_b += i_b * (r_b.cross(&p) + impulse.z);
        }

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    /// Reaction torque on body B
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.impulse.z
    }
}
