use crate::bodies::Body;
use crate::constraints::joint::{JointBodyData, LimitState};
use crate::core::config::{ANGULAR_SLOP, LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Mat33, Rot, Vec2, Vec3};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a prismatic joint: allows relative translation along one
/// axis, forbids relative rotation, with an optional limit and motor
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PrismaticJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// Translation axis in body A's frame
    pub local_axis_a: Vec2,

    /// `angle_b - angle_a` at rest
    pub reference_angle: f64,

    pub enable_limit: bool,
    pub lower_translation: f64,
    pub upper_translation: f64,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_force: f64,
}

impl PrismaticJointDef {
    /// Creates a prismatic joint definition sliding along `axis`
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, axis: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            local_axis_a: axis.normalize(),
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_force: 0.0,
        }
    }
}

/// A slider constraint with optional translation limit and motor
#[derive(Debug)]
pub struct PrismaticJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub reference_angle: f64,

    pub enable_limit: bool,
    pub lower_translation: f64,
    pub upper_translation: f64,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_force: f64,

    /// Accumulated (perpendicular, angular, axial-limit) impulses
    impulse: Vec3,
    motor_impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    axis: Vec2,
    perp: Vec2,
    s1: f64,
    s2: f64,
    a1: f64,
    a2: f64,
    k: Mat33,
    motor_mass: f64,
    limit_state: LimitState,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a: def.local_axis_a.normalize(),
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_force: def.max_motor_force,
            impulse: Vec3::zero(),
            motor_impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            axis: Vec2::zero(),
            perp: Vec2::zero(),
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat33::zero(),
            motor_mass: 0.0,
            limit_state: LimitState::Inactive,
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

        // Effective masses.
        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);
        let d = c_b - c_a + r_b - r_a;

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        // Motor and limit share the axial Jacobian.
        self.axis = q_a.rotate(self.local_axis_a);
        self.a1 = (d + r_a).cross(&self.axis);
        self.a2 = r_b.cross(&self.axis);

        self.motor_mass = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        // Prismatic constraint rows.
        self.perp = q_a.rotate(self.local_axis_a.perpendicular());
        self.s1 = (d + r_a).cross(&self.perp);
        self.s2 = r_b.cross(&self.perp);

        let k11 = m_a + m_b + i_a * self.s1 * self.s1 + i_b * self.s2 * self.s2;
        let k12 = i_a * self.s1 + i_b * self.s2;
        let k13 = i_a * self.s1 * self.a1 + i_b * self.s2 * self.a2;
        let mut k22 = i_a + i_b;
        if k22 == 0.0 {
            // Both bodies have fixed rotation; the angular row degenerates.
            k22 = 1.0;
        }
        let k23 = i_a * self.a1 + i_b * self.a2;
        let k33 = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;

        self.k.ex = Vec3::new(k11, k12, k13);
        self.k.ey = Vec3::new(k12, k22, k23);
        self.k.ez = Vec3::new(k13, k23, k33);

        // Limit state.
        if self.enable_limit {
            let joint_translation = self.axis.dot(&d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_translation <= self.lower_translation {
                if self.limit_state != LimitState::AtLower {
                    self.limit_state = LimitState::AtLower;
                    self.impulse.z = 0.0;
                }
            } else if joint_translation >= self.upper_translation {
                if self.limit_state != LimitState::AtUpper {
                    self.limit_state = LimitState::AtUpper;
                    self.impulse.z = 0.0;
                }
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
            self.impulse.z = 0.0;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let p = self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.z);
            let l_a = self.impulse.x * self.s1
                + self.impulse.y
                + (self.motor_impulse + self.impulse.z) * self.a1;
            let l_b = self.impulse.x * self.s2
                + self.impulse.y
                + (self.motor_impulse + self.impulse.z) * self.a2;

            velocities[self.a.index].v -= p * m_a;
            velocities[self.a.index].w -= i_a * l_a;
            velocities[self.b.index].v += p * m_b;
            velocities[self.b.index].w += i_b * l_b;
        } else {
            self.impulse = Vec3::zero();
            self.motor_impulse = 0.0;
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

        // Motor constraint.
        if self.enable_motor && self.limit_state != LimitState::Equal {
            let c_dot = self.axis.dot(&(v_b - v_a)) + self.a2 * w_b - self.a1 * w_a;
            let mut impulse = self.motor_mass * (self.motor_speed - c_dot);
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_force * step.dt;
            self.motor_impulse =
                crate::math::clamp(self.motor_impulse + impulse, -max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            let p = self.axis * impulse;
            let l_a = impulse * self.a1;
            let l_b = impulse * self.a2;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        }

        let c_dot1 = Vec2::new(
            self.perp.dot(&(v_b - v_a)) + self.s2 * w_b - self.s1 * w_a,
            w_b - w_a,
        );

        if self.enable_limit && self.limit_state != LimitState::Inactive {
            // Solve the prismatic and limit constraints as a block.
            let c_dot2 = self.axis.dot(&(v_b - v_a)) + self.a2 * w_b - self.a1 * w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let f1 = self.impulse;
            let mut df = self.k.solve33(-c_dot);
            self.impulse += df;

            match self.limit_state {
                LimitState::AtLower => {
                    self.impulse.z = self.impulse.z.max(0.0);
                }
                LimitState::AtUpper => {
                    self.impulse.z = self.impulse.z.min(0.0);
                }
                _ => {}
            }

            // f2(1:2) = invK(1:2,1:2) * (-Cdot(1:2) - K(1:2,3) * (f2(3) - f1(3))) + f1(1:2)
            let b = -c_dot1
                - Vec2::new(self.k.ez.x, self.k.ez.y) * (self.impulse.z - f1.z);
            let f2r = self.k.solve22(b) + Vec2::new(f1.x, f1.y);
            self.impulse.x = f2r.x;
            self.impulse.y = f2r.y;

            df = self.impulse - f1;

            let p = self.perp * df.x + self.axis * df.z;
            let l_a = df.x * self.s1 + df.y + df.z * self.a1;
            let l_b = df.x * self.s2 + df.y + df.z * self.a2;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        } else {
            // Limit inactive: solve only the prismatic rows.
            let df = self.k.solve22(-c_dot1);
            self.impulse.x += df.x;
            self.impulse.y += df.y;

            let p = self.perp * df.x;
            let l_a = df.x * self.s1 + df.y;
            let l_b = df.x * self.s2 + df.y;

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

        let m_a = self.a.inv_mass;
        let m_b = self.b.inv_mass;
        let i_a = self.a.inv_i;
        let i_b = self.b.inv_i;

        // Recompute the Jacobian at the current poses; the stored solver
        // values are stale after other constraints moved the bodies.
        let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);
        let d = c_b + r_b - c_a - r_a;

        let axis = q_a.rotate(self.local_axis_a);
        let a1 = (d + r_a).cross(&axis);
        let a2 = r_b.cross(&axis);
        let perp = q_a.rotate(self.local_axis_a.perpendicular());

        let s1 = (d + r_a).cross(&perp);
        let s2 = r_b.cross(&perp);

        let c1 = Vec2::new(perp.dot(&d), a_b - a_a - self.reference_angle);

        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(&d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                c2 = crate::math::clamp(translation, -MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = crate::math::clamp(
                    translation - self.lower_translation + LINEAR_SLOP,
                    -MAX_LINEAR_CORRECTION,
                    0.0,
                );
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = crate::math::clamp(
                    translation - self.upper_translation - LINEAR_SLOP,
                    0.0,
                    MAX_LINEAR_CORRECTION,
                );
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let impulse;
        if active {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let k13 = i_a * s1 * a1 + i_b * s2 * a2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k23 = i_a * a1 + i_b * a2;
            let k33 = m_a + m_b + i_a * a1 * a1 + i_b * a2 * a2;

            let k = Mat33 {
                ex: Vec3::new(k11, k12, k13),
                ey: Vec3::new(k12, k22, k23),
                ez: Vec3::new(k13, k23, k33),
            };

            impulse = k.solve33(-Vec3::new(c1.x, c1.y, c2));
        } else {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }

            let k = crate::math::Mat22::from_scalars(k11, k12, k12, k22);
            let impulse1 = k.solve(-c1);
            impulse = Vec3::new(impulse1.x, impulse1.y, 0.0);
        }

        let p = perp * impulse.x + axis * impulse.z;
        let l_a = impulse.x * s1 + impulse.y + impulse.z * a1;
        let l_b = impulse.x * s2 + impulse.y + impulse.z * a2;

        c_a -= p * m_a;
        a_a -= i_a * l_a;
        c_b += p * m_b;
        a_b += i_b * l_b;

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        (self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.z)) * inv_dt
    }

    /// Reaction torque on body B
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.impulse.y
    }

    /// Returns the motor force applied over the last step
    pub fn motor_force(&self, inv_dt: f64) -> f64 {
        inv_dt * self.motor_impulse
    }
}
