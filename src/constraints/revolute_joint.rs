use crate::bodies::Body;
use crate::constraints::joint::{JointBodyData, LimitState};
use crate::core::config::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::{Mat22, Mat33, Rot, Vec2, Vec3};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Definition for a revolute joint: pins two bodies at a shared anchor,
/// leaving one rotational degree of freedom with an optional limit and
/// motor
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RevoluteJointDef {
    pub body_a: crate::core::BodyHandle,
    pub body_b: crate::core::BodyHandle,
    pub collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,

    /// `angle_b - angle_a` at rest
    pub reference_angle: f64,

    pub enable_limit: bool,
    pub lower_angle: f64,
    pub upper_angle: f64,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_torque: f64,
}

impl RevoluteJointDef {
    /// Creates a revolute joint definition pinned at a world point
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
        }
    }
}

/// A hinge constraint with optional angular limit and motor
#[derive(Debug)]
pub struct RevoluteJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: f64,

    pub enable_limit: bool,
    pub lower_angle: f64,
    pub upper_angle: f64,

    pub enable_motor: bool,
    pub motor_speed: f64,
    pub max_motor_torque: f64,

    /// Accumulated point impulse (x, y) plus limit impulse (z)
    impulse: Vec3,
    motor_impulse: f64,

    // Solver temp
    a: JointBodyData,
    b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
    motor_mass: f64,
    limit_state: LimitState,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            impulse: Vec3::zero(),
            motor_impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: Mat33::zero(),
            motor_mass: 0.0,
            limit_state: LimitState::Inactive,
        }
    }

    /// Returns the joint angle, `angle_b - angle_a - reference`
    pub fn joint_angle(&self, bodies: &Arena<Body, BodyHandle>) -> f64 {
        let body_a = bodies.get(self.body_a).unwrap();
        let body_b = bodies.get(self.body_b).unwrap();
        body_b.sweep.a - body_a.sweep.a - self.reference_angle
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

        let fixed_rotation = i_a + i_b == 0.0;

        // J = [-I -r1_skew I r2_skew ]
        //     [ 0       -1 0       1 ]
        self.mass.ex.x = m_a + m_b + self.r_a.y * self.r_a.y * i_a + self.r_b.y * self.r_b.y * i_b;
        self.mass.ey.x = -self.r_a.y * self.r_a.x * i_a - self.r_b.y * self.r_b.x * i_b;
        self.mass.ez.x = -self.r_a.y * i_a - self.r_b.y * i_b;
        self.mass.ex.y = self.mass.ey.x;
        self.mass.ey.y = m_a + m_b + self.r_a.x * self.r_a.x * i_a + self.r_b.x * self.r_b.x * i_b;
        self.mass.ez.y = self.r_a.x * i_a + self.r_b.x * i_b;
        self.mass.ex.z = self.mass.ez.x;
        self.mass.ey.z = self.mass.ez.y;
        self.mass.ez.z = i_a + i_b;

        self.motor_mass = i_a + i_b;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if self.enable_limit && !fixed_rotation {
            let joint_angle = a_b - a_a - self.reference_angle;
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_angle <= self.lower_angle {
                if self.limit_state != LimitState::AtLower {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtLower;
            } else if joint_angle >= self.upper_angle {
                if self.limit_state != LimitState::AtUpper {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtUpper;
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);

            velocities[self.a.index].v -= p * m_a;
            velocities[self.a.index].w -=
                i_a * (self.r_a.cross(&p) + self.motor_impulse + self.impulse.z);
            velocities[self.b.index].v += p * m_b;
            velocities[self.b.index].w +=
                i_b * (self.r_b.cross(&p) + self.motor_impulse + self.impulse.z);
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

        let fixed_rotation = i_a + i_b == 0.0;

        // Motor constraint.
        if self.enable_motor && self.limit_state != LimitState::Equal && !fixed_rotation {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * step.dt;
            self.motor_impulse =
                crate::math::clamp(self.motor_impulse + impulse, -max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Limit constraint.
        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let c_dot1 = v_b + Vec2::scalar_cross(w_b, self.r_b)
                - v_a
                - Vec2::scalar_cross(w_a, self.r_a);
            let c_dot2 = w_b - w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let mut impulse = -self.mass.solve33(c_dot);

            match self.limit_state {
                LimitState::Equal => {}
                LimitState::AtLower => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse < 0.0 {
                        // Back out the limit row and re-solve the point rows.
                        let rhs = -c_dot1
                            + Vec2::new(self.mass.ez.x, self.mass.ez.y) * self.impulse.z;
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::AtUpper => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse > 0.0 {
                        let rhs = -c_dot1
                            + Vec2::new(self.mass.ez.x, self.mass.ez.y) * self.impulse.z;
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::Inactive => unreachable!(),
            }

            let p = Vec2::new(impulse.x, impulse.y);

            v_a -= p * m_a;
            w_a -= i_a * (self.r_a.cross(&p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.r_b.cross(&p) + impulse.z);
        } else {
            // Point constraint only.
            let c_dot = v_b + Vec2::scalar_cross(w_b, self.r_b)
                - v_a
                - Vec2::scalar_cross(w_a, self.r_a);
            let impulse = self.mass.solve22(-c_dot);

            self.impulse.x += impulse.x;
            self.impulse.y += impulse.y;

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

    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        let mut c_a = positions[self.a.index].c;
        let mut a_a = positions[self.a.index].a;
        let mut c_b = positions[self.b.index].c;
        let mut a_b = positions[self.b.index].a;

        let mut angular_error = 0.0;
        let position_error;

        let fixed_rotation = self.a.inv_i + self.b.inv_i == 0.0;

        // Solve angular limit constraint.
        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let angle = a_b - a_a - self.reference_angle;
            let mut limit_impulse = 0.0;

            match self.limit_state {
                LimitState::Equal => {
                    // Prevent large angular corrections.
                    let c = crate::math::clamp(
                        angle - self.lower_angle,
                        -MAX_ANGULAR_CORRECTION,
                        MAX_ANGULAR_CORRECTION,
                    );
                    limit_impulse = -self.motor_mass * c;
                    angular_error = c.abs();
                }
                LimitState::AtLower => {
                    let mut c = angle - self.lower_angle;
                    angular_error = -c;

                    // Prevent large angular corrections and allow some slop.
                    c = crate::math::clamp(c + ANGULAR_SLOP, -MAX_ANGULAR_CORRECTION, 0.0);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::AtUpper => {
                    let mut c = angle - self.upper_angle;
                    angular_error = c;

                    c = crate::math::clamp(c - ANGULAR_SLOP, 0.0, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::Inactive => unreachable!(),
            }

            a_a -= self.a.inv_i * limit_impulse;
            a_b += self.b.inv_i * limit_impulse;
        }

        // Solve point-to-point constraint.
        {
            let q_a = Rot::new(a_a);
            let q_b = Rot::new(a_b);
            let r_a = q_a.rotate(self.local_anchor_a - self.a.local_center);
            let r_b = q_b.rotate(self.local_anchor_b - self.b.local_center);

            let c = c_b + r_b - c_a - r_a;
            position_error = c.length();

            let m_a = self.a.inv_mass;
            let m_b = self.b.inv_mass;
            let i_a = self.a.inv_i;
            let i_b = self.b.inv_i;

            let k = Mat22::from_scalars(
                m_a + m_b + i_a * r_a.y * r_a.y + i_b * r_b.y * r_b.y,
                -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
                -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
                m_a + m_b + i_a * r_a.x * r_a.x + i_b * r_b.x * r_b.x,
            );

            let impulse = -k.solve(c);

            c_a -= impulse * m_a;
            a_a -= i_a * r_a.cross(&impulse);
            c_b += impulse * m_b;
            a_b += i_b * r_b.cross(&impulse);
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

    /// Reaction torque on body B, excluding the motor torque
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.impulse.z
    }

    /// Returns the motor torque applied over the last step
    pub fn motor_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.motor_impulse
    }
}
