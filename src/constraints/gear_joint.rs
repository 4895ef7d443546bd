use crate::bodies::Body;
use crate::constraints::joint::JointBodyData;
use crate::core::config::LINEAR_SLOP;
use crate::core::{Arena, BodyHandle, JointHandle, Position, TimeStep, Velocity};
use crate::math::{Rot, Vec2};

/// The kind of joint a gear couples; only revolute and prismatic
/// coordinates can be geared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearBase {
    Revolute,
    Prismatic,
}

/// Frame data copied out of a referenced joint when the gear is created, so
/// the gear can evaluate that joint's coordinate without reaching back into
/// the joint arena during solving
#[derive(Debug, Clone, Copy)]
pub struct GearHalf {
    /// Which joint kind this half couples
    pub base: GearBase,

    /// The ground body of the referenced joint
    pub ground: BodyHandle,

    /// The moving body of the referenced joint; becomes the gear's own
    /// body A or B
    pub body: BodyHandle,

    /// Referenced joint's anchor on the ground body
    pub local_anchor_ground: Vec2,

    /// Referenced joint's anchor on the moving body
    pub local_anchor_body: Vec2,

    /// Translation axis for a prismatic half, in the ground frame
    pub local_axis: Vec2,

    /// Reference angle of the referenced joint
    pub reference_angle: f64,
}

/// Definition for a gear joint coupling the coordinates of two existing
/// revolute or prismatic joints: `coordinate_a + ratio * coordinate_b`
/// stays constant
#[derive(Debug, Clone)]
pub struct GearJointDef {
    /// First referenced joint; its moving body becomes body A
    pub joint_a: JointHandle,

    /// Second referenced joint; its moving body becomes body B
    pub joint_b: JointHandle,

    /// Gear ratio applied to the B coordinate
    pub ratio: f64,

    pub collide_connected: bool,
}

impl GearJointDef {
    /// Creates a gear definition with unit ratio
    pub fn new(joint_a: JointHandle, joint_b: JointHandle) -> Self {
        Self {
            joint_a,
            joint_b,
            ratio: 1.0,
            collide_connected: false,
        }
    }
}

/// A gear constraint over two other joints' coordinates.
///
/// The coupled joints must already exist and connect each moving body to a
/// ground body; destroying either referenced joint invalidates the gear and
/// the world destroys it in cascade.
#[derive(Debug)]
pub struct GearJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,

    /// Referenced joints, kept for cascade destruction
    pub joint_a: JointHandle,
    pub joint_b: JointHandle,

    half_a: GearHalf,
    half_b: GearHalf,

    pub ratio: f64,

    /// `coordinate_a + ratio * coordinate_b` at creation
    constant: f64,

    impulse: f64,

    // Solver temp: the four involved bodies (moving A/B, grounds C/D)
    a: JointBodyData,
    b: JointBodyData,
    c: JointBodyData,
    d: JointBodyData,
    j_v_ac: Vec2,
    j_v_bd: Vec2,
    j_w_a: f64,
    j_w_b: f64,
    j_w_c: f64,
    j_w_d: f64,
    mass: f64,
}

impl GearJoint {
    /// Creates a gear joint; `half_a`/`half_b` are captured from the
    /// referenced joints by the world, `constant` from the current poses
    pub(crate) fn new(
        def: &GearJointDef,
        half_a: GearHalf,
        half_b: GearHalf,
        constant: f64,
    ) -> Self {
        Self {
            body_a: half_a.body,
            body_b: half_b.body,
            collide_connected: def.collide_connected,
            joint_a: def.joint_a,
            joint_b: def.joint_b,
            half_a,
            half_b,
            ratio: def.ratio,
            constant,
            impulse: 0.0,
            a: JointBodyData::default(),
            b: JointBodyData::default(),
            c: JointBodyData::default(),
            d: JointBodyData::default(),
            j_v_ac: Vec2::zero(),
            j_v_bd: Vec2::zero(),
            j_w_a: 0.0,
            j_w_b: 0.0,
            j_w_c: 0.0,
            j_w_d: 0.0,
            mass: 0.0,
        }
    }

    /// Evaluates the scalar coordinate of one half at the given poses
    pub(crate) fn coordinate(
        half: &GearHalf,
        body_pose: (Vec2, f64, Vec2),
        ground_pose: (Vec2, f64, Vec2),
    ) -> f64 {
        let (c_body, a_body, lc_body) = body_pose;
        let (c_ground, a_ground, lc_ground) = ground_pose;
        match half.base {
            GearBase::Revolute => a_body - a_ground - half.reference_angle,
            GearBase::Prismatic => {
                let q_body = Rot::new(a_body);
                let q_ground = Rot::new(a_ground);
                let p_body =
                    c_body + q_body.rotate(half.local_anchor_body - lc_body);
                let p_ground =
                    c_ground + q_ground.rotate(half.local_anchor_ground - lc_ground);
                let axis = q_ground.rotate(half.local_axis);
                (p_body - p_ground).dot(&axis)
            }
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
        self.c = JointBodyData::capture(bodies.get(self.half_a.ground).unwrap());
        self.d = JointBodyData::capture(bodies.get(self.half_b.ground).unwrap());

        let a_a = positions[self.a.index].a;
        let a_b = positions[self.b.index].a;
        let a_c = positions[self.c.index].a;
        let a_d = positions[self.d.index].a;

        let c_a = positions[self.a.index].c;
        let c_b = positions[self.b.index].c;
        let c_c = positions[self.c.index].c;
        let c_d = positions[self.d.index].c;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let q_c = Rot::new(a_c);
        let q_d = Rot::new(a_d);

        let mut mass = 0.0;

        match self.half_a.base {
            GearBase::Revolute => {
                self.j_v_ac = Vec2::zero();
                self.j_w_a = 1.0;
                self.j_w_c = 1.0;
                mass += self.a.inv_i + self.c.inv_i;
            }
            GearBase::Prismatic => {
                let u = q_c.rotate(self.half_a.local_axis);
                let r_c = q_c.rotate(self.half_a.local_anchor_ground - self.c.local_center);
                let r_a = q_a.rotate(self.half_a.local_anchor_body - self.a.local_center);
                self.j_v_ac = u;
                self.j_w_c = (r_c + c_a - c_c).cross(&u);
                self.j_w_a = r_a.cross(&u);
                mass += self.c.inv_mass
                    + self.a.inv_mass
                    + self.c.inv_i * self.j_w_c * self.j_w_c
                    + self.a.inv_i * self.j_w_a * self.j_w_a;
            }
        }

        match self.half_b.base {
            GearBase::Revolute => {
                self.j_v_bd = Vec2::zero();
                self.j_w_b = self.ratio;
                self.j_w_d = self.ratio;
                mass += self.ratio * self.ratio * (self.b.inv_i + self.d.inv_i);
            }
            GearBase::Prismatic => {
                let u = q_d.rotate(self.half_b.local_axis);
                let r_d = q_d.rotate(self.half_b.local_anchor_ground - self.d.local_center);
                let r_b = q_b.rotate(self.half_b.local_anchor_body - self.b.local_center);
                self.j_v_bd = u * self.ratio;
                self.j_w_d = self.ratio * (r_d + c_b - c_d).cross(&u);
                self.j_w_b = self.ratio * r_b.cross(&u);
                mass += self.ratio
                    * self.ratio
                    * (self.d.inv_mass + self.b.inv_mass)
                    + self.d.inv_i * self.j_w_d * self.j_w_d
                    + self.b.inv_i * self.j_w_b * self.j_w_b;
            }
        }

        self.mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };

        if step.warm_starting {
            velocities[self.a.index].v += self.j_v_ac * (self.a.inv_mass * self.impulse);
            velocities[self.a.index].w += self.a.inv_i * self.impulse * self.j_w_a;
            velocities[self.b.index].v += self.j_v_bd * (self.b.inv_mass * self.impulse);
            velocities[self.b.index].w += self.b.inv_i * self.impulse * self.j_w_b;
            velocities[self.c.index].v -= self.j_v_ac * (self.c.inv_mass * self.impulse);
            velocities[self.c.index].w -= self.c.inv_i * self.impulse * self.j_w_c;
            velocities[self.d.index].v -= self.j_v_bd * (self.d.inv_mass * self.impulse);
            velocities[self.d.index].w -= self.d.inv_i * self.impulse * self.j_w_d;
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
        let v_c = velocities[self.c.index].v;
        let w_c = velocities[self.c.index].w;
        let v_d = velocities[self.d.index].v;
        let w_d = velocities[self.d.index].w;

        let mut c_dot = self.j_v_ac.dot(&(v_a - v_c)) + self.j_v_bd.dot(&(v_b - v_d));
        c_dot += self.j_w_a * w_a - self.j_w_c * w_c + self.j_w_b * w_b - self.j_w_d * w_d;

        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        velocities[self.a.index].v = v_a + self.j_v_ac * (self.a.inv_mass * impulse);
        velocities[self.a.index].w = w_a + self.a.inv_i * impulse * self.j_w_a;
        velocities[self.b.index].v = v_b + self.j_v_bd * (self.b.inv_mass * impulse);
        velocities[self.b.index].w = w_b + self.b.inv_i * impulse * self.j_w_b;
        velocities[self.c.index].v = v_c - self.j_v_ac * (self.c.inv_mass * impulse);
        velocities[self.c.index].w = w_c - self.c.inv_i * impulse * self.j_w_c;
        velocities[self.d.index].v = v_d - self.j_v_bd * (self.d.inv_mass * impulse);
        velocities[self.d.index].w = w_d - self.d.inv_i * impulse * self.j_w_d;
    }

    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        let mut c_a = positions[self.a.index].c;
        let mut a_a = positions[self.a.index].a;
        let mut c_b = positions[self.b.index].c;
        let mut a_b = positions[self.b.index].a;
        let mut c_c = positions[self.c.index].c;
        let mut a_c = positions[self.c.index].a;
        let mut c_d = positions[self.d.index].c;
        let mut a_d = positions[self.d.index].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let q_c = Rot::new(a_c);
        let q_d = Rot::new(a_d);

        let mut mass = 0.0;

        let (j_v_ac, j_w_a, j_w_c, coordinate_a);
        match self.half_a.base {
            GearBase::Revolute => {
                j_v_ac = Vec2::zero();
                j_w_a = 1.0;
                j_w_c = 1.0;
                mass += self.a.inv_i + self.c.inv_i;
                coordinate_a = a_a - a_c - self.half_a.reference_angle;
            }
            GearBase::Prismatic => {
                let u = q_c.rotate(self.half_a.local_axis);
                let r_c = q_c.rotate(self.half_a.local_anchor_ground - self.c.local_center);
                let r_a = q_a.rotate(self.half_a.local_anchor_body - self.a.local_center);
                j_v_ac = u;
                j_w_c = (r_c + c_a - c_c).cross(&u);
                j_w_a = r_a.cross(&u);
                mass += self.c.inv_mass
                    + self.a.inv_mass
                    + self.c.inv_i * j_w_c * j_w_c
                    + self.a.inv_i * j_w_a * j_w_a;

                let p_c = self.half_a.local_anchor_ground - self.c.local_center;
                let p_a = q_c.inv_rotate(r_a + (c_a - c_c));
                coordinate_a = (p_a - p_c).dot(&self.half_a.local_axis);
            }
        }

        let (j_v_bd, j_w_b, j_w_d, coordinate_b);
        match self.half_b.base {
            GearBase::Revolute => {
                j_v_bd = Vec2::zero();
                j_w_b = self.ratio;
                j_w_d = self.ratio;
                mass += self.ratio * self.ratio * (self.b.inv_i + self.d.inv_i);
                coordinate_b = a_b - a_d - self.half_b.reference_angle;
            }
            GearBase::Prismatic => {
                let u = q_d.rotate(self.half_b.local_axis);
                let r_d = q_d.rotate(self.half_b.local_anchor_ground - self.d.local_center);
                let r_b = q_b.rotate(self.half_b.local_anchor_body - self.b.local_center);
                j_v_bd = u * self.ratio;
                j_w_d = self.ratio * (r_d + c_b - c_d).cross(&u);
                j_w_b = self.ratio * r_b.cross(&u);
                mass += self.ratio
                    * self.ratio
                    * (self.d.inv_mass + self.b.inv_mass)
                    + self.d.inv_i * j_w_d * j_w_d
                    + self.b.inv_i * j_w_b * j_w_b;

                let p_d = self.half_b.local_anchor_ground - self.d.local_center;
                let p_b = q_d.inv_rotate(r_b + (c_b - c_d));
                coordinate_b = (p_b - p_d).dot(&self.half_b.local_axis);
            }
        }

        let c = (coordinate_a + self.ratio * coordinate_b) - self.constant;

        let mut impulse = 0.0;
        if mass > 0.0 {
            impulse = -c / mass;
        }

        c_a += j_v_ac * (self.a.inv_mass * impulse);
        a_a += self.a.inv_i * impulse * j_w_a;
        c_b += j_v_bd * (self.b.inv_mass * impulse);
        a_b += self.b.inv_i * impulse * j_w_b;
        c_c -= j_v_ac * (self.c.inv_mass * impulse);
        a_c -= self.c.inv_i * impulse * j_w_c;
        c_d -= j_v_bd * (self.d.inv_mass * impulse);
        a_d -= self.d.inv_i * impulse * j_w_d;

        positions[self.a.index].c = c_a;
        positions[self.a.index].a = a_a;
        positions[self.b.index].c = c_b;
        positions[self.b.index].a = a_b;
        positions[self.c.index].c = c_c;
        positions[self.c.index].a = a_c;
        positions[self.d.index].c = c_d;
        positions[self.d.index].a = a_d;

        c.abs() < LINEAR_SLOP
    }

    /// Reaction force at the anchor on body B
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.j_v_ac * (inv_dt * self.impulse)
    }

    /// Reaction torque on body B
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.impulse * self.j_w_a
    }
}
