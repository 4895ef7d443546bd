use crate::bodies::Body;
use crate::constraints::{
    DistanceJoint, DistanceJointDef, FrictionJoint, FrictionJointDef, GearJoint, GearJointDef,
    MotorJoint, MotorJointDef, MouseJoint, MouseJointDef, PrismaticJoint, PrismaticJointDef,
    PulleyJoint, PulleyJointDef, RevoluteJoint, RevoluteJointDef, RopeJoint, RopeJointDef,
    WeldJoint, WeldJointDef, WheelJoint, WheelJointDef,
};
use crate::core::{Arena, BodyHandle, Position, TimeStep, Velocity};
use crate::math::Vec2;

/// Activity of a limit constraint's scalar impulse accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    #[default]
    Inactive,
    AtLower,
    AtUpper,
    Equal,
}

/// Solver-temp body data captured by each joint during
/// `init_velocity_constraints`
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JointBodyData {
    pub index: usize,
    pub local_center: Vec2,
    pub inv_mass: f64,
    pub inv_i: f64,
}

impl JointBodyData {
    pub fn capture(body: &Body) -> Self {
        Self {
            index: body.island_index,
            local_center: body.sweep.local_center,
            inv_mass: body.inv_mass,
            inv_i: body.inv_inertia,
        }
    }
}

/// Definition used to create a joint; one variant per joint kind
#[derive(Debug, Clone)]
pub enum JointDef {
    Distance(DistanceJointDef),
    Revolute(RevoluteJointDef),
    Prismatic(PrismaticJointDef),
    Weld(WeldJointDef),
    Pulley(PulleyJointDef),
    Gear(GearJointDef),
    Mouse(MouseJointDef),
    Friction(FrictionJointDef),
    Rope(RopeJointDef),
    Wheel(WheelJointDef),
    Motor(MotorJointDef),
}

/// A constraint between two bodies.
///
/// Joints form a closed set and are represented as tagged variants; the
/// solver dispatches on the tag. Every kind implements the same three-phase
/// protocol: `init_velocity_constraints` computes effective masses and warm
/// starts, `solve_velocity_constraints` clamps and applies impulses, and
/// `solve_position_constraints` applies positional correction, returning
/// true once the error is within tolerance.
#[derive(Debug)]
pub enum Joint {
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Prismatic(PrismaticJoint),
    Weld(WeldJoint),
    Pulley(PulleyJoint),
    Gear(GearJoint),
    Mouse(MouseJoint),
    Friction(FrictionJoint),
    Rope(RopeJoint),
    Wheel(WheelJoint),
    Motor(MotorJoint),
}

macro_rules! dispatch {
    ($self:expr, $j:ident => $body:expr) => {
        match $self {
            Joint::Distance($j) => $body,
            Joint::Revolute($j) => $body,
            Joint::Prismatic($j) => $body,
            Joint::Weld($j) => $body,
            Joint::Pulley($j) => $body,
            Joint::Gear($j) => $body,
            Joint::Mouse($j) => $body,
            Joint::Friction($j) => $body,
            Joint::Rope($j) => $body,
            Joint::Wheel($j) => $body,
            Joint::Motor($j) => $body,
        }
    };
}

impl Joint {
    /// Returns the first attached body
    pub fn body_a(&self) -> BodyHandle {
        dispatch!(self, j => j.body_a)
    }

    /// Returns the second attached body
    pub fn body_b(&self) -> BodyHandle {
        dispatch!(self, j => j.body_b)
    }

    /// Returns whether the attached bodies may still collide with each
    /// other through contacts
    pub fn collide_connected(&self) -> bool {
        dispatch!(self, j => j.collide_connected)
    }

    /// Computes effective masses and applies warm-start impulses
    pub(crate) fn init_velocity_constraints(
        &mut self,
        step: &TimeStep,
        bodies: &Arena<Body, BodyHandle>,
        positions: &[Position],
        velocities: &mut [Velocity],
    ) {
        dispatch!(self, j => j.init_velocity_constraints(step, bodies, positions, velocities))
    }

    /// Applies one velocity iteration of clamped impulses
    pub(crate) fn solve_velocity_constraints(
        &mut self,
        step: &TimeStep,
        velocities: &mut [Velocity],
    ) {
        dispatch!(self, j => j.solve_velocity_constraints(step, velocities))
    }

    /// Applies one position iteration; returns true when the positional
    /// error is within tolerance
    pub(crate) fn solve_position_constraints(&mut self, positions: &mut [Position]) -> bool {
        dispatch!(self, j => j.solve_position_constraints(positions))
    }

    /// Returns the reaction force on body B at the anchor,
    /// `inv_dt x accumulated impulse`
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        dispatch!(self, j => j.reaction_force(inv_dt))
    }

    /// Returns the reaction torque on body B, `inv_dt x accumulated
    /// angular impulse`
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        dispatch!(self, j => j.reaction_torque(inv_dt))
    }
}
