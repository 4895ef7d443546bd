mod distance_joint;
mod friction_joint;
mod gear_joint;
mod joint;
mod motor_joint;
mod mouse_joint;
mod prismatic_joint;
mod pulley_joint;
mod revolute_joint;
mod rope_joint;
mod weld_joint;
mod wheel_joint;

pub use distance_joint::{DistanceJoint, DistanceJointDef};
pub use friction_joint::{FrictionJoint, FrictionJointDef};
pub use gear_joint::{GearBase, GearHalf, GearJoint, GearJointDef};
pub use joint::{Joint, JointDef, LimitState};
pub use motor_joint::{MotorJoint, MotorJointDef};
pub use mouse_joint::{MouseJoint, MouseJointDef};
pub use prismatic_joint::{PrismaticJoint, PrismaticJointDef};
pub use pulley_joint::{PulleyJoint, PulleyJointDef};
pub use revolute_joint::{RevoluteJoint, RevoluteJointDef};
pub use rope_joint::{RopeJoint, RopeJointDef};
pub use weld_joint::{WeldJoint, WeldJointDef};
pub use wheel_joint::{WheelJoint, WheelJointDef};
