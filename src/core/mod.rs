pub mod config;
pub mod events;
pub mod island;
pub mod storage;
pub mod world;

pub use events::{
    ContactImpulse, ContactListener, DestructionListener, QueryCallback, RayCastBehavior,
    RayCastCallback,
};
pub use storage::{Arena, Handle};
pub use world::World;

use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Handle to a rigid body stored in the world.
/// Generation-tagged: handles kept past `destroy_body` miss rather than
/// aliasing a body later stored in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to a joint stored in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct JointHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to a persistent contact stored in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ContactHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to a fixture: the owning body plus the body-local fixture id.
/// Fixture ids count up per body and are never reused, so stale fixture
/// handles miss like stale body handles do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FixtureHandle {
    /// The body the fixture is attached to
    pub body: BodyHandle,

    /// Body-local fixture id
    pub(crate) id: u32,
}

impl Handle for BodyHandle {
    fn from_raw_parts(index: u32, generation: u32) -> Self {
        BodyHandle { index, generation }
    }
    fn index(self) -> u32 {
        self.index
    }
    fn generation(self) -> u32 {
        self.generation
    }
}

impl Handle for JointHandle {
    fn from_raw_parts(index: u32, generation: u32) -> Self {
        JointHandle { index, generation }
    }
    fn index(self) -> u32 {
        self.index
    }
    fn generation(self) -> u32 {
        self.generation
    }
}

impl Handle for ContactHandle {
    fn from_raw_parts(index: u32, generation: u32) -> Self {
        ContactHandle { index, generation }
    }
    fn index(self) -> u32 {
        self.index
    }
    fn generation(self) -> u32 {
        self.generation
    }
}

/// Per-step timing data handed to the constraint solvers
#[derive(Debug, Clone, Copy)]
pub struct TimeStep {
    /// Time step length in seconds
    pub dt: f64,

    /// Inverse time step, zero when `dt` is zero
    pub inv_dt: f64,

    /// Ratio of this step to the previous one; scales warm-started impulses
    pub dt_ratio: f64,

    /// Number of velocity solver iterations
    pub velocity_iterations: usize,

    /// Number of position solver iterations
    pub position_iterations: usize,

    /// Whether accumulated impulses from the previous step are applied
    pub warm_starting: bool,
}

/// Solver-side position state for one body
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    /// World center of mass
    pub c: Vec2,

    /// Angle in radians
    pub a: f64,
}

/// Solver-side velocity state for one body
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    /// Linear velocity of the center of mass
    pub v: Vec2,

    /// Angular velocity in radians per second
    pub w: f64,
}
