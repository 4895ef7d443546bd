use crate::collision::{Contact, Manifold};
use crate::core::config::MAX_MANIFOLD_POINTS;
use crate::core::{ContactHandle, FixtureHandle, JointHandle};
use crate::math::Vec2;

/// Accumulated impulses of one contact after the velocity solve, reported
/// through [`ContactListener::post_solve`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactImpulse {
    /// Normal impulses, one per manifold point
    pub normal_impulses: [f64; MAX_MANIFOLD_POINTS],

    /// Tangent impulses, one per manifold point
    pub tangent_impulses: [f64; MAX_MANIFOLD_POINTS],

    /// Number of manifold points
    pub count: usize,
}

/// Observer of contact lifecycle events.
///
/// Callbacks run synchronously inside `World::step`. They receive the
/// contact data, not the world, so structural world mutation from inside a
/// callback is impossible; defer such work until the step returns.
pub trait ContactListener {
    /// Called when two fixtures begin to touch
    fn begin_contact(&mut self, _handle: ContactHandle, _contact: &mut Contact) {}

    /// Called when two fixtures cease to touch
    fn end_contact(&mut self, _handle: ContactHandle, _contact: &mut Contact) {}

    /// Called after narrow-phase update and before the solver runs.
    /// The contact may be disabled here to ignore it for one step, or its
    /// friction/restitution overridden.
    fn pre_solve(&mut self, _handle: ContactHandle, _contact: &mut Contact, _old_manifold: &Manifold) {}

    /// Called after the velocity solve with the impulses applied at this
    /// contact. Useful for reacting to collision strength.
    fn post_solve(&mut self, _handle: ContactHandle, _contact: &Contact, _impulse: &ContactImpulse) {}
}

/// Observer of implicit destructions caused by cascade deletes, e.g. joints
/// destroyed because an attached body was destroyed
pub trait DestructionListener {
    /// Called when a joint is about to be destroyed because an attached body
    /// is going away
    fn say_goodbye_joint(&mut self, _joint: JointHandle) {}

    /// Called when a fixture is about to be destroyed because its body is
    /// going away
    fn say_goodbye_fixture(&mut self, _fixture: FixtureHandle) {}
}

/// Result of a fixture report during a world ray cast, controlling how the
/// traversal proceeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayCastBehavior {
    /// Ignore this fixture and continue
    Ignore,

    /// Terminate the ray cast
    Terminate,

    /// Clip the ray to this hit fraction and continue
    Clip(f64),

    /// Continue with the ray unchanged
    Continue,
}

/// Callback invoked for each fixture hit by a world ray cast.
/// Receives the fixture, hit point, surface normal, and hit fraction.
pub type RayCastCallback<'a> =
    &'a mut dyn FnMut(FixtureHandle, Vec2, Vec2, f64) -> RayCastBehavior;

/// Callback invoked for each fixture overlapping a world AABB query.
/// Return false to stop the query.
pub type QueryCallback<'a> = &'a mut dyn FnMut(FixtureHandle) -> bool;
