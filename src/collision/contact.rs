use bitflags::bitflags;

use crate::collision::collide_circle::{collide_circles, collide_polygon_and_circle};
use crate::collision::collide_edge::{collide_edge_and_circle, collide_edge_and_polygon};
use crate::collision::collide_polygon::collide_polygons;
use crate::collision::manifold::Manifold;
use crate::core::events::ContactListener;
use crate::core::{ContactHandle, FixtureHandle};
use crate::math::Transform;
use crate::shapes::{Shape, ShapeType};

bitflags! {
    /// State flags of a persistent contact
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContactFlags: u32 {
        /// Used when crawling the contact graph during island formation
        const ISLAND = 0x0001;

        /// The fixtures are touching
        const TOUCHING = 0x0002;

        /// The contact participates in solving; can be cleared by the user
        /// for one step from `pre_solve`
        const ENABLED = 0x0004;

        /// A fixture filter changed; the pair must be re-checked
        const FILTER = 0x0008;

        /// A bullet hit this contact during the TOI pass
        const BULLET_HIT = 0x0010;

        /// The stored `toi` field is valid for this step
        const TOI = 0x0020;
    }
}

/// Friction mixing: the geometric mean gives believable results when one
/// surface is slick
#[inline]
pub fn mix_friction(friction_a: f64, friction_b: f64) -> f64 {
    (friction_a * friction_b).sqrt()
}

/// Restitution mixing: a bouncy surface stays bouncy against anything
#[inline]
pub fn mix_restitution(restitution_a: f64, restitution_b: f64) -> f64 {
    restitution_a.max(restitution_b)
}

/// Returns whether the canonical contact order requires swapping the pair.
/// The reference shape (edge/chain over polygon over circle) goes in slot A.
pub fn should_swap(type_a: ShapeType, type_b: ShapeType) -> bool {
    fn rank(t: ShapeType) -> u8 {
        match t {
            ShapeType::Circle => 0,
            ShapeType::Polygon => 1,
            ShapeType::Edge => 2,
            ShapeType::Chain => 3,
        }
    }
    rank(type_a) < rank(type_b)
}

/// A persistent contact between two fixture children.
///
/// Created by the broad phase when fat AABBs overlap, updated by the narrow
/// phase every step, and destroyed when the AABBs separate or a fixture
/// goes away. The manifold's accumulated impulses persist across updates
/// when feature ids match, which warm starts the solver.
#[derive(Debug, Clone)]
pub struct Contact {
    /// First fixture; the canonical reference shape
    pub fixture_a: FixtureHandle,

    /// Child index on fixture A (chain segment)
    pub child_a: usize,

    /// Second fixture
    pub fixture_b: FixtureHandle,

    /// Child index on fixture B
    pub child_b: usize,

    /// Contact geometry in the reference body's frame
    pub manifold: Manifold,

    pub(crate) flags: ContactFlags,

    /// Mixed friction coefficient
    pub friction: f64,

    /// Mixed restitution coefficient
    pub restitution: f64,

    /// Conveyor-belt style surface speed along the tangent
    pub tangent_speed: f64,

    /// Number of TOI sub-steps consumed by this contact this step
    pub(crate) toi_count: usize,

    /// Cached time of impact, valid while the TOI flag is set
    pub(crate) toi: f64,
}

impl Contact {
    /// Creates a new enabled contact with mixed material properties
    pub fn new(
        fixture_a: FixtureHandle,
        child_a: usize,
        fixture_b: FixtureHandle,
        child_b: usize,
        friction: f64,
        restitution: f64,
    ) -> Self {
        Self {
            fixture_a,
            child_a,
            fixture_b,
            child_b,
            manifold: Manifold::default(),
            flags: ContactFlags::ENABLED,
            friction,
            restitution,
            tangent_speed: 0.0,
            toi_count: 0,
            toi: 0.0,
        }
    }

    /// Returns whether the fixtures are touching
    pub fn is_touching(&self) -> bool {
        self.flags.contains(ContactFlags::TOUCHING)
    }

    /// Returns whether the contact participates in solving
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ContactFlags::ENABLED)
    }

    /// Enables or disables the contact. A disabled contact persists but is
    /// skipped by the solver until re-enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(ContactFlags::ENABLED, enabled);
    }

    /// Overrides the mixed friction coefficient
    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction;
    }

    /// Overrides the mixed restitution coefficient
    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution;
    }

    /// Sets the surface tangent speed, in meters per second
    pub fn set_tangent_speed(&mut self, speed: f64) {
        self.tangent_speed = speed;
    }

    /// Marks the contact for filter re-evaluation on the next step
    pub fn flag_for_filtering(&mut self) {
        self.flags.insert(ContactFlags::FILTER);
    }

    /// Runs the narrow phase for this contact's shape pair
    pub fn evaluate(
        &self,
        manifold: &mut Manifold,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
    ) {
        match (shape_a, shape_b) {
            (Shape::Circle(a), Shape::Circle(b)) => collide_circles(manifold, a, xf_a, b, xf_b),
            (Shape::Polygon(a), Shape::Circle(b)) => {
                collide_polygon_and_circle(manifold, a, xf_a, b, xf_b)
            }
            (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(manifold, a, xf_a, b, xf_b),
            (Shape::Edge(a), Shape::Circle(b)) => {
                collide_edge_and_circle(manifold, a, xf_a, b, xf_b)
            }
            (Shape::Edge(a), Shape::Polygon(b)) => {
                collide_edge_and_polygon(manifold, a, xf_a, b, xf_b)
            }
            (Shape::Chain(a), Shape::Circle(b)) => {
                let edge = a.child_edge(self.child_a);
                collide_edge_and_circle(manifold, &edge, xf_a, b, xf_b)
            }
            (Shape::Chain(a), Shape::Polygon(b)) => {
                let edge = a.child_edge(self.child_a);
                collide_edge_and_polygon(manifold, &edge, xf_a, b, xf_b)
            }
            // Edge-edge and chain-chain pairs have no volume and are not
            // collided.
            _ => manifold.point_count = 0,
        }
    }

    /// Updates the contact manifold and touching state.
    ///
    /// Sensor pairs only test overlap. Otherwise the narrow phase runs and
    /// accumulated impulses are carried over point-for-point where feature
    /// ids match. Begin/end transitions are reported through the listener.
    /// Returns the (began, ended) transition pair so the caller can wake
    /// bodies.
    #[allow(clippy::too_many_arguments)]
    pub fn update<'a>(
        &mut self,
        handle: ContactHandle,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
        sensor: bool,
        listener: &mut Option<&'a mut dyn ContactListener>,
    ) -> (bool, bool) {
        let old_manifold = self.manifold.clone();

        // Re-enable: the user may have disabled the contact in pre_solve
        // for one step only.
        self.flags.insert(ContactFlags::ENABLED);

        let was_touching = self.flags.contains(ContactFlags::TOUCHING);
        let touching;

        if sensor {
            touching = crate::collision::distance::test_overlap(
                shape_a,
                self.child_a,
                shape_b,
                self.child_b,
                xf_a,
                xf_b,
            );

            // Sensors never produce solver manifolds.
            self.manifold.point_count = 0;
        } else {
            let mut manifold = Manifold::default();
            self.evaluate(&mut manifold, shape_a, xf_a, shape_b, xf_b);
            touching = manifold.point_count > 0;

            // Match old contact ids to new contact ids and copy the stored
            // impulses to warm start the solver.
            for i in 0..manifold.point_count {
                let mp2 = &mut manifold.points[i];
                mp2.normal_impulse = 0.0;
                mp2.tangent_impulse = 0.0;

                for j in 0..old_manifold.point_count {
                    let mp1 = &old_manifold.points[j];
                    if mp1.id == mp2.id {
                        mp2.normal_impulse = mp1.normal_impulse;
                        mp2.tangent_impulse = mp1.tangent_impulse;
                        break;
                    }
                }
            }

            self.manifold = manifold;
        }

        self.flags.set(ContactFlags::TOUCHING, touching);

        let began = !was_touching && touching;
        let ended = was_touching && !touching;

        if let Some(listener) = listener.as_deref_mut() {
            if began {
                listener.begin_contact(handle, self);
            }
            if ended {
                listener.end_contact(handle, self);
            }
            if touching && !sensor {
                listener.pre_solve(handle, self, &old_manifold);
            }
        }

        (began, ended)
    }
}
