use bitflags::bitflags;

use crate::bodies::{Fixture, FixtureDef};
use crate::core::{BodyHandle, ContactHandle, JointHandle};
use crate::math::{Sweep, Transform, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// The dynamics role of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Zero mass, zero velocity, moved only by the user
    #[default]
    Static,

    /// Zero mass, velocity set by the user, moved by the solver
    Kinematic,

    /// Positive mass, velocity determined by forces, moved by the solver
    Dynamic,
}

bitflags! {
    /// State flags of a body
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BodyFlags: u32 {
        /// Used when crawling the contact graph during island formation
        const ISLAND = 0x0001;

        /// The body is awake and participating in simulation
        const AWAKE = 0x0002;

        /// The body may be put to sleep when it comes to rest
        const AUTO_SLEEP = 0x0004;

        /// The body is treated continuously against static geometry
        const BULLET = 0x0008;

        /// Rotation is locked; inverse inertia is forced to zero
        const FIXED_ROTATION = 0x0010;

        /// The body participates in simulation and queries at all
        const ACTIVE = 0x0020;

        /// The sweep has been advanced by the TOI pass this step
        const TOI = 0x0040;
    }
}

/// Definition used to create a body
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BodyDef {
    /// The dynamics role of the body
    pub body_type: BodyType,

    /// World position of the body origin
    pub position: Vec2,

    /// World angle in radians
    pub angle: f64,

    /// Linear velocity of the body origin
    pub linear_velocity: Vec2,

    /// Angular velocity in radians per second
    pub angular_velocity: f64,

    /// Linear velocity damping; 0 means undamped
    pub linear_damping: f64,

    /// Angular velocity damping; 0 means undamped
    pub angular_damping: f64,

    /// Whether the body may be put to sleep
    pub allow_sleep: bool,

    /// Whether the body starts awake
    pub awake: bool,

    /// Whether rotation is locked
    pub fixed_rotation: bool,

    /// Whether the body gets continuous collision treatment
    pub bullet: bool,

    /// Whether the body starts active
    pub active: bool,

    /// Scale applied to world gravity for this body
    pub gravity_scale: f64,

    /// Opaque user tag carried by the body
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::zero(),
            angle: 0.0,
            linear_velocity: Vec2::zero(),
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            active: true,
            gravity_scale: 1.0,
            user_data: 0,
        }
    }
}

/// Adjacency record: a contact incident to this body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEdge {
    /// The body on the other side of the contact
    pub other: BodyHandle,

    /// The contact itself
    pub contact: ContactHandle,
}

/// Adjacency record: a joint incident to this body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointEdge {
    /// The body on the other side of the joint
    pub other: BodyHandle,

    /// The joint itself
    pub joint: JointHandle,
}

/// A rigid body: position, velocity, mass, and attached fixtures.
///
/// Bodies are created through the world, which owns them in an arena; the
/// body stores adjacency lists of incident contacts and joints so the
/// island builder can crawl the constraint graph.
#[derive(Debug)]
pub struct Body {
    /// The dynamics role of the body
    body_type: BodyType,

    pub(crate) flags: BodyFlags,

    /// Body origin transform
    pub(crate) xf: Transform,

    /// Swept motion of the center of mass over the current step
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f64,

    /// Force accumulator, cleared after each step
    pub(crate) force: Vec2,

    /// Torque accumulator, cleared after each step
    pub(crate) torque: f64,

    pub(crate) mass: f64,
    pub(crate) inv_mass: f64,

    /// Rotational inertia about the center of mass
    pub(crate) inertia: f64,
    pub(crate) inv_inertia: f64,

    pub(crate) linear_damping: f64,
    pub(crate) angular_damping: f64,
    pub(crate) gravity_scale: f64,

    /// Time spent below the sleep velocity thresholds
    pub(crate) sleep_time: f64,

    /// Slot in the island currently being solved
    pub(crate) island_index: usize,

    /// Fixtures attached to this body, in creation order
    pub(crate) fixtures: Vec<Fixture>,

    /// Allocator for body-local fixture ids
    next_fixture_id: u32,

    /// Contacts incident to this body
    pub(crate) contact_edges: Vec<ContactEdge>,

    /// Joints incident to this body
    pub(crate) joint_edges: Vec<JointEdge>,

    /// Opaque user tag
    pub user_data: u64,
}

impl Body {
    /// Creates a body from a definition; used by the world
    pub(crate) fn new(def: &BodyDef) -> Self {
        let mut flags = BodyFlags::empty();
        if def.bullet {
            flags.insert(BodyFlags::BULLET);
        }
        if def.fixed_rotation {
            flags.insert(BodyFlags::FIXED_ROTATION);
        }
        if def.allow_sleep {
            flags.insert(BodyFlags::AUTO_SLEEP);
        }
        if def.awake {
            flags.insert(BodyFlags::AWAKE);
        }
        if def.active {
            flags.insert(BodyFlags::ACTIVE);
        }

        let xf = Transform::from_position_angle(def.position, def.angle);

        let sweep = Sweep {
            local_center: Vec2::zero(),
            c0: xf.p,
            c: xf.p,
            a0: def.angle,
            a: def.angle,
            alpha0: 0.0,
        };

        let (mass, inv_mass) = match def.body_type {
            BodyType::Dynamic => (1.0, 1.0),
            _ => (0.0, 0.0),
        };

        Self {
            body_type: def.body_type,
            flags,
            xf,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::zero(),
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            sleep_time: 0.0,
            island_index: 0,
            fixtures: Vec::new(),
            next_fixture_id: 0,
            contact_edges: Vec::new(),
            joint_edges: Vec::new(),
            user_data: def.user_data,
        }
    }

    /// Attaches a fixture built from a definition and recomputes mass.
    /// Proxy registration is the world's responsibility.
    pub(crate) fn add_fixture(&mut self, def: FixtureDef) -> u32 {
        let id = self.next_fixture_id;
        self.next_fixture_id += 1;
        self.fixtures.push(Fixture::new(id, def));
        self.reset_mass_data();
        id
    }

    /// Detaches a fixture by id and recomputes mass
    pub(crate) fn remove_fixture(&mut self, id: u32) -> Option<Fixture> {
        let index = self.fixtures.iter().position(|f| f.id == id)?;
        let fixture = self.fixtures.remove(index);
        self.reset_mass_data();
        Some(fixture)
    }

    /// Returns the fixture with the given body-local id
    pub fn fixture(&self, id: u32) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    /// Returns the fixture with the given body-local id, mutably
    pub fn fixture_mut(&mut self, id: u32) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|f| f.id == id)
    }

    /// Returns the fixtures attached to this body in creation order
    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Returns the dynamics role of the body
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Changes the dynamics role, resetting mass data and velocities as the
    /// type invariants require. Contact teardown is handled by the world.
    pub(crate) fn set_body_type(&mut self, body_type: BodyType) {
        if self.body_type == body_type {
            return;
        }

        self.body_type = body_type;
        self.reset_mass_data();

        if body_type == BodyType::Static {
            self.linear_velocity = Vec2::zero();
            self.angular_velocity = 0.0;
            self.sweep.c0 = self.sweep.c;
            self.sweep.a0 = self.sweep.a;
        }

        self.set_awake(true);
        self.force = Vec2::zero();
        self.torque = 0.0;
    }

    /// Returns the body origin transform
    pub fn transform(&self) -> Transform {
        self.xf
    }

    /// Returns the world position of the body origin
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    /// Returns the body angle in radians
    pub fn angle(&self) -> f64 {
        self.sweep.a
    }

    /// Returns the world position of the center of mass
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Returns the center of mass in body-local coordinates
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    /// Sets the transform directly. Fixture synchronization is handled by
    /// the world wrapper.
    pub(crate) fn set_transform_internal(&mut self, position: Vec2, angle: f64) {
        self.xf = Transform::from_position_angle(position, angle);

        self.sweep.c = self.xf.transform_point(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    /// Returns the linear velocity of the center of mass
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Sets the linear velocity of the center of mass
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if v.length_squared() > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    /// Returns the angular velocity in radians per second
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Sets the angular velocity in radians per second
    pub fn set_angular_velocity(&mut self, w: f64) {
        if self.body_type == BodyType::Static {
            return;
        }
        if w * w > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = w;
    }

    /// Applies a world force at a world point. Non-center forces generate
    /// torque. Wakes the body when `wake` is set.
    pub fn apply_force(&mut self, force: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.force += force;
            self.torque += (point - self.sweep.c).cross(&force);
        }
    }

    /// Applies a world force at the center of mass
    pub fn apply_force_to_center(&mut self, force: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.force += force;
        }
    }

    /// Applies a torque about the center of mass
    pub fn apply_torque(&mut self, torque: f64, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.torque += torque;
        }
    }

    /// Applies a linear impulse at a world point, changing velocity
    /// immediately
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.linear_velocity += impulse * self.inv_mass;
            self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(&impulse);
        }
    }

    /// Applies an angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: f64, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.angular_velocity += self.inv_inertia * impulse;
        }
    }

    /// Returns the mass in kilograms
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Returns the rotational inertia about the center of mass
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Recomputes mass, center of mass, and inertia from the fixtures.
    ///
    /// Static and kinematic bodies get zero mass and inertia. A dynamic
    /// body whose fixtures carry no density is given one kilogram so it
    /// stays well conditioned.
    pub(crate) fn reset_mass_data(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.sweep.local_center = Vec2::zero();

        if self.body_type != BodyType::Dynamic {
            self.sweep.c0 = self.xf.p;
            self.sweep.c = self.xf.p;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::zero();
        for fixture in &self.fixtures {
            if fixture.density == 0.0 {
                continue;
            }

            let mass_data = fixture.shape.compute_mass(fixture.density);
            self.mass += mass_data.mass;
            local_center += mass_data.center * mass_data.mass;
            self.inertia += mass_data.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.flags.contains(BodyFlags::FIXED_ROTATION) {
            // Center the inertia about the center of mass.
            self.inertia -= self.mass * local_center.length_squared();
            debug_assert!(self.inertia > 0.0);
            self.inv_inertia = 1.0 / self.inertia;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        // Move the sweep center while preserving the world velocity of the
        // new center of mass.
        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.transform_point(local_center);
        self.sweep.c0 = self.sweep.c;

        self.linear_velocity +=
            Vec2::scalar_cross(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Returns whether the body is awake
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    /// Wakes the body or puts it to sleep
    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            if !self.flags.contains(BodyFlags::AWAKE) {
                self.flags.insert(BodyFlags::AWAKE);
                self.sleep_time = 0.0;
            }
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::zero();
            self.angular_velocity = 0.0;
            self.force = Vec2::zero();
            self.torque = 0.0;
        }
    }

    /// Returns whether the body participates in simulation
    pub fn is_active(&self) -> bool {
        self.flags.contains(BodyFlags::ACTIVE)
    }

    /// Returns whether the body gets continuous collision treatment
    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    /// Requests or clears continuous collision treatment
    pub fn set_bullet(&mut self, bullet: bool) {
        self.flags.set(BodyFlags::BULLET, bullet);
    }

    /// Returns whether rotation is locked
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Returns whether the body may be put to sleep automatically
    pub fn is_sleep_allowed(&self) -> bool {
        self.flags.contains(BodyFlags::AUTO_SLEEP)
    }

    /// Allows or forbids automatic sleeping
    pub fn set_sleep_allowed(&mut self, allowed: bool) {
        self.flags.set(BodyFlags::AUTO_SLEEP, allowed);
        if !allowed {
            self.set_awake(true);
        }
    }

    /// Returns the gravity scale of the body
    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    /// Sets the gravity scale of the body
    pub fn set_gravity_scale(&mut self, scale: f64) {
        self.gravity_scale = scale;
    }

    /// Returns the linear damping of the body
    pub fn linear_damping(&self) -> f64 {
        self.linear_damping
    }

    /// Returns the angular damping of the body
    pub fn angular_damping(&self) -> f64 {
        self.angular_damping
    }

    /// Returns the contacts incident to this body
    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    /// Returns the joints incident to this body
    pub fn joint_edges(&self) -> &[JointEdge] {
        &self.joint_edges
    }

    /// Maps a local point to world coordinates
    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.xf.transform_point(local_point)
    }

    /// Maps a local vector to world coordinates
    pub fn world_vector(&self, local_vector: Vec2) -> Vec2 {
        self.xf.q.rotate(local_vector)
    }

    /// Maps a world point to local coordinates
    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.xf.inv_transform_point(world_point)
    }

    /// Maps a world vector to local coordinates
    pub fn local_vector(&self, world_vector: Vec2) -> Vec2 {
        self.xf.q.inv_rotate(world_vector)
    }

    /// Rebuilds the transform from the sweep end state
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.q.set_angle(self.sweep.a);
        self.xf.p = self.sweep.c - self.xf.q.rotate(self.sweep.local_center);
    }

    /// Advances the body sweep to `alpha` and rebuilds the transform; used
    /// by the TOI solver
    pub(crate) fn advance(&mut self, alpha: f64) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }
}
