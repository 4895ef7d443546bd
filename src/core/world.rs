use crate::bodies::{Body, BodyDef, BodyFlags, BodyType, FixtureDef, FixtureProxy, JointEdge};
use crate::collision::ContactFlags;
use crate::collision::time_of_impact::{time_of_impact, ToiInput, ToiState};
use crate::collision::{Contact, ContactManager, DistanceProxy, FixtureProxyKey};
use crate::constraints::{GearBase, GearHalf, GearJoint, Joint, JointDef};
use crate::core::config::{DEFAULT_POSITION_ITERATIONS, DEFAULT_VELOCITY_ITERATIONS, MAX_SUB_STEPS, MAX_TOI_CONTACTS};
use crate::core::events::{ContactListener, DestructionListener, RayCastBehavior};
use crate::core::island::{solve_island, solve_toi_island, Island};
use crate::core::{Arena, BodyHandle, ContactHandle, FixtureHandle, JointHandle, TimeStep};
use crate::error::PhysicsError;
use crate::math::{Aabb, RayCastInput, Vec2};
use crate::Result;

/// The physics world: owns the body, joint, and contact graph, and advances
/// the simulation.
///
/// All storage is arena-based with stable handles; iteration order is slot
/// order, so identical operation sequences produce identical simulations on
/// one platform.
pub struct World {
    pub(crate) bodies: Arena<Body, BodyHandle>,
    pub(crate) joints: Arena<Joint, JointHandle>,
    pub(crate) contacts: Arena<Contact, ContactHandle>,

    contact_manager: ContactManager,

    gravity: Vec2,
    allow_sleep: bool,
    continuous_physics: bool,
    warm_starting: bool,

    /// Inverse dt of the previous step, used to scale warm-started impulses
    inv_dt0: f64,

    /// Set when fixtures were created since the last pair update
    new_fixtures: bool,

    contact_listener: Option<Box<dyn ContactListener>>,
    destruction_listener: Option<Box<dyn DestructionListener>>,
}

impl World {
    /// Creates a world with the given gravity vector
    pub fn new(gravity: Vec2) -> Self {
        Self {
            bodies: Arena::new(),
            joints: Arena::new(),
            contacts: Arena::new(),
            contact_manager: ContactManager::new(),
            gravity,
            allow_sleep: true,
            continuous_physics: true,
            warm_starting: true,
            inv_dt0: 0.0,
            new_fixtures: false,
            contact_listener: None,
            destruction_listener: None,
        }
    }

    /// Returns the world gravity
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Sets the world gravity
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Enables or disables automatic sleeping; disabling wakes every body
    pub fn set_allow_sleeping(&mut self, allow: bool) {
        if allow == self.allow_sleep {
            return;
        }
        self.allow_sleep = allow;
        if !allow {
            let handles = self.bodies.handles();
            for handle in handles {
                if let Some(body) = self.bodies.get_mut(handle) {
                    body.set_awake(true);
                }
            }
        }
    }

    /// Enables or disables the continuous (time-of-impact) pass
    pub fn set_continuous_physics(&mut self, continuous: bool) {
        self.continuous_physics = continuous;
    }

    /// Enables or disables solver warm starting; mostly for testing
    pub fn set_warm_starting(&mut self, warm: bool) {
        self.warm_starting = warm;
    }

    /// Installs the contact event listener
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.contact_listener = Some(listener);
    }

    /// Installs the destruction listener
    pub fn set_destruction_listener(&mut self, listener: Box<dyn DestructionListener>) {
        self.destruction_listener = Some(listener);
    }

    // === Bodies and fixtures ===

    /// Creates a body from a definition
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle> {
        if !def.position.is_valid() || !def.angle.is_finite() {
            return Err(PhysicsError::InvalidParameter(
                "Body position and angle must be finite".to_string(),
            ));
        }
        if !def.linear_velocity.is_valid() || !def.angular_velocity.is_finite() {
            return Err(PhysicsError::InvalidParameter(
                "Body velocity must be finite".to_string(),
            ));
        }

        Ok(self.bodies.insert(Body::new(def)))
    }

    /// Destroys a body, cascading to its joints, contacts, and fixtures
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.bodies.try_get(handle)?;

        // Destroy attached joints first; each removal reports to the
        // destruction listener.
        loop {
            let joint = match self.bodies.get(handle) {
                Some(body) => body.joint_edges.first().map(|e| e.joint),
                None => None,
            };
            match joint {
                Some(joint_handle) => {
                    if let Some(listener) = self.destruction_listener.as_deref_mut() {
                        listener.say_goodbye_joint(joint_handle);
                    }
                    // Full destroy so gears coupling this joint go too.
                    self.destroy_joint(joint_handle)?;
                }
                None => break,
            }
        }

        // Destroy attached contacts.
        loop {
            let contact = match self.bodies.get(handle) {
                Some(body) => body.contact_edges.first().map(|e| e.contact),
                None => None,
            };
            match contact {
                Some(contact_handle) => {
                    ContactManager::destroy_contact(
                        &mut self.bodies,
                        &mut self.contacts,
                        contact_handle,
                        &mut self.contact_listener.as_deref_mut(),
                    );
                }
                None => break,
            }
        }

        // Destroy fixtures and their broad-phase proxies.
        let fixture_ids: Vec<u32> = self
            .bodies
            .get(handle)
            .map(|b| b.fixtures.iter().map(|f| f.id).collect())
            .unwrap_or_default();
        for id in fixture_ids {
            if let Some(listener) = self.destruction_listener.as_deref_mut() {
                listener.say_goodbye_fixture(FixtureHandle { body: handle, id });
            }
            if let Some(body) = self.bodies.get_mut(handle) {
                if let Some(fixture) = body.remove_fixture(id) {
                    for proxy in &fixture.proxies {
                        self.contact_manager.broad_phase.destroy_proxy(proxy.proxy_id);
                    }
                }
            }
        }

        self.bodies.remove(handle);
        Ok(())
    }

    /// Returns a reference to a body
    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies.try_get(handle)
    }

    /// Returns a mutable reference to a body
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies.try_get_mut(handle)
    }

    /// Returns the live body handles in iteration order
    pub fn body_handles(&self) -> Vec<BodyHandle> {
        self.bodies.handles()
    }

    /// Returns the number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Creates a fixture on a body and registers its broad-phase proxies
    pub fn create_fixture(
        &mut self,
        body_handle: BodyHandle,
        def: FixtureDef,
    ) -> Result<FixtureHandle> {
        if !(def.density.is_finite() && def.density >= 0.0) {
            return Err(PhysicsError::InvalidParameter(
                "Fixture density must be finite and non-negative".to_string(),
            ));
        }
        if !(def.friction.is_finite() && def.friction >= 0.0) || !def.restitution.is_finite() {
            return Err(PhysicsError::InvalidParameter(
                "Fixture material properties must be finite".to_string(),
            ));
        }

        let body = self.bodies.try_get_mut(body_handle)?;
        let active = body.is_active();
        let xf = body.transform();
        let id = body.add_fixture(def);
        let fixture_handle = FixtureHandle {
            body: body_handle,
            id,
        };

        if active {
            // One proxy per shape child.
            let body = self.bodies.get_mut(body_handle).unwrap();
            let fixture = body.fixture_mut(id).unwrap();
            let shape = fixture.shape.clone();
            for child in 0..shape.child_count() {
                let aabb = shape.compute_aabb(&xf, child);
                let proxy_id = self.contact_manager.broad_phase.create_proxy(
                    aabb,
                    FixtureProxyKey {
                        fixture: fixture_handle,
                        child,
                    },
                );
                // Re-borrow: the broad phase call above ends the fixture
                // borrow.
                let body = self.bodies.get_mut(body_handle).unwrap();
                let fixture = body.fixture_mut(id).unwrap();
                fixture.proxies.push(FixtureProxy {
                    aabb,
                    proxy_id,
                    child_index: child,
                });
            }
        }

        self.new_fixtures = true;
        Ok(fixture_handle)
    }

    /// Destroys a fixture, removing its proxies and any contacts built on it
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<()> {
        let body = self.bodies.try_get(handle.body)?;
        if body.fixture(handle.id).is_none() {
            return Err(PhysicsError::ResourceNotFound(format!(
                "{:?} not found",
                handle
            )));
        }

        // Destroy contacts touching this fixture.
        let doomed: Vec<ContactHandle> = body
            .contact_edges
            .iter()
            .filter_map(|edge| {
                let contact = self.contacts.get(edge.contact)?;
                if contact.fixture_a == handle || contact.fixture_b == handle {
                    Some(edge.contact)
                } else {
                    None
                }
            })
            .collect();
        for contact_handle in doomed {
            let mut listener = self.contact_listener.as_deref_mut();
            ContactManager::destroy_contact(
                &mut self.bodies,
                &mut self.contacts,
                contact_handle,
                &mut listener,
            );
        }

        let body = self.bodies.get_mut(handle.body).unwrap();
        if let Some(fixture) = body.remove_fixture(handle.id) {
            for proxy in &fixture.proxies {
                self.contact_manager.broad_phase.destroy_proxy(proxy.proxy_id);
            }
        }

        Ok(())
    }

    /// Moves a body to a new position and angle, updating broad-phase state
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f64) -> Result<()> {
        if !position.is_valid() || !angle.is_finite() {
            return Err(PhysicsError::InvalidParameter(
                "Transform must be finite".to_string(),
            ));
        }

        let body = self.bodies.try_get_mut(handle)?;
        body.set_transform_internal(position, angle);
        self.synchronize_fixtures(handle);
        Ok(())
    }

    // === Joints ===

    /// Creates a joint from a definition. Connected bodies are woken, and
    /// contacts between them are flagged for re-filtering when the joint
    /// forbids connected collision.
    pub fn create_joint(&mut self, def: &JointDef) -> Result<JointHandle> {
        let joint = match def {
            JointDef::Distance(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Distance(crate::constraints::DistanceJoint::new(d))
            }
            JointDef::Revolute(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Revolute(crate::constraints::RevoluteJoint::new(d))
            }
            JointDef::Prismatic(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Prismatic(crate::constraints::PrismaticJoint::new(d))
            }
            JointDef::Weld(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Weld(crate::constraints::WeldJoint::new(d))
            }
            JointDef::Pulley(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Pulley(crate::constraints::PulleyJoint::new(d))
            }
            JointDef::Gear(d) => Joint::Gear(self.build_gear_joint(d)?),
            JointDef::Mouse(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                let body_b = self.bodies.try_get(d.body_b)?;
                let local_anchor_b = body_b.local_point(d.target);
                Joint::Mouse(crate::constraints::MouseJoint::new(d, local_anchor_b))
            }
            JointDef::Friction(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Friction(crate::constraints::FrictionJoint::new(d))
            }
            JointDef::Rope(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Rope(crate::constraints::RopeJoint::new(d))
            }
            JointDef::Wheel(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Wheel(crate::constraints::WheelJoint::new(d))
            }
            JointDef::Motor(d) => {
                self.check_joint_bodies(d.body_a, d.body_b)?;
                Joint::Motor(crate::constraints::MotorJoint::new(d))
            }
        };

        let body_a = joint.body_a();
        let body_b = joint.body_b();
        let collide_connected = joint.collide_connected();

        let handle = self.joints.insert(joint);

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.joint_edges.push(JointEdge {
                other: body_b,
                joint: handle,
            });
            body.set_awake(true);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.joint_edges.push(JointEdge {
                other: body_a,
                joint: handle,
            });
            body.set_awake(true);
        }

        // Existing contacts between the bodies must be re-filtered so the
        // joint's no-collide rule takes effect next step.
        if !collide_connected {
            self.flag_contacts_for_filtering(body_a, body_b);
        }

        Ok(handle)
    }

    /// Destroys a joint. Gears referencing the joint are destroyed first.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        self.joints.try_get(handle)?;

        // Cascade: a gear coupling this joint cannot outlive it.
        let dependent_gears: Vec<JointHandle> = self
            .joints
            .iter()
            .filter_map(|(h, joint)| match joint {
                Joint::Gear(gear) if gear.joint_a == handle || gear.joint_b == handle => Some(h),
                _ => None,
            })
            .collect();
        for gear in dependent_gears {
            if let Some(listener) = self.destruction_listener.as_deref_mut() {
                listener.say_goodbye_joint(gear);
            }
            self.destroy_joint_internal(gear)?;
        }

        self.destroy_joint_internal(handle)
    }

    fn destroy_joint_internal(&mut self, handle: JointHandle) -> Result<()> {
        let joint = self.joints.try_get(handle)?;
        let body_a = joint.body_a();
        let body_b = joint.body_b();
        let collide_connected = joint.collide_connected();

        self.joints.remove(handle);

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.joint_edges.retain(|e| e.joint != handle);
            body.set_awake(true);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.joint_edges.retain(|e| e.joint != handle);
            body.set_awake(true);
        }

        if !collide_connected {
            self.flag_contacts_for_filtering(body_a, body_b);
        }

        Ok(())
    }

    /// Returns a reference to a joint
    pub fn joint(&self, handle: JointHandle) -> Result<&Joint> {
        self.joints.try_get(handle)
    }

    /// Returns a mutable reference to a joint
    pub fn joint_mut(&mut self, handle: JointHandle) -> Result<&mut Joint> {
        self.joints.try_get_mut(handle)
    }

    /// Returns the number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Returns a reference to a contact
    pub fn contact(&self, handle: ContactHandle) -> Result<&Contact> {
        self.contacts.try_get(handle)
    }

    /// Returns the number of contacts
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    fn check_joint_bodies(&self, body_a: BodyHandle, body_b: BodyHandle) -> Result<()> {
        self.bodies.try_get(body_a)?;
        self.bodies.try_get(body_b)?;
        if body_a == body_b {
            return Err(PhysicsError::InvalidParameter(
                "Joint bodies must be distinct".to_string(),
            ));
        }
        Ok(())
    }

    fn flag_contacts_for_filtering(&mut self, body_a: BodyHandle, body_b: BodyHandle) {
        let edges: Vec<ContactHandle> = self
            .bodies
            .get(body_a)
            .map(|b| {
                b.contact_edges
                    .iter()
                    .filter(|e| e.other == body_b)
                    .map(|e| e.contact)
                    .collect()
            })
            .unwrap_or_default();
        for handle in edges {
            if let Some(contact) = self.contacts.get_mut(handle) {
                contact.flag_for_filtering();
            }
        }
    }

    fn build_gear_joint(&self, def: &crate::constraints::GearJointDef) -> Result<GearJoint> {
        let half_a = self.gear_half(def.joint_a)?;
        let half_b = self.gear_half(def.joint_b)?;

        if !(def.ratio.is_finite() && def.ratio.abs() > crate::math::EPSILON) {
            return Err(PhysicsError::InvalidParameter(
                "Gear ratio must be finite and non-zero".to_string(),
            ));
        }

        let coordinate = |half: &GearHalf| -> f64 {
            let body = self.bodies.get(half.body).unwrap();
            let ground = self.bodies.get(half.ground).unwrap();
            GearJoint::coordinate(
                half,
                (body.sweep.c, body.sweep.a, body.sweep.local_center),
                (ground.sweep.c, ground.sweep.a, ground.sweep.local_center),
            )
        };

        let constant = coordinate(&half_a) + def.ratio * coordinate(&half_b);

        Ok(GearJoint::new(def, half_a, half_b, constant))
    }

    fn gear_half(&self, handle: JointHandle) -> Result<GearHalf> {
        let joint = self.joints.try_get(handle)?;
        match joint {
            Joint::Revolute(j) => Ok(GearHalf {
                base: GearBase::Revolute,
                ground: j.body_a,
                body: j.body_b,
                local_anchor_ground: j.local_anchor_a,
                local_anchor_body: j.local_anchor_b,
                local_axis: Vec2::zero(),
                reference_angle: j.reference_angle,
            }),
            Joint::Prismatic(j) => Ok(GearHalf {
                base: GearBase::Prismatic,
                ground: j.body_a,
                body: j.body_b,
                local_anchor_ground: j.local_anchor_a,
                local_anchor_body: j.local_anchor_b,
                local_axis: j.local_axis_a,
                reference_angle: j.reference_angle,
            }),
            _ => Err(PhysicsError::InvalidParameter(
                "Gear joints can only couple revolute or prismatic joints".to_string(),
            )),
        }
    }

    // === Stepping ===

    /// Advances the simulation by `dt` seconds.
    ///
    /// Sequences: pair update for new fixtures, narrow phase, island solve
    /// with the given iteration counts, the continuous (TOI) pass, and
    /// force-accumulator clearing. Runs to completion; callbacks observe a
    /// consistent world but cannot mutate it.
    pub fn step(&mut self, dt: f64, velocity_iterations: usize, position_iterations: usize) {
        // New fixtures need pairs before the narrow phase can see them.
        if self.new_fixtures {
            self.contact_manager.find_new_contacts(
                &mut self.bodies,
                &mut self.contacts,
                &self.joints,
            );
            self.new_fixtures = false;
        }

        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        let step = TimeStep {
            dt,
            inv_dt,
            dt_ratio: self.inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            warm_starting: self.warm_starting,
        };

        // Narrow phase: update manifolds, emit begin/end, run pre-solve.
        {
            let mut listener = self.contact_listener.as_deref_mut();
            self.contact_manager.collide(
                &mut self.bodies,
                &mut self.contacts,
                &self.joints,
                &mut listener,
            );
        }

        if step.dt > 0.0 {
            self.solve(&step);
        }

        if self.continuous_physics && step.dt > 0.0 {
            self.solve_toi(&step);
        }

        if step.dt > 0.0 {
            self.inv_dt0 = step.inv_dt;
        }

        self.clear_forces();
    }

    /// Steps with the default iteration counts
    pub fn step_default(&mut self, dt: f64) {
        self.step(dt, DEFAULT_VELOCITY_ITERATIONS, DEFAULT_POSITION_ITERATIONS);
    }

    /// Zeroes all force and torque accumulators
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.force = Vec2::zero();
            body.torque = 0.0;
        }
    }

    /// Discrete island solve over all awake bodies
    fn solve(&mut self, step: &TimeStep) {
        // Clear island flags.
        for (_, body) in self.bodies.iter_mut() {
            body.flags.remove(BodyFlags::ISLAND);
        }
        for (_, contact) in self.contacts.iter_mut() {
            contact.flags.remove(ContactFlags::ISLAND);
        }
        let joint_slots = self
            .joints
            .handles()
            .iter()
            .map(|h| h.index as usize + 1)
            .max()
            .unwrap_or(0);
        let mut joint_in_island = vec![false; joint_slots];

        let mut island = Island::new();
        let mut stack: Vec<BodyHandle> = Vec::new();

        let seeds = self.bodies.handles();
        for seed in seeds {
            {
                let body = self.bodies.get(seed).unwrap();
                if body.flags.contains(BodyFlags::ISLAND)
                    || !body.is_awake()
                    || !body.is_active()
                    || body.body_type() == BodyType::Static
                {
                    continue;
                }
            }

            // Grow one island by depth-first search on the constraint graph.
            island.clear();
            stack.clear();
            stack.push(seed);
            self.bodies
                .get_mut(seed)
                .unwrap()
                .flags
                .insert(BodyFlags::ISLAND);

            while let Some(body_handle) = stack.pop() {
                let (body_type, contact_edges, joint_edges) = {
                    let body = self.bodies.get_mut(body_handle).unwrap();
                    debug_assert!(body.is_active());
                    body.island_index = island.bodies.len();
                    // A body in an island must stay alert while the island
                    // solves.
                    body.set_awake(true);
                    (
                        body.body_type(),
                        body.contact_edges.clone(),
                        body.joint_edges.clone(),
                    )
                };
                island.bodies.push(body_handle);

                // Static bodies anchor islands but never propagate them.
                if body_type == BodyType::Static {
                    continue;
                }

                for edge in &contact_edges {
                    let include = {
                        match self.contacts.get(edge.contact) {
                            Some(contact) => {
                                !contact.flags.contains(ContactFlags::ISLAND)
                                    && contact.is_enabled()
                                    && contact.is_touching()
                                    && !self.is_sensor_contact(contact)
                            }
                            None => false,
                        }
                    };
                    if !include {
                        continue;
                    }

                    self.contacts
                        .get_mut(edge.contact)
                        .unwrap()
                        .flags
                        .insert(ContactFlags::ISLAND);
                    island.contacts.push(edge.contact);

                    let other = edge.other;
                    let other_in_island = self
                        .bodies
                        .get(other)
                        .map(|b| b.flags.contains(BodyFlags::ISLAND))
                        .unwrap_or(true);
                    if !other_in_island {
                        self.bodies
                            .get_mut(other)
                            .unwrap()
                            .flags
                            .insert(BodyFlags::ISLAND);
                        stack.push(other);
                    }
                }

                for edge in &joint_edges {
                    let joint_index = edge.joint.index as usize;
                    if joint_in_island[joint_index] {
                        continue;
                    }
                    let other_active = self
                        .bodies
                        .get(edge.other)
                        .map(|b| b.is_active())
                        .unwrap_or(false);
                    if !other_active {
                        continue;
                    }

                    joint_in_island[joint_index] = true;
                    island.joints.push(edge.joint);

                    let other_in_island = self
                        .bodies
                        .get(edge.other)
                        .map(|b| b.flags.contains(BodyFlags::ISLAND))
                        .unwrap_or(true);
                    if !other_in_island {
                        self.bodies
                            .get_mut(edge.other)
                            .unwrap()
                            .flags
                            .insert(BodyFlags::ISLAND);
                        stack.push(edge.other);
                    }
                }
            }

            {
                let mut listener = self.contact_listener.as_deref_mut();
                solve_island(
                    &island,
                    step,
                    self.gravity,
                    self.allow_sleep,
                    &mut self.bodies,
                    &mut self.contacts,
                    &mut self.joints,
                    &mut listener,
                );
            }

            // Allow static bodies to participate in other islands.
            for &handle in &island.bodies {
                let body = self.bodies.get_mut(handle).unwrap();
                if body.body_type() == BodyType::Static {
                    body.flags.remove(BodyFlags::ISLAND);
                }
            }
        }

        // Synchronize moved fixtures back into the tree and refresh pairs.
        let handles = self.bodies.handles();
        for handle in handles {
            let moved = {
                let body = self.bodies.get(handle).unwrap();
                body.flags.contains(BodyFlags::ISLAND) && body.body_type() != BodyType::Static
            };
            if moved {
                self.synchronize_fixtures(handle);
            }
        }

        self.contact_manager
            .find_new_contacts(&mut self.bodies, &mut self.contacts, &self.joints);
    }

    fn is_sensor_contact(&self, contact: &Contact) -> bool {
        let sensor_a = self
            .bodies
            .get(contact.fixture_a.body)
            .and_then(|b| b.fixture(contact.fixture_a.id))
            .map(|f| f.is_sensor)
            .unwrap_or(false);
        let sensor_b = self
            .bodies
            .get(contact.fixture_b.body)
            .and_then(|b| b.fixture(contact.fixture_b.id))
            .map(|f| f.is_sensor)
            .unwrap_or(false);
        sensor_a || sensor_b
    }

    /// Updates the broad-phase proxies of a body's fixtures from its sweep
    fn synchronize_fixtures(&mut self, handle: BodyHandle) {
        let (xf1, xf2, fixture_data) = {
            let body = self.bodies.get(handle).unwrap();
            let xf1 = body.sweep.transform_at(0.0);
            let xf2 = body.xf;
            let data: Vec<(u32, usize)> = body
                .fixtures
                .iter()
                .flat_map(|f| {
                    f.proxies
                        .iter()
                        .map(move |p| (f.id, p.child_index))
                })
                .collect();
            (xf1, xf2, data)
        };

        for (fixture_id, child) in fixture_data {
            let (shape, proxy_id) = {
                let body = self.bodies.get(handle).unwrap();
                let fixture = body.fixture(fixture_id).unwrap();
                (fixture.shape.clone(), fixture.proxies[child].proxy_id)
            };

            // Cover the swept motion of the child with one box.
            let aabb1 = shape.compute_aabb(&xf1, child);
            let aabb2 = shape.compute_aabb(&xf2, child);
            let aabb = aabb1.combine(&aabb2);
            let displacement = aabb2.center() - aabb1.center();

            self.contact_manager
                .broad_phase
                .move_proxy(proxy_id, aabb, displacement);

            let body = self.bodies.get_mut(handle).unwrap();
            let fixture = body.fixture_mut(fixture_id).unwrap();
            fixture.proxies[child].aabb = aabb;
        }
    }

    /// Continuous collision pass: advances the earliest impacts through
    /// sub-steps so bullets cannot tunnel through static geometry
    fn solve_toi(&mut self, step: &TimeStep) {
        for (_, body) in self.bodies.iter_mut() {
            body.flags.remove(BodyFlags::ISLAND);
            body.sweep.alpha0 = 0.0;
        }
        for (_, contact) in self.contacts.iter_mut() {
            contact.flags.remove(ContactFlags::ISLAND | ContactFlags::TOI);
            contact.toi_count = 0;
            contact.toi = 1.0;
        }

        // Find TOI events and solve them in order of time.
        loop {
            let mut min_contact: Option<ContactHandle> = None;
            let mut min_alpha = 1.0;

            let contact_handles = self.contacts.handles();
            for handle in contact_handles {
                let alpha = match self.compute_contact_toi(handle) {
                    Some(alpha) => alpha,
                    None => continue,
                };

                if alpha < min_alpha {
                    min_contact = Some(handle);
                    min_alpha = alpha;
                }
            }

            let min_contact = match min_contact {
                Some(c) if min_alpha < 1.0 - 10.0 * crate::math::EPSILON => c,
                _ => break,
            };

            // Advance the impact pair to the TOI and re-collide.
            let (handle_a, handle_b) = {
                let contact = self.contacts.get(min_contact).unwrap();
                (contact.fixture_a.body, contact.fixture_b.body)
            };

            let backup_a = self.bodies.get(handle_a).unwrap().sweep;
            let backup_b = self.bodies.get(handle_b).unwrap().sweep;

            self.bodies.get_mut(handle_a).unwrap().advance(min_alpha);
            self.bodies.get_mut(handle_b).unwrap().advance(min_alpha);

            self.update_single_contact(min_contact);
            {
                let contact = self.contacts.get_mut(min_contact).unwrap();
                contact.flags.remove(ContactFlags::TOI);
                contact.toi_count += 1;
            }

            let (enabled, touching) = {
                let contact = self.contacts.get(min_contact).unwrap();
                (contact.is_enabled(), contact.is_touching())
            };

            if !enabled || !touching {
                // The advance was wrong; restore the sweeps and look again.
                let contact = self.contacts.get_mut(min_contact).unwrap();
                contact.set_enabled(false);
                let body_a = self.bodies.get_mut(handle_a).unwrap();
                body_a.sweep = backup_a;
                body_a.synchronize_transform();
                let body_b = self.bodies.get_mut(handle_b).unwrap();
                body_b.sweep = backup_b;
                body_b.synchronize_transform();
                continue;
            }

            self.bodies.get_mut(handle_a).unwrap().set_awake(true);
            self.bodies.get_mut(handle_b).unwrap().set_awake(true);

            // Build a minimal island: the impact pair plus contacts touching
            // either body.
            let mut island = Island::new();

            {
                let body_a = self.bodies.get_mut(handle_a).unwrap();
                body_a.flags.insert(BodyFlags::ISLAND);
                body_a.island_index = island.bodies.len();
                island.bodies.push(handle_a);
            }
            {
                let body_b = self.bodies.get_mut(handle_b).unwrap();
                body_b.flags.insert(BodyFlags::ISLAND);
                body_b.island_index = island.bodies.len();
                island.bodies.push(handle_b);
            }
            {
                let contact = self.contacts.get_mut(min_contact).unwrap();
                contact.flags.insert(ContactFlags::ISLAND);
                island.contacts.push(min_contact);
            }

            for seed in [handle_a, handle_b] {
                let body_type = self.bodies.get(seed).unwrap().body_type();
                if body_type != BodyType::Dynamic {
                    continue;
                }

                let edges = self.bodies.get(seed).unwrap().contact_edges.clone();
                for edge in edges {
                    if island.contacts.len() >= MAX_TOI_CONTACTS {
                        break;
                    }

                    let contact_handle = edge.contact;
                    let skip = {
                        match self.contacts.get(contact_handle) {
                            Some(contact) => contact.flags.contains(ContactFlags::ISLAND),
                            None => true,
                        }
                    };
                    if skip {
                        continue;
                    }

                    // Only bullets expand TOI islands through dynamic pairs.
                    let other = edge.other;
                    let other_type = self.bodies.get(other).unwrap().body_type();
                    let seed_bullet = self.bodies.get(seed).unwrap().is_bullet();
                    let other_bullet = self.bodies.get(other).unwrap().is_bullet();
                    if other_type == BodyType::Dynamic && !seed_bullet && !other_bullet {
                        continue;
                    }

                    if self.is_sensor_contact(self.contacts.get(contact_handle).unwrap()) {
                        continue;
                    }

                    // Tentatively advance the other body to the TOI.
                    let backup = self.bodies.get(other).unwrap().sweep;
                    let other_advanced = self
                        .bodies
                        .get(other)
                        .unwrap()
                        .flags
                        .contains(BodyFlags::ISLAND);
                    if !other_advanced {
                        self.bodies.get_mut(other).unwrap().advance(min_alpha);
                    }

                    self.update_single_contact(contact_handle);

                    let (enabled, touching) = {
                        let contact = self.contacts.get(contact_handle).unwrap();
                        (contact.is_enabled(), contact.is_touching())
                    };
                    if !enabled || !touching {
                        if !other_advanced {
                            let body = self.bodies.get_mut(other).unwrap();
                            body.sweep = backup;
                            body.synchronize_transform();
                        }
                        continue;
                    }

                    self.contacts
                        .get_mut(contact_handle)
                        .unwrap()
                        .flags
                        .insert(ContactFlags::ISLAND);
                    island.contacts.push(contact_handle);

                    let other_in_island = self
                        .bodies
                        .get(other)
                        .unwrap()
                        .flags
                        .contains(BodyFlags::ISLAND);
                    if other_in_island {
                        continue;
                    }

                    let body = self.bodies.get_mut(other).unwrap();
                    body.flags.insert(BodyFlags::ISLAND);
                    if body.body_type() != BodyType::Static {
                        body.set_awake(true);
                    }
                    body.island_index = island.bodies.len();
                    island.bodies.push(other);
                }
            }

            let dt = (1.0 - min_alpha) * step.dt;
            let sub_step = TimeStep {
                dt,
                inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
                dt_ratio: 1.0,
                velocity_iterations: step.velocity_iterations,
                position_iterations: 20,
                warm_starting: false,
            };

            {
                let toi_index_a = self.bodies.get(handle_a).unwrap().island_index;
                let toi_index_b = self.bodies.get(handle_b).unwrap().island_index;
                let mut listener = self.contact_listener.as_deref_mut();
                solve_toi_island(
                    &island,
                    &sub_step,
                    toi_index_a,
                    toi_index_b,
                    &mut self.bodies,
                    &mut self.contacts,
                    &mut listener,
                );
            }

            // Reset island flags and synchronize the moved bodies' proxies.
            for &body_handle in &island.bodies {
                let is_dynamic = {
                    let body = self.bodies.get_mut(body_handle).unwrap();
                    body.flags.remove(BodyFlags::ISLAND);
                    body.body_type() == BodyType::Dynamic
                };
                if !is_dynamic {
                    continue;
                }

                self.synchronize_fixtures(body_handle);

                // Invalidate TOIs stored on this body's contacts; the body
                // moved, so they must be recomputed.
                let edges = self.bodies.get(body_handle).unwrap().contact_edges.clone();
                for edge in edges {
                    if let Some(contact) = self.contacts.get_mut(edge.contact) {
                        contact.flags.remove(ContactFlags::TOI | ContactFlags::ISLAND);
                    }
                }
            }

            // The moved bodies may have created new overlaps.
            self.contact_manager
                .find_new_contacts(&mut self.bodies, &mut self.contacts, &self.joints);
        }
    }

    /// Computes the alpha at which a contact pair first touches this step,
    /// or None when the pair is not a continuous candidate
    fn compute_contact_toi(&mut self, handle: ContactHandle) -> Option<f64> {
        let (fixture_a, fixture_b, child_a, child_b) = {
            let contact = self.contacts.get(handle)?;

            if !contact.is_enabled() || contact.toi_count > MAX_SUB_STEPS {
                return None;
            }
            if contact.flags.contains(ContactFlags::TOI) {
                return Some(contact.toi);
            }

            (
                contact.fixture_a,
                contact.fixture_b,
                contact.child_a,
                contact.child_b,
            )
        };

        // Is at least one body active and either a bullet or non-dynamic?
        let alpha0 = {
            let body_a = self.bodies.get(fixture_a.body)?;
            let body_b = self.bodies.get(fixture_b.body)?;

            let sensor_a = body_a.fixture(fixture_a.id)?.is_sensor;
            let sensor_b = body_b.fixture(fixture_b.id)?.is_sensor;
            if sensor_a || sensor_b {
                return None;
            }

            let type_a = body_a.body_type();
            let type_b = body_b.body_type();
            debug_assert!(type_a == BodyType::Dynamic || type_b == BodyType::Dynamic);

            let active_a = body_a.is_awake() && type_a != BodyType::Static;
            let active_b = body_b.is_awake() && type_b != BodyType::Static;
            if !active_a && !active_b {
                return None;
            }

            let collide_a = body_a.is_bullet() || type_a != BodyType::Dynamic;
            let collide_b = body_b.is_bullet() || type_b != BodyType::Dynamic;
            if !collide_a && !collide_b {
                return None;
            }

            // Both sweeps must share a starting alpha for the root finder.
            let alpha0 = body_a.sweep.alpha0.max(body_b.sweep.alpha0);
            debug_assert!(alpha0 < 1.0);
            alpha0
        };

        // Advance the lagging sweep in place so later queries start from
        // the same base.
        if self.bodies.get(fixture_a.body)?.sweep.alpha0 < alpha0 {
            self.bodies.get_mut(fixture_a.body)?.sweep.advance(alpha0);
        }
        if self.bodies.get(fixture_b.body)?.sweep.alpha0 < alpha0 {
            self.bodies.get_mut(fixture_b.body)?.sweep.advance(alpha0);
        }

        let input = {
            let body_a = self.bodies.get(fixture_a.body)?;
            let body_b = self.bodies.get(fixture_b.body)?;
            ToiInput {
                proxy_a: DistanceProxy::from_shape(&body_a.fixture(fixture_a.id)?.shape, child_a),
                proxy_b: DistanceProxy::from_shape(&body_b.fixture(fixture_b.id)?.shape, child_b),
                sweep_a: body_a.sweep,
                sweep_b: body_b.sweep,
                t_max: 1.0,
            }
        };

        let output = time_of_impact(&input);

        // Beta is the fraction of the remaining portion of the sweep.
        let alpha = if output.state == ToiState::Touching {
            (alpha0 + (1.0 - alpha0) * output.t).min(1.0)
        } else {
            1.0
        };

        let contact = self.contacts.get_mut(handle).unwrap();
        contact.toi = alpha;
        contact.flags.insert(ContactFlags::TOI);

        Some(alpha)
    }

    /// Runs the narrow phase on one contact outside the manager loop
    fn update_single_contact(&mut self, handle: ContactHandle) {
        let (fixture_a, fixture_b) = {
            let contact = self.contacts.get(handle).unwrap();
            (contact.fixture_a, contact.fixture_b)
        };

        let (shape_a, xf_a, sensor_a) = {
            let body = self.bodies.get(fixture_a.body).unwrap();
            let fixture = body.fixture(fixture_a.id).unwrap();
            (fixture.shape.clone(), body.xf, fixture.is_sensor)
        };
        let (shape_b, xf_b, sensor_b) = {
            let body = self.bodies.get(fixture_b.body).unwrap();
            let fixture = body.fixture(fixture_b.id).unwrap();
            (fixture.shape.clone(), body.xf, fixture.is_sensor)
        };

        let mut listener = self.contact_listener.as_deref_mut();
        let contact = self.contacts.get_mut(handle).unwrap();
        contact.update(
            handle,
            &shape_a,
            &xf_a,
            &shape_b,
            &xf_b,
            sensor_a || sensor_b,
            &mut listener,
        );
    }

    // === Queries ===

    /// Reports every fixture whose fat AABB overlaps the query box.
    /// The callback returns false to stop the query.
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.query(aabb, |proxy_id| {
            match broad_phase.user_data(proxy_id) {
                Some(key) => callback(key.fixture),
                None => true,
            }
        });
    }

    /// Casts a ray from `p1` to `p2`, reporting each fixture hit.
    ///
    /// The callback controls the traversal: ignore the fixture, terminate,
    /// clip the ray at the hit, or continue unchanged. Fixtures are not
    /// reported in distance order; clip to find the closest.
    pub fn ray_cast(
        &self,
        p1: Vec2,
        p2: Vec2,
        mut callback: impl FnMut(FixtureHandle, Vec2, Vec2, f64) -> RayCastBehavior,
    ) {
        let input = RayCastInput {
            p1,
            p2,
            max_fraction: 1.0,
        };

        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.ray_cast(&input, |sub_input, proxy_id| {
            let key = match broad_phase.user_data(proxy_id) {
                Some(key) => key,
                None => return sub_input.max_fraction,
            };

            let body = match self.bodies.get(key.fixture.body) {
                Some(b) => b,
                None => return sub_input.max_fraction,
            };
            let fixture = match body.fixture(key.fixture.id) {
                Some(f) => f,
                None => return sub_input.max_fraction,
            };

            let output = fixture
                .shape
                .ray_cast(sub_input, &body.transform(), key.child);

            match output {
                Some(hit) => {
                    let point = p1 + (p2 - p1) * hit.fraction;
                    match callback(key.fixture, point, hit.normal, hit.fraction) {
                        RayCastBehavior::Ignore => -1.0,
                        RayCastBehavior::Terminate => 0.0,
                        RayCastBehavior::Clip(fraction) => fraction,
                        RayCastBehavior::Continue => sub_input.max_fraction,
                    }
                }
                None => sub_input.max_fraction,
            }
        });
    }

    /// Validates the broad-phase tree invariants; used by tests
    pub fn validate_broad_phase(&self) {
        self.contact_manager.broad_phase.tree().validate();
    }
}
