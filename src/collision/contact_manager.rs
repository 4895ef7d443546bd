use crate::bodies::{Body, BodyType, ContactEdge};
use crate::collision::broad_phase::BroadPhase;
use crate::collision::contact::{mix_friction, mix_restitution, should_swap, Contact, ContactFlags};
use crate::constraints::Joint;
use crate::core::events::ContactListener;
use crate::core::{Arena, BodyHandle, ContactHandle, FixtureHandle, JointHandle};

/// Broad-phase user data: one fixture child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureProxyKey {
    pub fixture: FixtureHandle,
    pub child: usize,
}

/// Owns the broad phase and drives the contact lifecycle.
///
/// `find_new_contacts` consumes broad-phase pairs into persistent contacts;
/// `collide` re-filters, destroys separated pairs, and runs the narrow
/// phase on the rest.
pub struct ContactManager {
    pub(crate) broad_phase: BroadPhase<FixtureProxyKey>,
}

impl ContactManager {
    /// Creates an empty manager
    pub fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
        }
    }

    /// Creates contacts for new broad-phase pairs.
    ///
    /// Pairs are rejected when they share a body, an existing contact, a
    /// joint that forbids connected collision, a filter mismatch, or two
    /// non-dynamic bodies.
    pub fn find_new_contacts(
        &mut self,
        bodies: &mut Arena<Body, BodyHandle>,
        contacts: &mut Arena<Contact, ContactHandle>,
        joints: &Arena<Joint, JointHandle>,
    ) {
        let mut pairs: Vec<(FixtureProxyKey, FixtureProxyKey)> = Vec::new();
        self.broad_phase.update_pairs(|a, b| pairs.push((a, b)));

        for (key_a, key_b) in pairs {
            let mut fixture_a = key_a.fixture;
            let mut fixture_b = key_b.fixture;
            let mut child_a = key_a.child;
            let mut child_b = key_b.child;

            // Fixtures on the same body do not collide.
            if fixture_a.body == fixture_b.body {
                continue;
            }

            // An existing contact on this exact fixture/child pair means
            // the broad phase re-reported a known overlap.
            let body_a_ref = match bodies.get(fixture_a.body) {
                Some(b) => b,
                None => continue,
            };
            let mut exists = false;
            for edge in &body_a_ref.contact_edges {
                if edge.other != fixture_b.body {
                    continue;
                }
                if let Some(contact) = contacts.get(edge.contact) {
                    let fa = contact.fixture_a;
                    let fb = contact.fixture_b;
                    let ca = contact.child_a;
                    let cb = contact.child_b;
                    if (fa == fixture_a && fb == fixture_b && ca == child_a && cb == child_b)
                        || (fa == fixture_b && fb == fixture_a && ca == child_b && cb == child_a)
                    {
                        exists = true;
                        break;
                    }
                }
            }
            if exists {
                continue;
            }

            if !Self::bodies_should_collide(bodies, joints, fixture_a.body, fixture_b.body) {
                continue;
            }

            // Check fixture filters.
            let (filter_a, type_a, friction_a, restitution_a) = {
                let body = bodies.get(fixture_a.body).unwrap();
                let f = match body.fixture(fixture_a.id) {
                    Some(f) => f,
                    None => continue,
                };
                (f.filter, f.shape.shape_type(), f.friction, f.restitution)
            };
            let (filter_b, type_b, friction_b, restitution_b) = {
                let body = bodies.get(fixture_b.body).unwrap();
                let f = match body.fixture(fixture_b.id) {
                    Some(f) => f,
                    None => continue,
                };
                (f.filter, f.shape.shape_type(), f.friction, f.restitution)
            };

            if !filter_a.should_collide(&filter_b) {
                continue;
            }

            // Canonicalize so the reference shape sits in slot A.
            if should_swap(type_a, type_b) {
                std::mem::swap(&mut fixture_a, &mut fixture_b);
                std::mem::swap(&mut child_a, &mut child_b);
            }

            let contact = Contact::new(
                fixture_a,
                child_a,
                fixture_b,
                child_b,
                mix_friction(friction_a, friction_b),
                mix_restitution(restitution_a, restitution_b),
            );
            let handle = contacts.insert(contact);

            // Connect to the bodies' contact adjacency.
            if let Some(body_a) = bodies.get_mut(fixture_a.body) {
                body_a.contact_edges.push(ContactEdge {
                    other: fixture_b.body,
                    contact: handle,
                });
            }
            if let Some(body_b) = bodies.get_mut(fixture_b.body) {
                body_b.contact_edges.push(ContactEdge {
                    other: fixture_a.body,
                    contact: handle,
                });
            }
        }
    }

    /// Returns whether a contact may exist between two bodies: at least one
    /// must be dynamic and no connecting joint may forbid it
    pub fn bodies_should_collide(
        bodies: &Arena<Body, BodyHandle>,
        joints: &Arena<Joint, JointHandle>,
        handle_a: BodyHandle,
        handle_b: BodyHandle,
    ) -> bool {
        let body_a = match bodies.get(handle_a) {
            Some(b) => b,
            None => return false,
        };
        let body_b = match bodies.get(handle_b) {
            Some(b) => b,
            None => return false,
        };

        if body_a.body_type() != BodyType::Dynamic && body_b.body_type() != BodyType::Dynamic {
            return false;
        }

        // Joints with collide_connected unset suppress contact between
        // their bodies.
        for edge in &body_a.joint_edges {
            if edge.other == handle_b {
                if let Some(joint) = joints.get(edge.joint) {
                    if !joint.collide_connected() {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Destroys a contact, unlinking it from both bodies.
    /// Emits `end_contact` when the contact was touching.
    pub fn destroy_contact<'a>(
        bodies: &mut Arena<Body, BodyHandle>,
        contacts: &mut Arena<Contact, ContactHandle>,
        handle: ContactHandle,
        listener: &mut Option<&'a mut dyn ContactListener>,
    ) {
        let contact = match contacts.get_mut(handle) {
            Some(c) => c,
            None => return,
        };

        if contact.is_touching() {
            if let Some(listener) = listener.as_deref_mut() {
                listener.end_contact(handle, contact);
            }
            // A vanishing touching contact should not leave either body
            // asleep on top of a stale impulse.
            let body_a = contact.fixture_a.body;
            let body_b = contact.fixture_b.body;
            if let Some(body) = bodies.get_mut(body_a) {
                body.set_awake(true);
            }
            if let Some(body) = bodies.get_mut(body_b) {
                body.set_awake(true);
            }
        }

        let body_a = contact.fixture_a.body;
        let body_b = contact.fixture_b.body;

        if let Some(body) = bodies.get_mut(body_a) {
            body.contact_edges.retain(|e| e.contact != handle);
        }
        if let Some(body) = bodies.get_mut(body_b) {
            body.contact_edges.retain(|e| e.contact != handle);
        }

        contacts.remove(handle);
    }

    /// Narrow-phase pass over all contacts.
    ///
    /// Re-checks filtering where flagged, destroys contacts whose fat AABBs
    /// no longer overlap, and updates manifolds on the rest, reporting
    /// begin/end transitions to the listener.
    pub fn collide<'a>(
        &mut self,
        bodies: &mut Arena<Body, BodyHandle>,
        contacts: &mut Arena<Contact, ContactHandle>,
        joints: &Arena<Joint, JointHandle>,
        listener: &mut Option<&'a mut dyn ContactListener>,
    ) {
        let handles = contacts.handles();

        for handle in handles {
            let (fixture_a, fixture_b, child_a, child_b, check_filter) = {
                let contact = match contacts.get(handle) {
                    Some(c) => c,
                    None => continue,
                };
                (
                    contact.fixture_a,
                    contact.fixture_b,
                    contact.child_a,
                    contact.child_b,
                    contact.flags.contains(ContactFlags::FILTER),
                )
            };

            if check_filter {
                let mut destroy = !Self::bodies_should_collide(
                    bodies,
                    joints,
                    fixture_a.body,
                    fixture_b.body,
                );

                if !destroy {
                    let filter_a = bodies
                        .get(fixture_a.body)
                        .and_then(|b| b.fixture(fixture_a.id))
                        .map(|f| f.filter);
                    let filter_b = bodies
                        .get(fixture_b.body)
                        .and_then(|b| b.fixture(fixture_b.id))
                        .map(|f| f.filter);
                    destroy = match (filter_a, filter_b) {
                        (Some(fa), Some(fb)) => !fa.should_collide(&fb),
                        _ => true,
                    };
                }

                if destroy {
                    log::debug!("contact {:?} dropped by filter change", handle);
                    Self::destroy_contact(bodies, contacts, handle, listener);
                    continue;
                }

                if let Some(contact) = contacts.get_mut(handle) {
                    contact.flags.remove(ContactFlags::FILTER);
                }
            }

            // Skip pairs where neither body can move this step.
            let (active_a, xf_a) = match bodies.get(fixture_a.body) {
                Some(b) => (b.is_awake() && b.body_type() != BodyType::Static, b.xf),
                None => continue,
            };
            let (active_b, xf_b) = match bodies.get(fixture_b.body) {
                Some(b) => (b.is_awake() && b.body_type() != BodyType::Static, b.xf),
                None => continue,
            };

            if !active_a && !active_b {
                continue;
            }

            // AABB separation ends the contact.
            let (proxy_a, sensor_a, shape_a) = {
                let body = bodies.get(fixture_a.body).unwrap();
                let f = match body.fixture(fixture_a.id) {
                    Some(f) => f,
                    None => continue,
                };
                (f.proxies[child_a].proxy_id, f.is_sensor, f.shape.clone())
            };
            let (proxy_b, sensor_b, shape_b) = {
                let body = bodies.get(fixture_b.body).unwrap();
                let f = match body.fixture(fixture_b.id) {
                    Some(f) => f,
                    None => continue,
                };
                (f.proxies[child_b].proxy_id, f.is_sensor, f.shape.clone())
            };

            if !self.broad_phase.test_overlap(proxy_a, proxy_b) {
                Self::destroy_contact(bodies, contacts, handle, listener);
                continue;
            }

            let sensor = sensor_a || sensor_b;
            let (began, ended) = {
                let contact = contacts.get_mut(handle).unwrap();
                contact.update(handle, &shape_a, &xf_a, &shape_b, &xf_b, sensor, listener)
            };

            // Touch transitions wake both bodies.
            if began || ended {
                if let Some(body) = bodies.get_mut(fixture_a.body) {
                    body.set_awake(true);
                }
                if let Some(body) = bodies.get_mut(fixture_b.body) {
                    body.set_awake(true);
                }
            }
        }
    }
}

impl Default for ContactManager {
    fn default() -> Self {
        Self::new()
    }
}
