use crate::math::Aabb;
use crate::shapes::Shape;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Collision filtering data attached to a fixture.
///
/// Two fixtures with the same positive group index always collide; the same
/// negative group index never collide; otherwise the category/mask bits of
/// both sides must accept each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Filter {
    /// Category bits this fixture belongs to
    pub category_bits: u16,

    /// Mask of categories this fixture collides with
    pub mask_bits: u16,

    /// Collision group override; see type docs
    pub group_index: i16,
}

impl Filter {
    /// Returns whether two filters accept collision with each other
    pub fn should_collide(&self, other: &Filter) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }

        (self.mask_bits & other.category_bits) != 0 && (self.category_bits & other.mask_bits) != 0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
            group_index: 0,
        }
    }
}

/// Definition used to create a fixture on a body
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FixtureDef {
    /// The collision shape
    pub shape: Shape,

    /// Mass density, in kilograms per square meter
    pub density: f64,

    /// Coulomb friction coefficient, usually in [0, 1]
    pub friction: f64,

    /// Restitution (bounciness), usually in [0, 1]
    pub restitution: f64,

    /// Whether the fixture detects contacts without generating a response
    pub is_sensor: bool,

    /// Collision filtering data
    pub filter: Filter,
}

impl FixtureDef {
    /// Creates a definition for the given shape with default material
    /// properties
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            is_sensor: false,
            filter: Filter::default(),
        }
    }
}

/// One broad-phase proxy of a fixture child
#[derive(Debug, Clone)]
pub struct FixtureProxy {
    /// The child's tight AABB at the last synchronization
    pub aabb: Aabb,

    /// Tree node id in the broad phase
    pub proxy_id: i32,

    /// Which child of the shape this proxy covers
    pub child_index: usize,
}

/// A shape attached to a body, with material and filtering properties.
///
/// Each shape child owns one broad-phase proxy;
/// `proxies.len() == shape.child_count()` whenever the fixture is attached
/// to an active body.
#[derive(Debug)]
pub struct Fixture {
    /// Body-local fixture id, stable for the life of the fixture
    pub(crate) id: u32,

    /// The collision shape. Shared ownership is unnecessary: the fixture is
    /// the only owner and shapes are cloned into it at creation.
    pub shape: Shape,

    /// Mass density
    pub density: f64,

    /// Friction coefficient
    pub friction: f64,

    /// Restitution coefficient
    pub restitution: f64,

    /// Whether this fixture is a sensor
    pub is_sensor: bool,

    /// Collision filtering data
    pub filter: Filter,

    /// Broad-phase proxies, one per shape child
    pub(crate) proxies: Vec<FixtureProxy>,
}

impl Fixture {
    pub(crate) fn new(id: u32, def: FixtureDef) -> Self {
        Self {
            id,
            shape: def.shape,
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            filter: def.filter,
            proxies: Vec::new(),
        }
    }

    /// Returns the body-local id of this fixture
    pub fn id(&self) -> u32 {
        self.id
    }
}
