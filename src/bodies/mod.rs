mod body;
mod fixture;

pub use body::{Body, BodyDef, BodyFlags, BodyType, ContactEdge, JointEdge};
pub use fixture::{Filter, Fixture, FixtureDef, FixtureProxy};
