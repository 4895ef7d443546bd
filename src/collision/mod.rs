mod broad_phase;
mod collide_circle;
mod collide_edge;
mod collide_polygon;
mod contact;
mod contact_manager;
pub(crate) mod contact_solver;
mod dynamic_tree;
pub mod distance;
pub mod manifold;
pub mod time_of_impact;

pub use broad_phase::{BroadPhase, ProxyPair};
pub use collide_circle::{collide_circles, collide_polygon_and_circle};
pub use collide_edge::{collide_edge_and_circle, collide_edge_and_polygon};
pub use collide_polygon::collide_polygons;
pub use contact::{mix_friction, mix_restitution, Contact, ContactFlags};
pub use contact_manager::{ContactManager, FixtureProxyKey};
pub use distance::{distance, test_overlap, DistanceInput, DistanceOutput, DistanceProxy, SimplexCache};
pub use dynamic_tree::{DynamicTree, NULL_NODE};
pub use manifold::{
    clip_segment_to_line, ClipVertex, ContactId, FeatureType, Manifold, ManifoldPoint,
    ManifoldType, WorldManifold,
};
pub use time_of_impact::{time_of_impact, ToiInput, ToiOutput, ToiState};
