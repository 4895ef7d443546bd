//! Global tuning constants in meters-kilograms-seconds units.

/// The maximum number of contact points between two convex shapes
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// The maximum number of vertices on a convex polygon
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Fattening applied to AABBs in the dynamic tree so proxies can move by a
/// small amount without triggering a tree adjustment. In meters.
pub const AABB_EXTENSION: f64 = 0.1;

/// Dimensionless multiplier used to predict a moving proxy's future AABB
/// from its displacement
pub const AABB_MULTIPLIER: f64 = 4.0;

/// A small length used as a collision and constraint tolerance. Chosen to be
/// numerically significant but visually insignificant. In meters.
pub const LINEAR_SLOP: f64 = 0.005;

/// A small angle used as a collision and constraint tolerance
pub const ANGULAR_SLOP: f64 = 2.0 / 180.0 * std::f64::consts::PI;

/// The radius of the polygon/edge shape skin. Making this smaller leaves
/// polygons an insufficient buffer for continuous collision; making it larger
/// creates artifacts at vertex collisions.
pub const POLYGON_RADIUS: f64 = 2.0 * LINEAR_SLOP;

/// Maximum number of continuous-collision sub-steps per body per step
pub const MAX_SUB_STEPS: usize = 8;

/// Maximum number of contacts handled when solving a single TOI impact
pub const MAX_TOI_CONTACTS: usize = 32;

/// Maximum iterations of the outer time-of-impact root finder
pub const MAX_TOI_ITERATIONS: usize = 20;

/// Maximum iterations of the scalar root finder inside a TOI step
pub const MAX_TOI_ROOT_ITERATIONS: usize = 50;

/// Maximum iterations of the GJK distance algorithm
pub const MAX_DISTANCE_ITERATIONS: usize = 20;

/// A relative velocity below which restitution is ignored. Meters/second.
pub const VELOCITY_THRESHOLD: f64 = 1.0;

/// The maximum linear position correction applied per solver iteration.
/// Prevents overshoot. In meters.
pub const MAX_LINEAR_CORRECTION: f64 = 0.2;

/// The maximum angular position correction applied per solver iteration
pub const MAX_ANGULAR_CORRECTION: f64 = 8.0 / 180.0 * std::f64::consts::PI;

/// The maximum linear translation of a body per step. Guards against
/// numerical problems; normally never reached.
pub const MAX_TRANSLATION: f64 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f64 = MAX_TRANSLATION * MAX_TRANSLATION;

/// The maximum rotation of a body per step
pub const MAX_ROTATION: f64 = 0.5 * std::f64::consts::PI;
pub const MAX_ROTATION_SQUARED: f64 = MAX_ROTATION * MAX_ROTATION;

/// Scale factor controlling how fast penetration is resolved. Values close
/// to 1 often overshoot.
pub const BAUMGARTE: f64 = 0.2;
pub const TOI_BAUMGARTE: f64 = 0.75;

/// The time a body must be still before it is put to sleep. Seconds.
pub const TIME_TO_SLEEP: f64 = 0.5;

/// A body cannot sleep if its linear velocity is above this tolerance
pub const LINEAR_SLEEP_TOLERANCE: f64 = 0.01;

/// A body cannot sleep if its angular velocity is above this tolerance
pub const ANGULAR_SLEEP_TOLERANCE: f64 = 2.0 / 180.0 * std::f64::consts::PI;

/// Default number of velocity iterations per island solve
pub const DEFAULT_VELOCITY_ITERATIONS: usize = 8;

/// Default number of position iterations per island solve
pub const DEFAULT_POSITION_ITERATIONS: usize = 3;
