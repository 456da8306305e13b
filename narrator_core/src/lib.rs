//! Route Narrator Core - geofenced sequential-announcement engine
//!
//! Narrates points of interest ("markers") in order as a moving position
//! advances along a transit route:
//! 1. **Geometry**: haversine distance and initial bearing on a spherical earth
//! 2. **Proximity**: nearest route point and the on-route decision
//! 3. **Sequence**: ordered, at-most-once marker playback with mid-route joins
//! 4. **Throttle**: minimum spacing and user toggle in front of the narration sink
//!
//! [`NarrationEngine`] wires them together; [`spawn_session`] runs an engine
//! on a single task fed by a position source and a periodic tick.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geo;
pub mod model;
pub mod proximity;
pub mod runtime;
pub mod sequence;
pub mod throttle;

// Re-export key types for convenience
pub use config::{MalformedMarkerPolicy, TrackingConfig};
pub use engine::{EngineUpdate, NarrationEngine, TrackingStatus};
pub use error::CoreError;
pub use events::AnnouncementEvent;
pub use geo::{bearing_degrees, distance_meters, normalize_degrees, EARTH_RADIUS_M};
pub use model::{route_marker_sequence, Marker, OrderingPolicy, Route};
pub use proximity::{evaluate_proximity, NearbyPoint, ProximityDetector, ProximityReport};
pub use runtime::{spawn_session, SessionCommand, SessionHandle};
pub use sequence::{SequenceTracker, SessionState, StepOutcome, StepReport, TrackerState};
pub use throttle::{AnnouncementThrottle, RefusalReason, ThrottleDecision};
