//! Announcement events observable by the UI and logs.

use narrator_env::SessionId;
use serde::Serialize;

use crate::throttle::{RefusalReason, ThrottleDecision};

/// One announcement request and its outcome.
///
/// The Narration Port only ever receives accepted text; refused requests
/// are reported here so callers can surface them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnouncementEvent {
    pub session_id: SessionId,
    pub route_id: String,
    pub marker_id: String,
    pub text: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<RefusalReason>,
    /// Session clock time of the request (milliseconds)
    pub at_ms: u64,
}

impl AnnouncementEvent {
    pub fn new(
        session_id: SessionId,
        route_id: impl Into<String>,
        marker_id: impl Into<String>,
        text: impl Into<String>,
        decision: ThrottleDecision,
        at_ms: u64,
    ) -> Self {
        Self {
            session_id,
            route_id: route_id.into(),
            marker_id: marker_id.into(),
            text: text.into(),
            accepted: decision.is_accepted(),
            refusal: decision.refusal(),
            at_ms,
        }
    }
}
