//! Sequence Tracker - ordered, at-most-once marker playback.
//!
//! Owns one [`SessionState`] per active route and decides which marker, if
//! any, should be announced on each update.
//!
//! # State machine
//!
//! ```text
//!            activate(route)                 first on-route fix
//!   ┌──────┐ ───────────────► ┌──────────────┐ ─────────────────► ┌──────────┐
//!   │ Idle │                  │ Initializing │                    │ Tracking │
//!   └──────┘ ◄─────────────── └──────────────┘ ◄───────────────── └──────────┘
//!       ▲        clear()                          activate(other)       │
//!       └───────────────────────────────────────────────────────────────┘
//!                                 clear()
//! ```
//!
//! # Invariants
//!
//! - `current_index` never decreases within a session.
//! - Every marker before `current_index` is in `announced`.
//! - A marker id is passed to the announce callback at most once per
//!   session with an accepted result.
//! - At most one marker fires per step, and only the marker at
//!   `current_index` is ever considered.

use narrator_env::Position;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{MalformedMarkerPolicy, TrackingConfig};
use crate::geo::{distance_meters, nearest_index};
use crate::model::{route_marker_sequence, Marker, OrderingPolicy};

/// Tracker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// No active route
    #[default]
    Idle,
    /// Route active, starting point not yet determined
    Initializing,
    /// Steady-state advancement
    Tracking,
}

/// Playback state for one route-tracking session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Route this session belongs to
    pub route_id: String,

    /// Route markers in playback order
    pub ordered_markers: Vec<Marker>,

    /// Next marker to consider
    pub current_index: usize,

    /// Marker ids announced or treated as passed
    pub announced: HashSet<String>,

    /// Starting point has been determined
    pub initialized: bool,

    /// Malformed markers already reported in this session
    warned: HashSet<String>,
}

impl SessionState {
    fn new(route_id: String, ordered_markers: Vec<Marker>) -> Self {
        Self {
            route_id,
            ordered_markers,
            current_index: 0,
            announced: HashSet::new(),
            initialized: false,
            warned: HashSet::new(),
        }
    }

    /// Returns true once every marker has been passed.
    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.ordered_markers.len()
    }

    /// The marker currently awaited, if any.
    pub fn current_marker(&self) -> Option<&Marker> {
        self.ordered_markers.get(self.current_index)
    }
}

/// What happened at the current marker during a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    /// No active session
    NoSession,
    /// Position is not on the route; nothing evaluated
    OffRoute,
    /// Every marker has been passed
    Exhausted,
    /// Current marker is still out of range
    Waiting { marker_id: String, distance_m: f64 },
    /// Current marker was announced and the index advanced
    Announced { marker_id: String, index: usize },
    /// Current marker is in range but the announcement was refused
    Refused { marker_id: String },
    /// Current marker is malformed and the session waits on it
    Stalled { marker_id: String },
}

/// Result of one tracker step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Set when this step moved the session from Initializing to Tracking
    pub started_at: Option<usize>,

    /// Malformed markers passed over without narration during this step
    pub skipped: Vec<String>,

    /// What happened at the current marker
    pub outcome: StepOutcome,
}

impl StepReport {
    fn only(outcome: StepOutcome) -> Self {
        Self {
            started_at: None,
            skipped: Vec::new(),
            outcome,
        }
    }

    /// Returns the id of the marker announced in this step, if any.
    pub fn announced_marker(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Announced { marker_id, .. } => Some(marker_id),
            _ => None,
        }
    }
}

/// The sequence state machine.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    announcement_distance_m: f64,
    ordering: OrderingPolicy,
    malformed: MalformedMarkerPolicy,
    session: Option<SessionState>,
}

impl SequenceTracker {
    /// Creates an idle tracker.
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            announcement_distance_m: config.announcement_distance_m,
            ordering: config.ordering,
            malformed: config.malformed_markers,
            session: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        match &self.session {
            None => TrackerState::Idle,
            Some(s) if !s.initialized => TrackerState::Initializing,
            Some(_) => TrackerState::Tracking,
        }
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Discards any prior session and starts a fresh one for `route_id`.
    pub fn activate(&mut self, route_id: &str, markers: &[Marker]) {
        let ordered = route_marker_sequence(markers, route_id, self.ordering);
        info!(
            route_id = %route_id,
            markers = ordered.len(),
            "Sequence session started"
        );
        self.session = Some(SessionState::new(route_id.to_string(), ordered));
    }

    /// Discards the session. The tracker returns to Idle.
    pub fn clear(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                route_id = %session.route_id,
                current_index = session.current_index,
                "Sequence session cleared"
            );
        }
    }

    /// Runs one update.
    ///
    /// `announce` is called with the marker and its speech text when the
    /// current marker is in range; it returns true if the announcement was
    /// accepted. Only an accepted announcement advances the session.
    pub fn step<F>(&mut self, position: &Position, is_on_route: bool, mut announce: F) -> StepReport
    where
        F: FnMut(&Marker, &str) -> bool,
    {
        let announcement_distance_m = self.announcement_distance_m;
        let malformed = self.malformed;
        let Some(session) = self.session.as_mut() else {
            return StepReport::only(StepOutcome::NoSession);
        };

        // Off-route fixes neither initialize nor reset the session
        if !is_on_route {
            return StepReport::only(StepOutcome::OffRoute);
        }

        let here = &position.coordinate;
        let mut report = StepReport::only(StepOutcome::Exhausted);

        if !session.initialized {
            let start = initialize(session, here);
            report.started_at = Some(start);
        }

        loop {
            let index = session.current_index;
            let Some(marker) = session.ordered_markers.get(index) else {
                report.outcome = StepOutcome::Exhausted;
                return report;
            };

            if session.announced.contains(&marker.id) {
                session.current_index += 1;
                continue;
            }

            let (Some(target), Some(text)) = (marker.position.as_ref(), marker.speech()) else {
                let marker_id = marker.id.clone();
                if session.warned.insert(marker_id.clone()) {
                    warn!(
                        route_id = %session.route_id,
                        marker_id = %marker_id,
                        policy = ?malformed,
                        "Marker has no position or speech text"
                    );
                }
                match malformed {
                    MalformedMarkerPolicy::Skip => {
                        session.announced.insert(marker_id.clone());
                        session.current_index += 1;
                        report.skipped.push(marker_id);
                        continue;
                    }
                    MalformedMarkerPolicy::Stall => {
                        report.outcome = StepOutcome::Stalled { marker_id };
                        return report;
                    }
                }
            };

            let distance_m = distance_meters(here, target);
            if distance_m > announcement_distance_m {
                report.outcome = StepOutcome::Waiting {
                    marker_id: marker.id.clone(),
                    distance_m,
                };
                return report;
            }

            let marker_id = marker.id.clone();
            if announce(marker, text) {
                session.announced.insert(marker_id.clone());
                session.current_index += 1;
                debug!(
                    route_id = %session.route_id,
                    marker_id = %marker_id,
                    index,
                    distance_m,
                    "Marker announced"
                );
                report.outcome = StepOutcome::Announced { marker_id, index };
            } else {
                report.outcome = StepOutcome::Refused { marker_id };
            }
            return report;
        }
    }
}

/// Picks the starting marker for a session joined mid-route.
///
/// Markers before the nearest one are recorded as passed without narration.
fn initialize(session: &mut SessionState, here: &narrator_env::Coordinate) -> usize {
    let nearest = nearest_index(
        here,
        session.ordered_markers.iter().map(|m| m.position.as_ref()),
    );
    let start = nearest.map_or(0, |(index, _)| index);

    for marker in &session.ordered_markers[..start] {
        session.announced.insert(marker.id.clone());
    }
    session.current_index = start;
    session.initialized = true;

    info!(
        route_id = %session.route_id,
        start_index = start,
        "Sequence tracking initialized"
    );
    start
}
