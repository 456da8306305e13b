//! Narration Engine - wires the four components to the environment context.
//!
//! The engine is synchronous: every input (route change, position fix,
//! periodic tick, toggle) is one method call that runs to completion. The
//! async session loop in [`crate::runtime`] and the simulation harness both
//! drive the same engine, which is how the single in-flight update per
//! session is guaranteed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      NarrationEngine                          │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              Context: NarratorContext                  │  │
//! │  │  • now() → throttle windows, event timestamps          │  │
//! │  │  • seed() → deterministic session ids in simulation    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  position ──► ┌───────────┐   ┌──────────┐   ┌──────────┐     │
//! │               │ PROXIMITY │──►│ SEQUENCE │──►│ THROTTLE │──► NarrationPort
//! │   tick ─────► │ Detector  │   │ Tracker  │   │          │     │
//! │               └───────────┘   └──────────┘   └──────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use narrator_core::{NarrationEngine, TrackingConfig};
//! use narrator_env::{LogNarrator, TokioContext};
//!
//! let mut engine = NarrationEngine::new(
//!     TokioContext::shared(),
//!     Arc::new(LogNarrator::new()),
//!     TrackingConfig::default(),
//! )?;
//! engine.activate_route(route, &markers)?;
//! let update = engine.on_position(fix);
//! ```

use narrator_env::{EnvError, NarrationPort, NarratorContext, Position, SessionId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::error::CoreError;
use crate::events::AnnouncementEvent;
use crate::model::{Marker, Route};
use crate::proximity::{ProximityDetector, ProximityReport};
use crate::sequence::{SequenceTracker, StepReport, TrackerState};
use crate::throttle::AnnouncementThrottle;

/// Everything one engine input produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineUpdate {
    /// Proximity evaluated for this input
    pub proximity: ProximityReport,

    /// Tracker step, if the tracker ran
    pub step: Option<StepReport>,

    /// Announcement requests made during this input
    pub events: Vec<AnnouncementEvent>,
}

/// Snapshot of the engine for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrackingStatus {
    pub state: TrackerState,
    pub session_id: Option<SessionId>,
    pub route_id: Option<String>,
    pub is_on_route: bool,
    pub nearest_point_index: Option<usize>,
    pub nearest_distance_m: Option<f64>,
    pub current_index: Option<usize>,
    pub announced_count: usize,
    pub total_markers: usize,
    pub announcements_enabled: bool,
}

/// Orchestrates proximity, sequencing and throttling for one user.
///
/// Generic over the context and narration sink, so the same engine runs
/// on a device (tokio) or in the simulation harness.
pub struct NarrationEngine<Ctx, N>
where
    Ctx: NarratorContext,
    N: NarrationPort,
{
    /// Environment context
    context: Arc<Ctx>,

    /// Configuration
    config: TrackingConfig,

    detector: ProximityDetector,
    tracker: SequenceTracker,
    throttle: AnnouncementThrottle<N>,

    /// Route of the active session
    route: Option<Route>,

    /// Most recent fix, kept across route changes
    last_position: Option<Position>,

    session_id: Option<SessionId>,

    /// Sessions started so far (seeds deterministic session ids)
    session_count: u64,
}

impl<Ctx, N> NarrationEngine<Ctx, N>
where
    Ctx: NarratorContext,
    N: NarrationPort,
{
    /// Creates an idle engine, rejecting an invalid configuration.
    pub fn new(context: Arc<Ctx>, narrator: Arc<N>, config: TrackingConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let throttle = AnnouncementThrottle::new(narrator, config.min_announcement_interval())
            .with_enabled(config.announcements_enabled);

        Ok(Self {
            context,
            detector: ProximityDetector::new(config.proximity_threshold_m),
            tracker: SequenceTracker::new(&config),
            throttle,
            config,
            route: None,
            last_position: None,
            session_id: None,
            session_count: 0,
        })
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    /// The active route, if any.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    pub fn throttle(&self) -> &AnnouncementThrottle<N> {
        &self.throttle
    }

    /// Starts a fresh session on `route`.
    ///
    /// Any in-flight narration is cancelled and throttle timing is reset.
    /// An invalid route is rejected and also ends the previous session, so
    /// the engine never keeps narrating a route the caller has left.
    pub fn activate_route(&mut self, route: Route, markers: &[Marker]) -> Result<SessionId, CoreError> {
        if let Err(err) = route.validate() {
            warn!(route_id = %route.id, error = %err, "Route rejected");
            self.clear_route();
            return Err(err);
        }

        self.throttle.cancel();
        self.throttle.reset();
        self.detector.reset();
        self.tracker.activate(&route.id, markers);

        self.session_count += 1;
        let session_id = match self.context.seed() {
            0 => SessionId::new(),
            seed => SessionId::from_seed(seed.wrapping_add(self.session_count)),
        };

        info!(
            session_id = %session_id,
            route_id = %route.id,
            route_number = %route.number,
            points = route.points.len(),
            "Route activated"
        );

        self.route = Some(route);
        self.session_id = Some(session_id);
        Ok(session_id)
    }

    /// Ends the session. The tracker returns to Idle; the last fix is kept.
    pub fn clear_route(&mut self) {
        self.throttle.cancel();
        self.throttle.reset();
        self.tracker.clear();
        self.detector.reset();
        if let Some(route) = self.route.take() {
            info!(route_id = %route.id, "Route cleared");
        }
        self.session_id = None;
    }

    /// Stops tracking altogether (e.g. location disabled).
    pub fn stop(&mut self) {
        self.clear_route();
        self.last_position = None;
    }

    /// Applies the user audio toggle. Switching off silences the sink.
    pub fn set_announcements_enabled(&mut self, enabled: bool) {
        self.throttle.set_enabled(enabled);
        if !enabled {
            self.throttle.cancel();
        }
    }

    /// Processes a new position fix.
    pub fn on_position(&mut self, position: Position) -> EngineUpdate {
        self.last_position = Some(position);
        self.evaluate(true)
    }

    /// Periodic re-evaluation with the last known fix.
    pub fn on_tick(&mut self) -> EngineUpdate {
        self.evaluate(self.config.retry_on_tick)
    }

    /// Records a position source error. No state changes.
    pub fn on_position_error(&mut self, code: u16, message: &str) {
        let err = EnvError::position(code, message);
        warn!(code, error = %err, "Position source error");
    }

    fn evaluate(&mut self, run_tracker: bool) -> EngineUpdate {
        let proximity = self
            .detector
            .evaluate(self.route.as_ref(), self.last_position.as_ref())
            .clone();

        let mut events = Vec::new();
        let step = match (&self.last_position, &self.route, self.session_id) {
            (Some(position), Some(route), Some(session_id)) if run_tracker => {
                let now = self.context.now();
                let at_ms = now.as_millis() as u64;
                let throttle = &mut self.throttle;

                let report = self.tracker.step(position, proximity.is_on_route, |marker, text| {
                    let decision = throttle.request(text, now);
                    events.push(AnnouncementEvent::new(
                        session_id,
                        route.id.as_str(),
                        marker.id.as_str(),
                        text,
                        decision,
                        at_ms,
                    ));
                    decision.is_accepted()
                });
                Some(report)
            }
            _ => None,
        };

        for event in &events {
            if event.accepted {
                info!(
                    route_id = %event.route_id,
                    marker_id = %event.marker_id,
                    "Announcement accepted"
                );
            } else {
                debug!(
                    marker_id = %event.marker_id,
                    refusal = ?event.refusal,
                    "Announcement refused"
                );
            }
        }

        EngineUpdate {
            proximity,
            step,
            events,
        }
    }

    /// Current tracking snapshot.
    pub fn status(&self) -> TrackingStatus {
        let report = self.detector.last_report();
        let session = self.tracker.session();

        TrackingStatus {
            state: self.tracker.state(),
            session_id: self.session_id,
            route_id: self.route.as_ref().map(|r| r.id.clone()),
            is_on_route: report.is_on_route,
            nearest_point_index: report.nearest_point_index,
            nearest_distance_m: report.nearest_distance_m,
            current_index: session.map(|s| s.current_index),
            announced_count: session.map_or(0, |s| s.announced.len()),
            total_markers: session.map_or(0, |s| s.ordered_markers.len()),
            announcements_enabled: self.throttle.is_enabled(),
        }
    }
}
