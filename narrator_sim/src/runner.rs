//! Scenario runner - executes ride scenarios against a real engine.
//!
//! Every scenario drives one `NarrationEngine` on a virtual clock in
//! 100 ms steps: a fix every second from the walker, a tick every
//! `check_interval`, and scripted events (route switch, mute, outage) at
//! fixed times. The `InvariantMonitor` checks every engine input.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::fixtures;
use crate::invariants::InvariantMonitor;
use crate::narrator::RecordingNarrator;
use crate::scenarios::ScenarioId;
use crate::walker::RouteWalker;

use narrator_core::{
    CoreError, EngineUpdate, MalformedMarkerPolicy, Marker, NarrationEngine, RefusalReason, Route,
    StepOutcome, TrackerState, TrackingConfig,
};
use narrator_env::{Coordinate, NarratorContext, SessionId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Simulation step.
const STEP: Duration = Duration::from_millis(100);

/// Interval between position fixes.
const FIX_INTERVAL_MS: u64 = 1_000;

/// Plaza followed by the five north markers.
const NORTH_RIDE: [&str; 6] = ["plaza", "n0", "n1", "n2", "n3", "n4"];

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total simulation steps executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Accepted marker ids, in order
    pub announced: Vec<String>,

    /// Route-tracking sessions started
    pub sessions: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Fixes delivered to the engine
    pub positions: u64,

    /// Fix slots that fell inside a dropout
    pub dropped_positions: u64,

    /// Periodic ticks delivered to the engine
    pub ticks: u64,

    /// Accepted announcement requests
    pub accepted: u64,

    /// Refused announcement requests
    pub refused: u64,

    /// Malformed markers passed without narration
    pub skipped: u64,

    /// Tracker steps rejected as off route
    pub off_route_updates: u64,
}

/// One engine plus its simulated surroundings.
struct Harness {
    context: Arc<SimContext>,
    narrator: Arc<RecordingNarrator>,
    engine: NarrationEngine<SimContext, RecordingNarrator>,
    walker: RouteWalker,
    monitor: InvariantMonitor,
    metrics: ScenarioMetrics,
    export: SimExport,

    check_interval_ms: u64,
    next_fix_ms: u64,
    next_tick_ms: u64,
    steps: u64,

    /// Starting index chosen by each session that initialized
    start_indices: Vec<usize>,

    signal_lost: bool,
}

impl Harness {
    fn new(scenario: ScenarioId, seed: u64, config: TrackingConfig, walker: RouteWalker) -> Result<Self, CoreError> {
        let context = SimContext::shared(seed);
        let narrator = Arc::new(RecordingNarrator::new());
        let monitor = InvariantMonitor::new(config.min_announcement_interval());
        let check_interval_ms = config.check_interval_ms;
        let engine = NarrationEngine::new(context.clone(), narrator.clone(), config)?;

        Ok(Self {
            context,
            narrator,
            engine,
            walker,
            monitor,
            metrics: ScenarioMetrics::default(),
            export: SimExport::new(scenario.name(), seed),
            check_interval_ms,
            next_fix_ms: 0,
            next_tick_ms: 0,
            steps: 0,
            start_indices: Vec::new(),
            signal_lost: false,
        })
    }

    fn time_ms(&self) -> u64 {
        self.context.now().as_millis() as u64
    }

    fn activate(&mut self, route: Route, markers: &[Marker]) -> Result<SessionId, CoreError> {
        self.engine.activate_route(route, markers)
    }

    /// Processes inputs due at the current time, then advances one step.
    fn step(&mut self) {
        let now_ms = self.time_ms();

        if now_ms >= self.next_fix_ms {
            self.next_fix_ms += FIX_INTERVAL_MS;
            match self.walker.sample() {
                Some(mut fix) => {
                    self.signal_lost = false;
                    fix.timestamp_ms = self.context.unix_millis();
                    self.metrics.positions += 1;
                    let update = self.engine.on_position(fix);
                    self.record(update, Some(fix.coordinate));
                }
                None => {
                    self.metrics.dropped_positions += 1;
                    if !self.signal_lost {
                        self.signal_lost = true;
                        self.engine.on_position_error(2, "Position unavailable");
                    }
                }
            }
        }

        if now_ms >= self.next_tick_ms {
            self.next_tick_ms += self.check_interval_ms;
            self.metrics.ticks += 1;
            let update = self.engine.on_tick();
            self.record(update, None);
        }

        self.walker.step(STEP);
        self.context.advance_time(STEP);
        self.steps += 1;

        if self.steps % 100 == 0 {
            let status = self.engine.status();
            debug!(
                "  t={:.1}s | state={:?} | index={:?} | announced={}",
                self.context.now().as_secs_f64(),
                status.state,
                status.current_index,
                status.announced_count
            );
        }
    }

    /// Steps until the virtual clock reaches `secs`.
    fn run_until(&mut self, secs: f64) {
        let end_ms = (secs * 1000.0).round() as u64;
        while self.time_ms() < end_ms {
            self.step();
        }
    }

    fn record(&mut self, update: EngineUpdate, position: Option<Coordinate>) {
        let status = self.engine.status();
        self.monitor.observe(&update, &status);

        for event in &update.events {
            if event.accepted {
                self.metrics.accepted += 1;
            } else {
                self.metrics.refused += 1;
            }
        }
        if let Some(step) = &update.step {
            self.metrics.skipped += step.skipped.len() as u64;
            if step.outcome == StepOutcome::OffRoute {
                self.metrics.off_route_updates += 1;
            }
            if let Some(start) = step.started_at {
                self.start_indices.push(start);
            }
        }

        self.export.add_frame(SimFrame {
            time_sec: self.context.now().as_secs_f64(),
            position,
            is_on_route: update.proximity.is_on_route,
            nearest_point_index: update.proximity.nearest_point_index,
            current_index: status.current_index,
            state: status.state,
            announcements: update.events,
        });
    }

    /// Accepted marker ids, in order.
    fn announced(&self) -> Vec<String> {
        self.export.accepted().map(|e| e.marker_id.clone()).collect()
    }

    /// Time of the first accepted announcement of `marker_id`.
    fn accepted_at(&self, marker_id: &str) -> Option<u64> {
        self.export
            .accepted()
            .find(|e| e.marker_id == marker_id)
            .map(|e| e.at_ms)
    }

    fn refusals(&self, matches: impl Fn(&RefusalReason) -> bool) -> usize {
        self.export
            .frames
            .iter()
            .flat_map(|f| f.announcements.iter())
            .filter_map(|e| e.refusal.as_ref())
            .filter(|r| matches(r))
            .count()
    }

    fn finish(mut self, scenario: ScenarioId, seed: u64, mut failures: Vec<String>) -> (ScenarioResult, SimExport) {
        failures.extend(self.monitor.violations().iter().cloned());
        let passed = failures.is_empty();
        let failure_reason = if passed { None } else { Some(failures.join("; ")) };

        let announced = self.announced();
        self.export.finalize(passed, failure_reason.clone());

        info!(
            "{} {}: {} announced, {} refused, {} fixes",
            if passed { "✓" } else { "✗" },
            scenario.name(),
            self.metrics.accepted,
            self.metrics.refused,
            self.metrics.positions
        );

        let result = ScenarioResult {
            scenario,
            seed,
            passed,
            total_ticks: self.steps,
            final_time_secs: self.context.now().as_secs_f64(),
            announced,
            sessions: self.monitor.session_count(),
            failure_reason,
            metrics: self.metrics,
        };
        (result, self.export)
    }
}

/// Records `message` as a failure unless `ok`.
fn check(failures: &mut Vec<String>, ok: bool, message: impl FnOnce() -> String) {
    if !ok {
        failures.push(message());
    }
}

/// Runs ride scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Tracking configuration handed to every engine
    config: TrackingConfig,

    /// Maximum duration in seconds
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: TrackingConfig::default(),
            max_duration_secs: 180.0,
        }
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Sets the tracking configuration.
    pub fn with_config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_recorded(scenario).0
    }

    /// Runs a scenario and returns the result with its frame export.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let outcome = match scenario {
            ScenarioId::FullRide => self.run_full_ride(),
            ScenarioId::MidRouteJoin => self.run_mid_route_join(),
            ScenarioId::GpsDropout => self.run_gps_dropout(),
            ScenarioId::RouteSwitch => self.run_route_switch(),
            ScenarioId::SinkOutage => self.run_sink_outage(),
            ScenarioId::Teleport => self.run_teleport(),
            ScenarioId::NoisyFix => self.run_noisy_fix(),
            ScenarioId::MalformedMarker => self.run_malformed_marker(),
            ScenarioId::StalledStream => self.run_stalled_stream(),
            ScenarioId::AudioToggle => self.run_audio_toggle(),
        };

        outcome.unwrap_or_else(|err| self.setup_failed(scenario, err))
    }

    /// Runs a scenario and writes its frames to `path`.
    pub fn run_and_export(&self, scenario: ScenarioId, path: &str) -> Result<ScenarioResult, SimError> {
        let (result, export) = self.run_recorded(scenario);
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frames.len(), path);
        Ok(result)
    }

    fn setup_failed(&self, scenario: ScenarioId, err: CoreError) -> (ScenarioResult, SimExport) {
        let reason = format!("setup failed: {}", err);
        let mut export = SimExport::new(scenario.name(), self.seed);
        export.finalize(false, Some(reason.clone()));

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            announced: Vec::new(),
            sessions: 0,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        };
        (result, export)
    }

    fn physics_seed(&self) -> u64 {
        self.seed.wrapping_mul(0x9e3779b97f4a7c15)
    }

    /// Caps a scenario timeline at the configured duration.
    fn span(&self, secs: f64) -> f64 {
        secs.min(self.max_duration_secs)
    }

    fn harness(&self, scenario: ScenarioId, walker: RouteWalker) -> Result<Harness, CoreError> {
        Harness::new(scenario, self.seed, self.config.clone(), walker)
    }

    fn north_walker(&self) -> RouteWalker {
        RouteWalker::new(fixtures::north_line(), self.physics_seed())
    }

    /// SIM-001: FullRide - clean ride along the north line.
    ///
    /// **Assertion**: plaza and n0..n4 announced exactly once, in order.
    fn run_full_ride(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-001: FullRide - 1.1 km ride with 3 m GPS noise");

        let mut h = self.harness(ScenarioId::FullRide, self.north_walker().with_noise(3.0))?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == NORTH_RIDE, || {
            format!("expected {:?}, announced {:?}", NORTH_RIDE, announced)
        });
        check(&mut failures, h.narrator.spoken().len() == NORTH_RIDE.len(), || {
            format!("narrator spoke {} times", h.narrator.spoken().len())
        });
        Ok(h.finish(ScenarioId::FullRide, self.seed, failures))
    }

    /// SIM-002: MidRouteJoin - rider appears at 560 m.
    ///
    /// **Assertion**: markers before the nearest one (plaza, n0, n1) are
    /// passed silently; n2, n3, n4 follow in order.
    fn run_mid_route_join(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-002: MidRouteJoin - joining at 560 m");

        let mut h = self.harness(ScenarioId::MidRouteJoin, self.north_walker().starting_at(560.0))?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(70.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == ["n2", "n3", "n4"], || {
            format!("expected [n2, n3, n4], announced {:?}", announced)
        });
        check(&mut failures, h.start_indices == [3], || {
            format!("expected start at index 3, got {:?}", h.start_indices)
        });
        Ok(h.finish(ScenarioId::MidRouteJoin, self.seed, failures))
    }

    /// SIM-003: GpsDropout - no fixes during 30-38 s.
    ///
    /// n1 comes into range while the signal is lost. **Assertion**: it is
    /// announced on the first fix after the dropout and nothing is lost.
    fn run_gps_dropout(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-003: GpsDropout - signal lost for 8 s");

        let walker = self.north_walker().with_dropout(30.0, 38.0);
        let mut h = self.harness(ScenarioId::GpsDropout, walker)?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == NORTH_RIDE, || {
            format!("expected {:?}, announced {:?}", NORTH_RIDE, announced)
        });
        let n1_at = h.accepted_at("n1");
        check(&mut failures, n1_at.is_some_and(|at| (38_000..44_000).contains(&at)), || {
            format!("n1 announced at {:?} ms, expected right after the dropout", n1_at)
        });
        check(&mut failures, h.metrics.dropped_positions == 8, || {
            format!("expected 8 dropped fixes, got {}", h.metrics.dropped_positions)
        });
        Ok(h.finish(ScenarioId::GpsDropout, self.seed, failures))
    }

    /// SIM-004: RouteSwitch - north line for 30 s, then the east line.
    ///
    /// **Assertion**: the switch starts a fresh session, so the shared
    /// plaza marker is announced again; no north marker follows.
    fn run_route_switch(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-004: RouteSwitch - north to east at t=30s");

        let mut h = self.harness(ScenarioId::RouteSwitch, self.north_walker())?;
        let markers = fixtures::city_markers();
        let first = h.activate(fixtures::north_line(), &markers)?;
        h.run_until(self.span(30.0));

        let cancels_before = h.narrator.cancel_count();
        info!("  ⚡ Switching to the east line at t={:.1}s", h.context.now().as_secs_f64());
        h.walker = RouteWalker::new(fixtures::east_line(), self.physics_seed().wrapping_add(1));
        let second = h.activate(fixtures::east_line(), &markers)?;
        let cancels_after = h.narrator.cancel_count();
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let expected = ["plaza", "n0", "plaza", "e0", "e1"];
        let announced = h.announced();
        check(&mut failures, announced == expected, || {
            format!("expected {:?}, announced {:?}", expected, announced)
        });
        check(&mut failures, first != second, || "session id reused".to_string());
        check(&mut failures, cancels_after == cancels_before + 1, || {
            "route switch did not cancel narration".to_string()
        });
        check(&mut failures, h.monitor.session_count() == 2, || {
            format!("expected 2 sessions, saw {}", h.monitor.session_count())
        });
        Ok(h.finish(ScenarioId::RouteSwitch, self.seed, failures))
    }

    /// SIM-005: SinkOutage - speech engine down during 10-15 s.
    ///
    /// n0 comes into range at 12 s. **Assertion**: it stays pending while
    /// the sink is unavailable and is announced once it returns.
    fn run_sink_outage(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-005: SinkOutage - narration unavailable for 5 s");

        let mut h = self.harness(ScenarioId::SinkOutage, self.north_walker())?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(10.0));
        h.narrator.set_available(false);
        h.run_until(self.span(15.0));
        h.narrator.set_available(true);
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == NORTH_RIDE, || {
            format!("expected {:?}, announced {:?}", NORTH_RIDE, announced)
        });
        let n0_at = h.accepted_at("n0");
        check(&mut failures, n0_at.is_some_and(|at| at >= 15_000), || {
            format!("n0 announced at {:?} ms, during the outage", n0_at)
        });
        let unavailable = h.refusals(|r| *r == RefusalReason::Unavailable);
        check(&mut failures, unavailable > 0, || "no request hit the outage".to_string());
        Ok(h.finish(ScenarioId::SinkOutage, self.seed, failures))
    }

    /// SIM-006: Teleport - one fix lands within range of two markers.
    ///
    /// **Assertion**: only the first fires on that update; the second
    /// follows on a later update once the throttle window opens.
    fn run_teleport(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-006: Teleport - jump past two markers at t=3s");

        let walker = RouteWalker::new(fixtures::spur(), self.physics_seed())
            .with_speed(1.0)
            .with_teleport(3.0, 166.8);
        let mut h = self.harness(ScenarioId::Teleport, walker)?;
        h.activate(fixtures::spur(), &fixtures::spur_markers())?;
        h.run_until(self.span(30.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == ["a", "b"], || {
            format!("expected [a, b], announced {:?}", announced)
        });
        let (a_at, b_at) = (h.accepted_at("a"), h.accepted_at("b"));
        let spacing = h.engine.config().min_announcement_interval_ms;
        check(
            &mut failures,
            matches!((a_at, b_at), (Some(a), Some(b)) if b >= a + spacing),
            || format!("a at {:?} ms, b at {:?} ms", a_at, b_at),
        );
        let too_soon = h.refusals(|r| matches!(r, RefusalReason::TooSoon { .. }));
        check(&mut failures, too_soon > 0, || "b was never throttled".to_string());
        Ok(h.finish(ScenarioId::Teleport, self.seed, failures))
    }

    /// SIM-007: NoisyFix - 15 m noise and a 150 m detour during 45-55 s.
    ///
    /// **Assertion**: detour fixes are rejected as off route without losing
    /// progress, and every marker is still announced in order.
    fn run_noisy_fix(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-007: NoisyFix - 15 m noise plus a detour");

        let walker = self.north_walker().with_noise(15.0).with_detour(45.0, 55.0, 150.0);
        let mut h = self.harness(ScenarioId::NoisyFix, walker)?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(45.0));
        let index_before = h.engine.status().current_index;
        h.run_until(self.span(55.0));
        let index_after = h.engine.status().current_index;
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == NORTH_RIDE, || {
            format!("expected {:?}, announced {:?}", NORTH_RIDE, announced)
        });
        check(&mut failures, h.metrics.off_route_updates > 0, || {
            "detour was never reported off route".to_string()
        });
        check(&mut failures, index_before == index_after, || {
            format!("index moved from {:?} to {:?} during the detour", index_before, index_after)
        });
        Ok(h.finish(ScenarioId::NoisyFix, self.seed, failures))
    }

    /// SIM-008: MalformedMarker - n1 has no text, n3 has no position.
    ///
    /// **Assertion**: with `Skip` both are passed without narration; with
    /// `Stall` the session waits on n1 forever.
    fn run_malformed_marker(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-008: MalformedMarker - policy {:?}", self.config.malformed_markers);

        let mut h = self.harness(ScenarioId::MalformedMarker, self.north_walker())?;
        h.activate(fixtures::north_line(), &fixtures::malformed_north_markers())?;
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        match self.config.malformed_markers {
            MalformedMarkerPolicy::Skip => {
                check(&mut failures, announced == ["n0", "n2", "n4"], || {
                    format!("expected [n0, n2, n4], announced {:?}", announced)
                });
                check(&mut failures, h.metrics.skipped == 2, || {
                    format!("expected 2 skipped markers, got {}", h.metrics.skipped)
                });
            }
            MalformedMarkerPolicy::Stall => {
                check(&mut failures, announced == ["n0"], || {
                    format!("expected [n0], announced {:?}", announced)
                });
                let index = h.engine.status().current_index;
                check(&mut failures, index == Some(1), || {
                    format!("expected to stall at index 1, at {:?}", index)
                });
            }
        }
        Ok(h.finish(ScenarioId::MalformedMarker, self.seed, failures))
    }

    /// SIM-009: StalledStream - fixes stop for good at 30 s.
    ///
    /// **Assertion**: ticks keep running on the last fix, the tracker stays
    /// in place, and nothing is announced afterwards.
    fn run_stalled_stream(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-009: StalledStream - position stream ends at t=30s");

        let walker = self.north_walker().with_stream_end(30.0);
        let mut h = self.harness(ScenarioId::StalledStream, walker)?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(30.0));
        let stalled_at = h.engine.status();
        let ticks_before = h.metrics.ticks;
        h.run_until(self.span(90.0));
        let status = h.engine.status();

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == ["plaza", "n0"], || {
            format!("expected [plaza, n0], announced {:?}", announced)
        });
        check(&mut failures, status.current_index == stalled_at.current_index, || {
            format!("index moved from {:?} to {:?}", stalled_at.current_index, status.current_index)
        });
        check(&mut failures, status.state == TrackerState::Tracking, || {
            format!("expected Tracking, got {:?}", status.state)
        });
        check(&mut failures, h.metrics.ticks > ticks_before, || {
            "ticks stopped with the stream".to_string()
        });
        Ok(h.finish(ScenarioId::StalledStream, self.seed, failures))
    }

    /// SIM-010: AudioToggle - muted during 8-16 s.
    ///
    /// n0 comes into range at 12 s. **Assertion**: requests are refused as
    /// disabled, n0 fires after unmute, and muting silenced the sink.
    fn run_audio_toggle(&self) -> Result<(ScenarioResult, SimExport), CoreError> {
        info!("SIM-010: AudioToggle - audio off for 8 s");

        let mut h = self.harness(ScenarioId::AudioToggle, self.north_walker())?;
        h.activate(fixtures::north_line(), &fixtures::city_markers())?;
        h.run_until(self.span(8.0));
        h.engine.set_announcements_enabled(false);
        h.run_until(self.span(16.0));
        h.engine.set_announcements_enabled(true);
        h.run_until(self.span(130.0));

        let mut failures = Vec::new();
        let announced = h.announced();
        check(&mut failures, announced == NORTH_RIDE, || {
            format!("expected {:?}, announced {:?}", NORTH_RIDE, announced)
        });
        let n0_at = h.accepted_at("n0");
        check(&mut failures, n0_at.is_some_and(|at| at >= 16_000), || {
            format!("n0 announced at {:?} ms while muted", n0_at)
        });
        let disabled = h.refusals(|r| *r == RefusalReason::Disabled);
        check(&mut failures, disabled > 0, || "no request was refused while muted".to_string());

        // One cancel per accepted announcement, plus activation and mute
        let expected_cancels = h.metrics.accepted as usize + 2;
        check(&mut failures, h.narrator.cancel_count() == expected_cancels, || {
            format!("expected {} cancels, got {}", expected_cancels, h.narrator.cancel_count())
        });
        Ok(h.finish(ScenarioId::AudioToggle, self.seed, failures))
    }
}
