//! Ride scenarios for deterministic simulation.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// SIM-001: Clean ride along the whole north line
    FullRide,

    /// SIM-002: Rider joins half-way along the route
    MidRouteJoin,

    /// SIM-003: No fixes for several seconds mid-ride
    GpsDropout,

    /// SIM-004: User switches route part-way through a ride
    RouteSwitch,

    /// SIM-005: Speech engine unavailable for a while
    SinkOutage,

    /// SIM-006: One fix jumps past two markers at once
    Teleport,

    /// SIM-007: Heavy noise plus a detour off the route
    NoisyFix,

    /// SIM-008: Markers with missing text or position
    MalformedMarker,

    /// SIM-009: Position stream ends mid-ride
    StalledStream,

    /// SIM-010: User mutes and unmutes audio
    AudioToggle,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullRide,
            ScenarioId::MidRouteJoin,
            ScenarioId::GpsDropout,
            ScenarioId::RouteSwitch,
            ScenarioId::SinkOutage,
            ScenarioId::Teleport,
            ScenarioId::NoisyFix,
            ScenarioId::MalformedMarker,
            ScenarioId::StalledStream,
            ScenarioId::AudioToggle,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullRide => "full_ride",
            ScenarioId::MidRouteJoin => "mid_route_join",
            ScenarioId::GpsDropout => "gps_dropout",
            ScenarioId::RouteSwitch => "route_switch",
            ScenarioId::SinkOutage => "sink_outage",
            ScenarioId::Teleport => "teleport",
            ScenarioId::NoisyFix => "noisy_fix",
            ScenarioId::MalformedMarker => "malformed_marker",
            ScenarioId::StalledStream => "stalled_stream",
            ScenarioId::AudioToggle => "audio_toggle",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullRide => "1.1 km ride with 3 m noise, every marker in order",
            ScenarioId::MidRouteJoin => "Join at 560 m, earlier markers never spoken",
            ScenarioId::GpsDropout => "9 s without fixes, ticks keep the sequence alive",
            ScenarioId::RouteSwitch => "Switch from north to east line after 30 s",
            ScenarioId::SinkOutage => "Speech engine down for 5 s, pending marker retried",
            ScenarioId::Teleport => "Single fix jumps past two markers, one per update",
            ScenarioId::NoisyFix => "15 m noise and a 150 m detour, no progress while off route",
            ScenarioId::MalformedMarker => "Markers without text or position are skipped",
            ScenarioId::StalledStream => "Fixes stop at 30 s, tracker holds its place",
            ScenarioId::AudioToggle => "Audio muted for 8 s, narration resumes afterwards",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_ride" | "fullride" | "sim-001" => Ok(ScenarioId::FullRide),
            "mid_route_join" | "midroutejoin" | "sim-002" => Ok(ScenarioId::MidRouteJoin),
            "gps_dropout" | "gpsdropout" | "sim-003" => Ok(ScenarioId::GpsDropout),
            "route_switch" | "routeswitch" | "sim-004" => Ok(ScenarioId::RouteSwitch),
            "sink_outage" | "sinkoutage" | "sim-005" => Ok(ScenarioId::SinkOutage),
            "teleport" | "sim-006" => Ok(ScenarioId::Teleport),
            "noisy_fix" | "noisyfix" | "sim-007" => Ok(ScenarioId::NoisyFix),
            "malformed_marker" | "malformedmarker" | "sim-008" => Ok(ScenarioId::MalformedMarker),
            "stalled_stream" | "stalledstream" | "sim-009" => Ok(ScenarioId::StalledStream),
            "audio_toggle" | "audiotoggle" | "sim-010" => Ok(ScenarioId::AudioToggle),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
