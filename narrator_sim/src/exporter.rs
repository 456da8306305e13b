//! JSON exporter for ride playback.
//!
//! Exports one frame per engine input so a run can be replayed on a map.

use narrator_core::{AnnouncementEvent, TrackerState};
use narrator_env::Coordinate;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SimError;

/// Engine state after one input.
#[derive(Debug, Clone, Serialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Fix delivered at this frame, absent for ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,

    pub is_on_route: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_point_index: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,

    pub state: TrackerState,

    /// Announcement requests made at this frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub announcements: Vec<AnnouncementEvent>,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final result
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Accepted announcements across all frames, in order.
    pub fn accepted(&self) -> impl Iterator<Item = &AnnouncementEvent> {
        self.frames
            .iter()
            .flat_map(|f| f.announcements.iter())
            .filter(|e| e.accepted)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::ThrottleDecision;
    use narrator_env::SessionId;

    fn frame(time_sec: f64, accepted: bool) -> SimFrame {
        let decision = if accepted {
            ThrottleDecision::Accepted
        } else {
            ThrottleDecision::Refused(narrator_core::RefusalReason::Disabled)
        };
        SimFrame {
            time_sec,
            position: Some(Coordinate::new(0.001, 0.0)),
            is_on_route: true,
            nearest_point_index: Some(1),
            current_index: Some(0),
            state: TrackerState::Tracking,
            announcements: vec![AnnouncementEvent::new(
                SessionId::from_seed(1),
                "north",
                "n0",
                "North stop 0",
                decision,
                (time_sec * 1000.0) as u64,
            )],
        }
    }

    #[test]
    fn test_add_frame_tracks_duration() {
        let mut export = SimExport::new("full_ride", 42);
        export.add_frame(frame(1.0, false));
        export.add_frame(frame(2.5, true));
        export.finalize(true, None);

        assert_eq!(export.duration_sec, 2.5);
        assert_eq!(export.accepted().count(), 1);
    }

    #[test]
    fn test_export_json_shape() {
        let mut export = SimExport::new("full_ride", 42);
        export.add_frame(frame(1.0, true));
        let json = serde_json::to_value(&export).unwrap();

        assert_eq!(json["scenario"], "full_ride");
        assert_eq!(json["frames"][0]["state"], "tracking");
        assert_eq!(json["frames"][0]["announcements"][0]["marker_id"], "n0");
        assert!(json.get("failure_reason").is_none());
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("narrator_sim_export_{}.json", std::process::id()));
        let mut export = SimExport::new("teleport", 7);
        export.add_frame(frame(0.5, true));
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"teleport\""));
        let _ = std::fs::remove_file(&path);
    }
}
