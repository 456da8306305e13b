//! Runtime invariant checks applied after every engine input.
//!
//! The monitor never stops a run; it collects violations so the scenario
//! can fail with a precise reason.

use narrator_core::{EngineUpdate, StepOutcome, TrackingStatus};
use narrator_env::SessionId;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Default)]
struct SessionRecord {
    last_index: Option<usize>,
    last_announced_index: Option<usize>,
    accepted: HashSet<String>,
    last_accepted_ms: Option<u64>,
}

/// Watches engine output for ordering, duplication and spacing violations.
#[derive(Debug)]
pub struct InvariantMonitor {
    min_interval: Duration,
    sessions: HashMap<SessionId, SessionRecord>,
    violations: Vec<String>,
}

impl InvariantMonitor {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            sessions: HashMap::new(),
            violations: Vec::new(),
        }
    }

    /// Checks one engine input against the status that followed it.
    pub fn observe(&mut self, update: &EngineUpdate, status: &TrackingStatus) {
        let Some(session_id) = status.session_id else {
            if update.events.iter().any(|e| e.accepted) {
                self.violations
                    .push("announcement accepted without an active session".to_string());
            }
            return;
        };

        let min_ms = self.min_interval.as_millis() as u64;
        let record = self.sessions.entry(session_id).or_default();
        let mut found = Vec::new();

        if let (Some(prev), Some(now)) = (record.last_index, status.current_index) {
            if now < prev {
                found.push(format!("session {} index went back from {} to {}", session_id, prev, now));
            }
        }
        if status.current_index.is_some() {
            record.last_index = status.current_index;
        }

        for event in update.events.iter().filter(|e| e.accepted) {
            if event.session_id != session_id {
                found.push(format!("event for stale session {}", event.session_id));
                continue;
            }
            if !record.accepted.insert(event.marker_id.clone()) {
                found.push(format!("marker {} announced twice in session {}", event.marker_id, session_id));
            }
            if let Some(last) = record.last_accepted_ms {
                if event.at_ms.saturating_sub(last) < min_ms {
                    found.push(format!(
                        "marker {} announced {} ms after the previous one",
                        event.marker_id,
                        event.at_ms.saturating_sub(last)
                    ));
                }
            }
            record.last_accepted_ms = Some(event.at_ms);
        }

        if let Some(StepOutcome::Announced { index, .. }) = update.step.as_ref().map(|s| &s.outcome) {
            if let Some(prev) = record.last_announced_index {
                if *index <= prev {
                    found.push(format!("announced index {} after {}", index, prev));
                }
            }
            record.last_announced_index = Some(*index);
        }

        self.violations.extend(found);
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Distinct sessions observed so far.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::{AnnouncementEvent, ProximityReport, StepReport, ThrottleDecision, TrackerState};

    fn status(session: u64, index: usize) -> TrackingStatus {
        TrackingStatus {
            state: TrackerState::Tracking,
            session_id: Some(SessionId::from_seed(session)),
            current_index: Some(index),
            ..Default::default()
        }
    }

    fn accepted(session: u64, marker: &str, at_ms: u64) -> EngineUpdate {
        EngineUpdate {
            proximity: ProximityReport::undefined(),
            step: None,
            events: vec![AnnouncementEvent::new(
                SessionId::from_seed(session),
                "r1",
                marker,
                "text",
                ThrottleDecision::Accepted,
                at_ms,
            )],
        }
    }

    fn quiet() -> EngineUpdate {
        EngineUpdate {
            proximity: ProximityReport::undefined(),
            step: None,
            events: Vec::new(),
        }
    }

    #[test]
    fn test_clean_run() {
        let mut monitor = InvariantMonitor::new(Duration::from_secs(10));
        monitor.observe(&accepted(1, "m0", 0), &status(1, 1));
        monitor.observe(&quiet(), &status(1, 1));
        monitor.observe(&accepted(1, "m1", 10_000), &status(1, 2));
        assert!(monitor.is_clean(), "{:?}", monitor.violations());
    }

    #[test]
    fn test_detects_duplicate_and_spacing() {
        let mut monitor = InvariantMonitor::new(Duration::from_secs(10));
        monitor.observe(&accepted(1, "m0", 0), &status(1, 1));
        monitor.observe(&accepted(1, "m0", 1_000), &status(1, 1));
        assert_eq!(monitor.violations().len(), 2);
    }

    #[test]
    fn test_detects_index_regression() {
        let mut monitor = InvariantMonitor::new(Duration::ZERO);
        monitor.observe(&quiet(), &status(1, 3));
        monitor.observe(&quiet(), &status(1, 2));
        assert!(!monitor.is_clean());
    }

    #[test]
    fn test_new_session_starts_fresh() {
        let mut monitor = InvariantMonitor::new(Duration::from_secs(10));
        monitor.observe(&accepted(1, "plaza", 0), &status(1, 3));
        monitor.observe(&accepted(2, "plaza", 500), &status(2, 0));
        assert!(monitor.is_clean(), "{:?}", monitor.violations());
        assert_eq!(monitor.session_count(), 2);
    }

    #[test]
    fn test_announced_index_must_increase() {
        let mut monitor = InvariantMonitor::new(Duration::ZERO);
        let mut update = quiet();
        update.step = Some(StepReport {
            started_at: None,
            skipped: Vec::new(),
            outcome: StepOutcome::Announced {
                marker_id: "m1".to_string(),
                index: 1,
            },
        });
        monitor.observe(&update, &status(1, 2));
        monitor.observe(&update, &status(1, 2));
        assert_eq!(monitor.violations().len(), 1);
    }
}
