//! Property-based tests for the narration engine.
//!
//! Random fix sequences, tick interleavings and sink outages are driven
//! through the real engine; the invariants must hold for every input.

use narrator_core::{
    distance_meters, AnnouncementThrottle, NarrationEngine, SequenceTracker, TrackingConfig,
};
use narrator_env::{Coordinate, Position};
use narrator_sim::{fixtures, InvariantMonitor, RecordingNarrator, SimContext};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// One engine input.
#[derive(Debug, Clone)]
enum Input {
    Fix { lat: f64, lng: f64 },
    Tick,
    Outage(bool),
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        6 => (-0.001..0.011_f64, -0.0012..0.0012_f64).prop_map(|(lat, lng)| Input::Fix { lat, lng }),
        3 => Just(Input::Tick),
        1 => any::<bool>().prop_map(Input::Outage),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_distance_symmetric_and_non_negative(
        lat1 in -89.0..89.0_f64,
        lng1 in -180.0..180.0_f64,
        lat2 in -89.0..89.0_f64,
        lng2 in -180.0..180.0_f64,
    ) {
        let a = Coordinate::new(lat1, lng1);
        let b = Coordinate::new(lat2, lng2);

        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() < 1e-6, "{} != {}", ab, ba);
        prop_assert!(distance_meters(&a, &a).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_index_monotonic_and_at_most_once(
        fixes in prop::collection::vec((-0.001..0.011_f64, any::<bool>(), any::<bool>()), 1..200),
    ) {
        let mut tracker = SequenceTracker::new(&TrackingConfig::default());
        tracker.activate("north", &fixtures::city_markers());

        let mut last_index = 0;
        let mut fired = HashSet::new();
        let mut duplicate = None;
        for (lat, on_route, accept) in fixes {
            let position = Position::new(Coordinate::new(lat, 0.0), 0);
            let mut offered = 0;
            tracker.step(&position, on_route, |marker, _| {
                offered += 1;
                if accept && !fired.insert(marker.id.clone()) {
                    duplicate = Some(marker.id.clone());
                }
                accept
            });

            prop_assert!(offered <= 1, "{} markers offered in one step", offered);
            let index = tracker.session().map(|s| s.current_index).unwrap_or(0);
            prop_assert!(index >= last_index, "index went back {} -> {}", last_index, index);
            last_index = index;
        }
        prop_assert_eq!(duplicate, None);
    }

    #[test]
    fn test_throttle_spacing(
        gaps_ms in prop::collection::vec(0u64..30_000, 1..100),
        interval_ms in 0u64..20_000,
    ) {
        let narrator = Arc::new(RecordingNarrator::new());
        let interval = Duration::from_millis(interval_ms);
        let mut throttle = AnnouncementThrottle::new(narrator.clone(), interval);

        let mut now = Duration::ZERO;
        let mut accepted = Vec::new();
        for gap in gaps_ms {
            now += Duration::from_millis(gap);
            if throttle.request("Next stop", now).is_accepted() {
                accepted.push(now);
            }
        }

        prop_assert!(!accepted.is_empty());
        for pair in accepted.windows(2) {
            prop_assert!(pair[1] - pair[0] >= interval);
        }
        prop_assert_eq!(narrator.spoken().len(), accepted.len());
    }

    #[test]
    fn test_engine_invariants_hold(
        inputs in prop::collection::vec((input(), 0u64..20_000), 1..150),
    ) {
        let context = SimContext::shared(7);
        let narrator = Arc::new(RecordingNarrator::new());
        let config = TrackingConfig::default();
        let mut monitor = InvariantMonitor::new(config.min_announcement_interval());
        let mut engine = NarrationEngine::new(context.clone(), narrator.clone(), config)
            .expect("default config is valid");
        engine
            .activate_route(fixtures::north_line(), &fixtures::city_markers())
            .expect("fixture route is valid");

        for (input, advance_ms) in inputs {
            context.advance_time(Duration::from_millis(advance_ms));
            let update = match input {
                Input::Fix { lat, lng } => engine.on_position(Position::new(Coordinate::new(lat, lng), 0)),
                Input::Tick => engine.on_tick(),
                Input::Outage(down) => {
                    narrator.set_available(!down);
                    continue;
                }
            };
            monitor.observe(&update, &engine.status());
        }

        prop_assert!(monitor.is_clean(), "{:?}", monitor.violations());

        let spoken = narrator.spoken();
        let unique: HashSet<_> = spoken.iter().collect();
        prop_assert_eq!(unique.len(), spoken.len());
    }
}
