//! Deterministic routes and markers used by the scenarios.
//!
//! All geometry sits next to (0, 0) so distances are easy to reason about:
//! 0.001 degrees of latitude is ~111 m.
//!
//! ```text
//!   lat
//!  0.010 ┬ north end
//!        │ n4 (0.0095)
//!        │ n3 (0.0075)
//!        │ n2 (0.0055)
//!        │ n1 (0.0035)
//!        │ n0 (0.0015)
//!  0.000 ┼ plaza ──── e0 (0.0035) ──── e1 (0.0075) ──── east end (lng 0.010)
//! ```

use narrator_core::{Marker, Route};
use narrator_env::Coordinate;

/// Marker latitudes along the north line (~222 m apart).
pub const NORTH_MARKER_LATS: [f64; 5] = [0.0015, 0.0035, 0.0055, 0.0075, 0.0095];

fn line(id: &str, number: &str, point: impl Fn(f64) -> Coordinate) -> Route {
    let points = (0..=10).map(|i| point(i as f64 * 0.001)).collect();
    Route {
        id: id.to_string(),
        number: number.to_string(),
        points,
    }
}

/// ~1.1 km straight north from the origin.
pub fn north_line() -> Route {
    line("north", "22", |d| Coordinate::new(d, 0.0))
}

/// ~1.1 km straight east from the origin.
pub fn east_line() -> Route {
    line("east", "7", |d| Coordinate::new(0.0, d))
}

/// Five markers along the north line, `n0`..`n4`.
pub fn north_markers() -> Vec<Marker> {
    NORTH_MARKER_LATS
        .iter()
        .enumerate()
        .map(|(i, &lat)| {
            Marker::new(
                format!("n{}", i),
                format!("North stop {}", i),
                format!("Approaching north stop {}", i),
                Coordinate::new(lat, 0.0),
                "north",
                i as i64,
            )
        })
        .collect()
}

/// A marker near the origin shared by both lines, played first on each.
pub fn plaza() -> Marker {
    Marker::new(
        "plaza",
        "Central plaza",
        "Welcome to the central plaza",
        Coordinate::new(0.0002, 0.0002),
        "north",
        -1,
    )
    .with_route("east")
}

/// Two markers along the east line.
pub fn east_markers() -> Vec<Marker> {
    [0.0035, 0.0075]
        .iter()
        .enumerate()
        .map(|(i, &lng)| {
            Marker::new(
                format!("e{}", i),
                format!("East stop {}", i),
                format!("Approaching east stop {}", i),
                Coordinate::new(0.0, lng),
                "east",
                i as i64,
            )
        })
        .collect()
}

/// Plaza plus both lines' markers, as a storage layer would return them.
pub fn city_markers() -> Vec<Marker> {
    let mut markers = vec![plaza()];
    markers.extend(north_markers());
    markers.extend(east_markers());
    markers
}

/// North markers where `n1` has no speech text and `n3` has no position.
pub fn malformed_north_markers() -> Vec<Marker> {
    let mut markers = north_markers();
    markers[1].speech_text = None;
    markers[3].position = None;
    markers
}

/// A short spur with two markers ~89 m apart, for teleport tests.
pub fn spur() -> Route {
    Route {
        id: "spur".to_string(),
        number: "S".to_string(),
        points: vec![Coordinate::new(-0.001, 0.0), Coordinate::new(0.001, 0.0)],
    }
}

/// Markers `a` (lat 0.0001) and `b` (lat 0.0009) on the spur.
pub fn spur_markers() -> Vec<Marker> {
    vec![
        Marker::new("a", "A", "Marker A", Coordinate::new(0.0001, 0.0), "spur", 0),
        Marker::new("b", "B", "Marker B", Coordinate::new(0.0009, 0.0), "spur", 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::{route_marker_sequence, OrderingPolicy};

    #[test]
    fn test_fixture_routes_are_valid() {
        for route in [north_line(), east_line(), spur()] {
            assert!(route.validate().is_ok(), "{} invalid", route.id);
        }
    }

    #[test]
    fn test_plaza_leads_both_lines() {
        let markers = city_markers();
        let north = route_marker_sequence(&markers, "north", OrderingPolicy::Global);
        let east = route_marker_sequence(&markers, "east", OrderingPolicy::Global);

        assert_eq!(north.len(), 6);
        assert_eq!(north[0].id, "plaza");
        assert_eq!(east.len(), 3);
        assert_eq!(east[0].id, "plaza");
    }

    #[test]
    fn test_malformed_markers() {
        let markers = malformed_north_markers();
        assert!(!markers[1].is_well_formed());
        assert!(!markers[3].is_well_formed());
        assert!(markers[0].is_well_formed());
    }
}
