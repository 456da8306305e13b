//! Route proximity detection.
//!
//! Given a route and the latest position, finds the nearest route point and
//! decides whether the position counts as "on route". Evaluation is a pure
//! function of its inputs, so re-running it on a timer with an unchanged
//! position is idempotent.

use narrator_env::Position;
use serde::Serialize;

use crate::geo::{distance_meters, nearest_index};
use crate::model::Route;

/// A route point inside the on-route radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearbyPoint {
    /// Index into `Route::points`
    pub index: usize,
    /// Distance from the position in meters
    pub distance_m: f64,
}

/// Result of one proximity evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProximityReport {
    /// Index of the closest route point (`None` when undefined)
    pub nearest_point_index: Option<usize>,

    /// Distance to the closest route point in meters
    pub nearest_distance_m: Option<f64>,

    /// True when the closest point is within the threshold
    pub is_on_route: bool,

    /// All points within the threshold, closest first
    pub nearby_points: Vec<NearbyPoint>,
}

impl ProximityReport {
    /// The "no position or no route" result.
    pub fn undefined() -> Self {
        Self::default()
    }
}

/// Detects whether a position is on a route.
#[derive(Debug, Clone)]
pub struct ProximityDetector {
    /// On-route radius in meters
    threshold_m: f64,

    /// Last evaluation result
    last: ProximityReport,
}

impl ProximityDetector {
    /// Creates a detector with the given on-route radius.
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            last: ProximityReport::undefined(),
        }
    }

    /// Returns the configured on-route radius.
    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Returns the most recent report.
    pub fn last_report(&self) -> &ProximityReport {
        &self.last
    }

    /// Forgets the last report.
    pub fn reset(&mut self) {
        self.last = ProximityReport::undefined();
    }

    /// Evaluates proximity and remembers the result.
    pub fn evaluate(&mut self, route: Option<&Route>, position: Option<&Position>) -> &ProximityReport {
        self.last = evaluate_proximity(route, position, self.threshold_m);
        &self.last
    }
}

/// Stateless proximity evaluation.
///
/// Ties between equidistant route points resolve to the lowest index.
pub fn evaluate_proximity(
    route: Option<&Route>,
    position: Option<&Position>,
    threshold_m: f64,
) -> ProximityReport {
    let (Some(route), Some(position)) = (route, position) else {
        return ProximityReport::undefined();
    };

    let here = &position.coordinate;
    let Some((index, distance)) = nearest_index(here, route.points.iter().map(Some)) else {
        return ProximityReport::undefined();
    };

    let mut nearby_points: Vec<NearbyPoint> = route
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| NearbyPoint {
            index,
            distance_m: distance_meters(here, point),
        })
        .filter(|p| p.distance_m <= threshold_m)
        .collect();
    // Stable sort keeps index order among equal distances
    nearby_points.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    ProximityReport {
        nearest_point_index: Some(index),
        nearest_distance_m: Some(distance),
        is_on_route: distance <= threshold_m,
        nearby_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_env::Coordinate;

    fn route() -> Route {
        Route {
            id: "r1".to_string(),
            number: "1".to_string(),
            points: vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.001, 0.0),
                Coordinate::new(0.002, 0.0),
            ],
        }
    }

    fn at(lat: f64, lng: f64) -> Position {
        Position::new(Coordinate::new(lat, lng), 0)
    }

    #[test]
    fn test_undefined_without_position() {
        let report = evaluate_proximity(Some(&route()), None, 100.0);
        assert_eq!(report, ProximityReport::undefined());
        assert!(!report.is_on_route);
        assert_eq!(report.nearest_point_index, None);
    }

    #[test]
    fn test_undefined_without_route() {
        let report = evaluate_proximity(None, Some(&at(0.0, 0.0)), 100.0);
        assert!(!report.is_on_route);
    }

    #[test]
    fn test_undefined_with_pointless_route() {
        let mut empty = route();
        empty.points.clear();
        let report = evaluate_proximity(Some(&empty), Some(&at(0.0, 0.0)), 100.0);
        assert_eq!(report.nearest_point_index, None);
    }

    #[test]
    fn test_nearest_point_selected() {
        let report = evaluate_proximity(Some(&route()), Some(&at(0.0019, 0.0)), 100.0);
        assert_eq!(report.nearest_point_index, Some(2));
        assert!(report.is_on_route);
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        // Exactly between point 0 and point 1
        let report = evaluate_proximity(Some(&route()), Some(&at(0.0005, 0.0)), 100.0);
        assert_eq!(report.nearest_point_index, Some(0));
    }

    #[test]
    fn test_off_route_beyond_threshold() {
        // ~222 m east of point 0
        let report = evaluate_proximity(Some(&route()), Some(&at(0.0, 0.002)), 100.0);
        assert!(!report.is_on_route);
        assert_eq!(report.nearest_point_index, Some(0));
        assert!(report.nearby_points.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let distance = distance_meters(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 0.0005));
        let report = evaluate_proximity(Some(&route()), Some(&at(0.0, 0.0005)), distance);
        assert!(report.is_on_route);
    }

    #[test]
    fn test_nearby_points_sorted_by_distance() {
        let report = evaluate_proximity(Some(&route()), Some(&at(0.0012, 0.0)), 150.0);
        let indices: Vec<_> = report.nearby_points.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_detector_reevaluation_is_idempotent() {
        let mut detector = ProximityDetector::new(100.0);
        let route = route();
        let pos = at(0.0011, 0.00001);

        let first = detector.evaluate(Some(&route), Some(&pos)).clone();
        let second = detector.evaluate(Some(&route), Some(&pos)).clone();
        assert_eq!(first, second);
        assert_eq!(detector.last_report(), &first);

        detector.reset();
        assert_eq!(detector.last_report(), &ProximityReport::undefined());
    }
}
