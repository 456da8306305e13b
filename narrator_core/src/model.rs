//! Route and marker records supplied by the storage layer.
//!
//! Both are immutable snapshots for the lifetime of a session. The engine
//! never fetches or persists them.

use narrator_env::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::CoreError;
use crate::geo::{bearing_degrees, distance_meters};

// ============================================================================
// ROUTE
// ============================================================================

/// An ordered polyline. Point order defines the direction of travel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Storage identifier
    pub id: String,

    /// Public route number (e.g. "3", "22A")
    pub number: String,

    /// Points from route start to route end
    pub points: Vec<Coordinate>,
}

impl Route {
    /// Creates a route, rejecting fewer than two points or invalid coordinates.
    pub fn new(
        id: impl Into<String>,
        number: impl Into<String>,
        points: Vec<Coordinate>,
    ) -> Result<Self, CoreError> {
        let route = Self {
            id: id.into(),
            number: number.into(),
            points,
        };
        route.validate()?;
        Ok(route)
    }

    /// Checks the structural requirements of a trackable route.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.points.len() < 2 {
            return Err(CoreError::EmptyRoute(self.id.clone()));
        }
        if let Some(bad) = self.points.iter().find(|p| !p.is_valid()) {
            return Err(CoreError::InvalidCoordinate {
                lat: bad.latitude,
                lng: bad.longitude,
            });
        }
        Ok(())
    }

    /// Bearing of each consecutive segment, in route order.
    ///
    /// Used to orient direction arrows along the polyline.
    pub fn segment_bearings(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| bearing_degrees(&w[0], &w[1]))
            .collect()
    }

    /// Total polyline length in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| distance_meters(&w[0], &w[1]))
            .sum()
    }
}

// ============================================================================
// MARKER
// ============================================================================

/// A point of interest with narration text.
///
/// `position` and `speech_text` are optional because records edited by
/// hand or imported from older exports may lack them. Such markers can
/// never be announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Storage identifier
    pub id: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Text read aloud when the marker is reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_text: Option<String>,

    /// Where the marker sits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,

    /// Routes this marker belongs to
    #[serde(default)]
    pub route_ids: BTreeSet<String>,

    /// Playback order value, shared by every route the marker belongs to
    #[serde(default)]
    pub sequence: i64,

    /// Optional per-route order values (see [`OrderingPolicy::PerRoute`])
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub route_sequences: HashMap<String, i64>,
}

impl Marker {
    /// Creates a well-formed marker attached to a single route.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        speech_text: impl Into<String>,
        position: Coordinate,
        route_id: impl Into<String>,
        sequence: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            speech_text: Some(speech_text.into()),
            position: Some(position),
            route_ids: BTreeSet::from([route_id.into()]),
            sequence,
            route_sequences: HashMap::new(),
        }
    }

    /// Adds another route assignment.
    pub fn with_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_ids.insert(route_id.into());
        self
    }

    /// Adds a route assignment with its own order value.
    pub fn with_route_sequence(mut self, route_id: impl Into<String>, sequence: i64) -> Self {
        let route_id = route_id.into();
        self.route_ids.insert(route_id.clone());
        self.route_sequences.insert(route_id, sequence);
        self
    }

    /// Returns true if the marker is assigned to the route.
    pub fn belongs_to(&self, route_id: &str) -> bool {
        self.route_ids.contains(route_id)
    }

    /// Non-empty speech text, if any.
    pub fn speech(&self) -> Option<&str> {
        self.speech_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// A marker is announceable only with both a position and speech text.
    pub fn is_well_formed(&self) -> bool {
        self.position.is_some() && self.speech().is_some()
    }

    /// Order value used under the given policy for the given route.
    pub fn order_for(&self, route_id: &str, policy: OrderingPolicy) -> i64 {
        match policy {
            OrderingPolicy::Global => self.sequence,
            OrderingPolicy::PerRoute => self
                .route_sequences
                .get(route_id)
                .copied()
                .unwrap_or(self.sequence),
        }
    }
}

/// How markers shared by several routes are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// One `sequence` value per marker, used for every route.
    #[default]
    Global,

    /// Use the route-specific value from `route_sequences` when present,
    /// falling back to `sequence`.
    PerRoute,
}

/// Markers of one route in playback order.
///
/// Filters by route membership, then stable-sorts by order value so that
/// colliding values keep their original relative order.
pub fn route_marker_sequence(
    markers: &[Marker],
    route_id: &str,
    policy: OrderingPolicy,
) -> Vec<Marker> {
    let mut ordered: Vec<Marker> = markers
        .iter()
        .filter(|m| m.belongs_to(route_id))
        .cloned()
        .collect();

    // slice::sort_by_key is stable
    ordered.sort_by_key(|m| m.order_for(route_id, policy));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_route() -> Route {
        Route::new(
            "r1",
            "1",
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.001, 0.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_route_requires_two_points() {
        let err = Route::new("r0", "0", vec![Coordinate::new(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, CoreError::EmptyRoute(id) if id == "r0"));
    }

    #[test]
    fn test_route_rejects_invalid_coordinate() {
        let err = Route::new(
            "r0",
            "0",
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(91.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_route_length_and_bearings() {
        let route = north_route();
        assert!((route.length_m() - 111.19).abs() < 0.01);
        assert_eq!(route.segment_bearings(), vec![0.0]);
    }

    #[test]
    fn test_sequence_filters_and_sorts() {
        let markers = vec![
            Marker::new("c", "C", "c", Coordinate::new(0.0, 0.0), "r1", 2),
            Marker::new("x", "X", "x", Coordinate::new(0.0, 0.0), "r2", 0),
            Marker::new("a", "A", "a", Coordinate::new(0.0, 0.0), "r1", 0),
            Marker::new("b", "B", "b", Coordinate::new(0.0, 0.0), "r1", 1),
        ];

        let ids: Vec<_> = route_marker_sequence(&markers, "r1", OrderingPolicy::Global)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sequence_sort_is_stable_on_collisions() {
        let markers = vec![
            Marker::new("first", "", "1", Coordinate::new(0.0, 0.0), "r1", 5),
            Marker::new("early", "", "0", Coordinate::new(0.0, 0.0), "r1", 1),
            Marker::new("second", "", "2", Coordinate::new(0.0, 0.0), "r1", 5),
            Marker::new("third", "", "3", Coordinate::new(0.0, 0.0), "r1", 5),
        ];

        let ids: Vec<_> = route_marker_sequence(&markers, "r1", OrderingPolicy::Global)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn test_per_route_ordering_overrides_global() {
        let shared = Marker::new("shared", "", "s", Coordinate::new(0.0, 0.0), "r1", 0)
            .with_route_sequence("r2", 9);
        let other = Marker::new("other", "", "o", Coordinate::new(0.0, 0.0), "r2", 1);
        let markers = vec![shared, other];

        let global: Vec<_> = route_marker_sequence(&markers, "r2", OrderingPolicy::Global)
            .into_iter()
            .map(|m| m.id)
            .collect();
        let per_route: Vec<_> = route_marker_sequence(&markers, "r2", OrderingPolicy::PerRoute)
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(global, vec!["shared", "other"]);
        assert_eq!(per_route, vec!["other", "shared"]);
    }

    #[test]
    fn test_marker_well_formedness() {
        let mut marker = Marker::new("m", "M", "hello", Coordinate::new(0.0, 0.0), "r1", 0);
        assert!(marker.is_well_formed());

        marker.speech_text = Some("   ".to_string());
        assert!(!marker.is_well_formed());

        marker.speech_text = Some("hi".to_string());
        marker.position = None;
        assert!(!marker.is_well_formed());
    }

    #[test]
    fn test_marker_deserializes_with_missing_fields() {
        let json = r#"{ "id": "m1", "route_ids": ["r1"], "sequence": 3 }"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.sequence, 3);
        assert!(marker.belongs_to("r1"));
        assert!(!marker.is_well_formed());
    }
}
