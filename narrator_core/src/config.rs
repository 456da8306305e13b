//! Tracking configuration.
//!
//! Every field has a default, so a config file only needs to list the
//! values it overrides:
//!
//! ```json
//! { "announcement_distance_m": 35.0, "min_announcement_interval_ms": 15000 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CoreError;
pub use crate::model::OrderingPolicy;

/// Distance from the nearest route point that still counts as on-route (meters).
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 100.0;

/// Distance to a marker at which it is announced (meters).
pub const DEFAULT_ANNOUNCEMENT_DISTANCE_M: f64 = 50.0;

/// Minimum spacing between two accepted announcements.
pub const DEFAULT_MIN_ANNOUNCEMENT_INTERVAL_MS: u64 = 12_000;

/// Periodic proximity re-evaluation interval.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 1_000;

/// What to do with a marker that lacks a position or speech text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedMarkerPolicy {
    /// Record it as passed without narration and move on.
    #[default]
    Skip,

    /// Wait on it forever; later markers in the session never fire.
    Stall,
}

/// Configuration for one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// On-route radius around the nearest route point (default: 100 m)
    pub proximity_threshold_m: f64,

    /// Marker trigger radius (default: 50 m)
    pub announcement_distance_m: f64,

    /// Minimum gap between accepted announcements (default: 12 s)
    pub min_announcement_interval_ms: u64,

    /// Periodic re-evaluation interval (default: 1 s)
    pub check_interval_ms: u64,

    /// User audio toggle (default: on)
    pub announcements_enabled: bool,

    /// Ordering of markers shared between routes
    pub ordering: OrderingPolicy,

    /// Handling of markers missing a position or speech text
    pub malformed_markers: MalformedMarkerPolicy,

    /// Also run the tracker step on periodic ticks, using the last fix.
    ///
    /// Lets a marker refused by the throttle fire once the window opens
    /// even if the position stream has gone quiet.
    pub retry_on_tick: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
            announcement_distance_m: DEFAULT_ANNOUNCEMENT_DISTANCE_M,
            min_announcement_interval_ms: DEFAULT_MIN_ANNOUNCEMENT_INTERVAL_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            announcements_enabled: true,
            ordering: OrderingPolicy::default(),
            malformed_markers: MalformedMarkerPolicy::default(),
            retry_on_tick: true,
        }
    }
}

impl TrackingConfig {
    /// Parses a JSON document, filling unspecified fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects thresholds that are negative or not finite, and a zero check interval.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_distance("proximity_threshold_m", self.proximity_threshold_m)?;
        check_distance("announcement_distance_m", self.announcement_distance_m)?;

        if self.check_interval_ms == 0 {
            return Err(CoreError::invalid_config(
                "check_interval_ms",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Minimum interval as a `Duration`.
    pub fn min_announcement_interval(&self) -> Duration {
        Duration::from_millis(self.min_announcement_interval_ms)
    }

    /// Check interval as a `Duration`.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

fn check_distance(field: &'static str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::invalid_config(
            field,
            format!("must be a finite value >= 0, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_config_default() {
        let config = TrackingConfig::default();
        assert_eq!(config.proximity_threshold_m, 100.0);
        assert_eq!(config.announcement_distance_m, 50.0);
        assert_eq!(config.min_announcement_interval(), Duration::from_secs(12));
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert!(config.announcements_enabled);
        assert_eq!(config.ordering, OrderingPolicy::Global);
        assert_eq!(config.malformed_markers, MalformedMarkerPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TrackingConfig::from_json_str(
            r#"{ "announcement_distance_m": 35.0, "ordering": "per_route" }"#,
        )
        .unwrap();

        assert_eq!(config.announcement_distance_m, 35.0);
        assert_eq!(config.ordering, OrderingPolicy::PerRoute);
        assert_eq!(config.proximity_threshold_m, 100.0);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = TrackingConfig {
            proximity_threshold_m: -1.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidConfig { field: "proximity_threshold_m", .. }
        ));
    }

    #[test]
    fn test_nan_distance_rejected() {
        let config = TrackingConfig {
            announcement_distance_m: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_check_interval_rejected() {
        let err = TrackingConfig::from_json_str(r#"{ "check_interval_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field: "check_interval_ms", .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = TrackingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TrackingConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CoreError::ConfigIo(_)));
    }
}
