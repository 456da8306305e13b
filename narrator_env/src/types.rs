//! Common types for the narrator environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to +90)
    pub latitude: f64,

    /// Longitude in degrees (-180 to +180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A single fix produced by the position source.
///
/// Fixes arrive on an irregular, possibly bursty cadence. Each one is
/// treated independently; timestamps are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Where the device is
    pub coordinate: Coordinate,

    /// Horizontal accuracy radius in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Direction of travel in degrees [0, 360), 0 = north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Ground speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Fix time (Unix milliseconds)
    pub timestamp_ms: u64,
}

impl Position {
    /// Creates a bare fix with no accuracy, heading or speed.
    pub fn new(coordinate: Coordinate, timestamp_ms: u64) -> Self {
        Self {
            coordinate,
            accuracy: None,
            heading: None,
            speed: None,
            timestamp_ms,
        }
    }

    /// Sets the horizontal accuracy (negative values are discarded).
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy = (accuracy_m >= 0.0).then_some(accuracy_m);
        self
    }

    /// Sets the heading, normalized into [0, 360).
    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading = heading_deg
            .is_finite()
            .then(|| heading_deg.rem_euclid(360.0));
        self
    }

    /// Sets the ground speed (negative values are discarded).
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed = (speed_mps >= 0.0).then_some(speed_mps);
        self
    }
}

/// One item yielded by a position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionEvent {
    /// A new fix
    Fix(Position),

    /// The device reported a failure (permission denied, timeout, ...)
    Error {
        /// Device-specific error code
        code: u16,
        /// Human-readable description
        message: String,
    },
}

/// Unique identifier for one route-tracking session.
///
/// Uses UUID v4 for global uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random SessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic SessionId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}
