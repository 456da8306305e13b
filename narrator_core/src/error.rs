//! Error types for the narration engine.

use thiserror::Error;

/// Errors surfaced by session setup and configuration.
///
/// Runtime "nothing to do" conditions (no position, off route, sequence
/// exhausted) are not errors; they are reported as step outcomes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    #[error("Route {0} has fewer than two points")]
    EmptyRoute(String),

    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Session loop has shut down")]
    SessionClosed,

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl CoreError {
    /// Creates an invalid-config error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = CoreError::invalid_config("proximity_threshold_m", "must be >= 0, got -1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: proximity_threshold_m must be >= 0, got -1"
        );
    }

    #[test]
    fn test_config_parse_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = parse.into();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }
}
