//! Error types for the narrator environment abstraction.

use thiserror::Error;

/// Errors that can occur at the environment boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The position stream terminated permanently
    #[error("Position source closed")]
    PositionSourceClosed,

    /// The device reported a positioning failure
    #[error("Position error: {0}")]
    PositionError(String),
}

impl EnvError {
    /// Creates a position error from a device code and message.
    pub fn position(code: u16, message: impl std::fmt::Display) -> Self {
        Self::PositionError(format!("code {}: {}", code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_error_display() {
        let err = EnvError::position(1, "permission denied");
        assert_eq!(err.to_string(), "Position error: code 1: permission denied");
    }

    #[test]
    fn test_position_source_closed_display() {
        assert_eq!(EnvError::PositionSourceClosed.to_string(), "Position source closed");
    }
}
