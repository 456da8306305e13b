//! Simulation error type.

use narrator_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("engine setup failed: {0}")]
    Core(#[from] CoreError),

    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
