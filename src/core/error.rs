use crate::core::worker::Stage;
use thiserror::Error;

/// Run-level failures. Per-file problems never surface here; they are reported as warning
/// progress events and recorded in the stage reports.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Unknown hash algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("A {stage} run is already in progress")]
    Busy { stage: Stage },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        SearchError::InvalidConfig {
            message: message.into(),
        }
    }
}
