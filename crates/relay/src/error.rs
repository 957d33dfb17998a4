//! Relay error types

use thiserror::Error;

use crate::collector::ValidationFailure;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid collector URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collector identity check failed: {0}")]
    Validation(ValidationFailure),

    #[error("Collector rejected request with status {0}")]
    Status(u16),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Connection closed")]
    Closed,
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Failure reported by an external producer (screenshot capture, cookie or
/// storage reader). The message is forwarded verbatim in `-error` frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProbeError(pub String);

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ProbeError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ProbeError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
