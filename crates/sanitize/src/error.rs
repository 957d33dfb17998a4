//! Error types for payload sanitization
//!
//! Flat on purpose. Most of the pipeline never surfaces these to callers:
//! a failed field is swapped for a marker and the walk moves on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SanitizeError>;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("Failed to transform field {key}: {reason}")]
    Transform { key: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SanitizeError {
    pub fn transform(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transform {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
