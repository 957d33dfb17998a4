//! Shared types: redaction mode, cookies and the marker strings
//! substituted into bounded payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Replaces any value classified as sensitive.
pub const REDACTED_MARKER: &str = "[SENSITIVE DATA REDACTED]";

/// Appended to strings cut down to the length limit.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Stands in for a subtree nested deeper than [`MAX_DEPTH`].
pub const DEPTH_EXCEEDED_MARKER: &str = "[MAX_DEPTH_EXCEEDED]";

/// Stands in for a field whose transform failed.
pub const ERROR_MARKER: &str = "[ERROR_PROCESSING]";

/// Nesting depth past which a subtree is no longer walked.
/// There is no identity-based cycle detection, this is the only guard.
pub const MAX_DEPTH: usize = 100;

/// How aggressively cookie and storage values are redacted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensitiveDataMode {
    /// Every value is redacted
    HideAll,
    /// Only values whose key or content looks sensitive
    #[default]
    HideSensitive,
    /// Nothing is redacted
    ShowAll,
}

impl SensitiveDataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveDataMode::HideAll => "hide-all",
            SensitiveDataMode::HideSensitive => "hide-sensitive",
            SensitiveDataMode::ShowAll => "show-all",
        }
    }
}

impl std::fmt::Display for SensitiveDataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser cookie.
///
/// Only `name` and `value` take part in filtering; everything else the
/// reader reported (domain, path, expiry...) rides along in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: Map::new(),
        }
    }
}
