//! Capture settings
//!
//! An immutable snapshot supplied by whoever owns the settings UI. Replacing
//! it is the only way to change behaviour at runtime.

use sanitize::SensitiveDataMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{RelayError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3025;

/// The current snapshot, shared between the relay and its command handlers.
/// Writers swap the whole `Arc`; readers never see a half-updated value.
pub type SharedSettings = Arc<RwLock<Arc<Settings>>>;

/// Settings snapshot, camelCase on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Number of log entries the collector keeps
    pub log_limit: usize,
    /// Character limit for query results on the collector side
    pub query_limit: usize,
    /// Per-string character limit applied before sending
    pub string_size_limit: usize,
    /// Byte budget for a structured text field that parses to an array
    pub max_log_size: usize,
    pub show_request_headers: bool,
    pub show_response_headers: bool,
    pub sensitive_data_mode: SensitiveDataMode,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_limit: 50,
            query_limit: 30_000,
            string_size_limit: 500,
            max_log_size: 20_000,
            show_request_headers: false,
            show_response_headers: false,
            sensitive_data_mode: SensitiveDataMode::HideSensitive,
            server_host: DEFAULT_HOST.to_string(),
            server_port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_host.trim().is_empty() {
            return Err(RelayError::InvalidSettings("serverHost is empty".into()));
        }
        if self.server_port == 0 {
            return Err(RelayError::InvalidSettings("serverPort is 0".into()));
        }
        if self.string_size_limit == 0 || self.max_log_size == 0 {
            return Err(RelayError::InvalidSettings(
                "stringSizeLimit and maxLogSize must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether switching to `other` requires a new connection
    pub fn endpoint_changed(&self, other: &Settings) -> bool {
        self.server_host != other.server_host || self.server_port != other.server_port
    }

    /// The subset of settings sent along with every event
    pub fn envelope(&self) -> EnvelopeSettings {
        EnvelopeSettings {
            log_limit: self.log_limit,
            query_limit: self.query_limit,
            show_request_headers: self.show_request_headers,
            show_response_headers: self.show_response_headers,
            sensitive_data_mode: self.sensitive_data_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSettings {
    pub log_limit: usize,
    pub query_limit: usize,
    pub show_request_headers: bool,
    pub show_response_headers: bool,
    pub sensitive_data_mode: SensitiveDataMode,
}

/// Fixed delays of the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Wait before retrying after a failed validation or an abnormal close
    pub reconnect_delay: Duration,
    /// Interval between heartbeat frames while the socket is open
    pub heartbeat_interval: Duration,
    /// Timeout of the identity request
    pub identity_timeout: Duration,
    /// Timeout of the WebSocket upgrade
    pub connect_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(25),
            identity_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
