//! Collector HTTP endpoints
//!
//! One-shot requests to the local collector: identity check, event
//! ingestion and log reset. The duplex command channel lives in
//! [`crate::session`]; the two transports are independent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::{RelayError, Result};
use crate::settings::Settings;

/// Signature a genuine collector reports from its identity endpoint
pub const IDENTITY_SIGNATURE: &str = "mcp-browser-connector-24x7";

pub const IDENTITY_PATH: &str = "/.identity";
pub const INGEST_PATH: &str = "/extension-log";
pub const WIPE_PATH: &str = "/wipelogs";
pub const COMMAND_CHANNEL_PATH: &str = "/extension-ws";

/// Host and port of a collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorEndpoint {
    pub host: String,
    pub port: u16,
}

impl CollectorEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.server_host.clone(), settings.server_port)
    }

    /// `http://host:port/<path>`
    pub fn http_url(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&format!("http://{}:{}", self.host, self.port))?;
        Ok(base.join(path)?)
    }

    /// `ws://host:port/extension-ws`
    pub fn command_channel_url(&self) -> Result<Url> {
        let base = Url::parse(&format!("ws://{}:{}", self.host, self.port))?;
        Ok(base.join(COMMAND_CHANNEL_PATH)?)
    }
}

impl std::fmt::Display for CollectorEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Body of the identity endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorIdentity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Why an identity check failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("collector answered with HTTP {status}")]
    HttpError { status: u16 },

    #[error("collector signature is missing or wrong")]
    InvalidSignature,

    #[error("collector unreachable: {message}")]
    ConnectionError { message: String },
}

impl ValidationFailure {
    /// Stable reason code used in notifications
    pub fn reason_code(&self) -> &'static str {
        match self {
            ValidationFailure::HttpError { .. } => "http_error",
            ValidationFailure::InvalidSignature => "invalid_signature",
            ValidationFailure::ConnectionError { .. } => "connection_error",
        }
    }
}

/// HTTP client for the collector's one-shot endpoints
#[derive(Clone)]
pub struct CollectorClient {
    client: reqwest::Client,
    identity_timeout: Duration,
}

impl CollectorClient {
    pub fn new(identity_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            identity_timeout,
        }
    }

    /// Ask the collector who it is.
    ///
    /// Succeeds only on a 2xx answer whose `signature` equals
    /// [`IDENTITY_SIGNATURE`]. A body that is not the identity JSON counts as
    /// a wrong signature: something answered, but not a collector.
    pub async fn validate_identity(
        &self,
        endpoint: &CollectorEndpoint,
    ) -> std::result::Result<CollectorIdentity, ValidationFailure> {
        let url = endpoint
            .http_url(IDENTITY_PATH)
            .map_err(|e| ValidationFailure::ConnectionError {
                message: e.to_string(),
            })?;

        let response = self
            .client
            .get(url)
            .timeout(self.identity_timeout)
            .send()
            .await
            .map_err(|e| ValidationFailure::ConnectionError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationFailure::HttpError {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidationFailure::ConnectionError {
                message: e.to_string(),
            })?;

        let identity: CollectorIdentity =
            serde_json::from_slice(&body).map_err(|_| ValidationFailure::InvalidSignature)?;

        if identity.signature.as_deref() != Some(IDENTITY_SIGNATURE) {
            return Err(ValidationFailure::InvalidSignature);
        }

        Ok(identity)
    }

    /// POST an ingestion envelope, returning the collector's JSON reply
    pub async fn post_log(&self, endpoint: &CollectorEndpoint, envelope: &Value) -> Result<Value> {
        let url = endpoint.http_url(INGEST_PATH)?;
        let response = self.client.post(url).json(envelope).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Ask the collector to drop every stored log
    pub async fn wipe_logs(&self, endpoint: &CollectorEndpoint) -> Result<()> {
        let url = endpoint.http_url(WIPE_PATH)?;
        let response = self.client.post(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl Default for CollectorClient {
    fn default() -> Self {
        Self::new(crate::settings::SessionTimings::default().identity_timeout)
    }
}
