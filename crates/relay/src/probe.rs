//! External producers the relay calls back into
//!
//! The host implements [`PageProbe`] on top of whatever browser access it
//! has (debugger protocol, extension APIs...). The relay only awaits it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProbeError;
use crate::session::protocol::{GET_LOCAL_STORAGE, GET_SESSION_STORAGE};

/// Web storage area of the inspected page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Session,
}

impl StorageArea {
    /// Collector command that requests this area
    pub fn command(&self) -> &'static str {
        match self {
            StorageArea::Local => GET_LOCAL_STORAGE,
            StorageArea::Session => GET_SESSION_STORAGE,
        }
    }

    /// Prefix of the response frame types
    pub fn response_prefix(&self) -> &'static str {
        match self {
            StorageArea::Local => "local-storage",
            StorageArea::Session => "session-storage",
        }
    }
}

/// Access to the live page, supplied by the host
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// Capture the visible tab, typically as a `data:image/png;base64,...` URL
    async fn capture_screenshot(&self) -> Result<String, ProbeError>;

    /// Cookies of the inspected page as an array of `{name, value, ...}`
    async fn read_cookies(&self) -> Result<Value, ProbeError>;

    /// Key/value dump of one storage area
    async fn read_storage(&self, area: StorageArea) -> Result<Value, ProbeError>;
}
