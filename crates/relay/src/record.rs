//! Event records handed over by producers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of captured event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    NetworkRequest,
    ConsoleLog,
    ConsoleError,
    SelectedElement,
    CookiesData,
    StorageData,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NetworkRequest => "network-request",
            EventKind::ConsoleLog => "console-log",
            EventKind::ConsoleError => "console-error",
            EventKind::SelectedElement => "selected-element",
            EventKind::CookiesData => "cookies-data",
            EventKind::StorageData => "storage-data",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured event. The payload shape is up to the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub kind: EventKind,
    pub payload: Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl EventRecord {
    /// New record stamped with the current time
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: now_millis(),
        }
    }

    pub fn with_timestamp(kind: EventKind, payload: Value, timestamp: u64) -> Self {
        Self {
            kind,
            payload,
            timestamp,
        }
    }

    /// The `data` half of the ingestion envelope: payload fields plus `type`
    /// and `timestamp`. Non-object payloads are nested under `payload`.
    pub fn into_data(self) -> Value {
        let mut data = match self.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };
        data.insert("type".to_string(), Value::String(self.kind.as_str().to_string()));
        data.insert("timestamp".to_string(), Value::from(self.timestamp));
        Value::Object(data)
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
