//! Command channel wire protocol
//!
//! JSON text frames with a `type` field. Commands from the collector carry
//! a `requestId` which the matching response echoes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Correlation token chosen by the collector
pub type RequestId = String;

pub const HEARTBEAT: &str = "heartbeat";
pub const HEARTBEAT_RESPONSE: &str = "heartbeat-response";

pub const TAKE_SCREENSHOT: &str = "take-screenshot";
pub const GET_COOKIES: &str = "get-cookies";
pub const GET_LOCAL_STORAGE: &str = "get-local-storage";
pub const GET_SESSION_STORAGE: &str = "get-session-storage";

/// Frame received from the collector
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(rename = "requestId", default)]
    pub request_id: Option<RequestId>,
    /// Every other field of the frame
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Frame sent to the collector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Heartbeat {
        #[serde(rename = "type")]
        frame_type: &'static str,
    },
    Data {
        #[serde(rename = "type")]
        frame_type: String,
        #[serde(rename = "requestId")]
        request_id: RequestId,
        data: Value,
    },
    Error {
        #[serde(rename = "type")]
        frame_type: String,
        #[serde(rename = "requestId")]
        request_id: RequestId,
        error: String,
    },
}

impl OutboundFrame {
    pub fn heartbeat() -> Self {
        OutboundFrame::Heartbeat {
            frame_type: HEARTBEAT,
        }
    }

    /// `<prefix>-data` success response
    pub fn data(prefix: &str, request_id: RequestId, data: Value) -> Self {
        OutboundFrame::Data {
            frame_type: format!("{prefix}-data"),
            request_id,
            data,
        }
    }

    /// `<prefix>-error` failure response
    pub fn error(prefix: &str, request_id: RequestId, error: impl Into<String>) -> Self {
        OutboundFrame::Error {
            frame_type: format!("{prefix}-error"),
            request_id,
            error: error.into(),
        }
    }

    pub fn frame_type(&self) -> &str {
        match self {
            OutboundFrame::Heartbeat { frame_type } => frame_type,
            OutboundFrame::Data { frame_type, .. } | OutboundFrame::Error { frame_type, .. } => {
                frame_type
            }
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            OutboundFrame::Heartbeat { .. } => None,
            OutboundFrame::Data { request_id, .. } | OutboundFrame::Error { request_id, .. } => {
                Some(request_id)
            }
        }
    }
}
