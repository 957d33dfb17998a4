//! Command handlers - answer commands pushed by the collector
//!
//! Each handler owns one command type. The registry looks handlers up by
//! type; [`respond`] turns a handler's outcome into exactly one response
//! frame.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::ProbeError;
use crate::session::protocol::{OutboundFrame, RequestId};

/// Handler for one collector command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command type this handler answers, e.g. `get-cookies`
    fn command(&self) -> &str;

    /// Prefix of the response frame types, e.g. `cookies` for
    /// `cookies-data` / `cookies-error`
    fn response_prefix(&self) -> &str;

    /// Produce the response payload.
    ///
    /// May await external producers for as long as they take; there is no
    /// timeout on command handling.
    async fn handle(&self, params: &Map<String, Value>) -> Result<Value, ProbeError>;
}

/// Run `handler` and frame its outcome.
///
/// Always yields exactly one frame tagged with `request_id`: `-data` on
/// success, `-error` on failure. A panicking handler is reported as an error
/// too, so the collector is never left without an answer.
pub async fn respond(
    handler: &dyn CommandHandler,
    request_id: RequestId,
    params: &Map<String, Value>,
) -> OutboundFrame {
    let prefix = handler.response_prefix();
    let outcome = AssertUnwindSafe(handler.handle(params)).catch_unwind().await;

    match outcome {
        Ok(Ok(data)) => OutboundFrame::data(prefix, request_id, data),
        Ok(Err(e)) => {
            tracing::warn!("Command {} ({}) failed: {}", handler.command(), request_id, e);
            OutboundFrame::error(prefix, request_id, e.to_string())
        }
        Err(_) => {
            tracing::error!("Command {} ({}) panicked", handler.command(), request_id);
            OutboundFrame::error(prefix, request_id, "command handler panicked")
        }
    }
}

/// Handlers keyed by command type
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Add a handler, replacing any previous one for the same command
    pub fn register(&self, handler: Arc<dyn CommandHandler>) {
        tracing::debug!("Registered command handler: {}", handler.command());
        self.handlers.insert(handler.command().to_string(), handler);
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered command types, sorted
    pub fn commands(&self) -> Vec<String> {
        let mut commands: Vec<_> = self.handlers.iter().map(|e| e.key().clone()).collect();
        commands.sort();
        commands
    }
}
