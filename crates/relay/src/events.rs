//! Event Bus - lifecycle notifications of a capture context
//!
//! Observers (UI badges, tests, logs) subscribe here. Nothing in the relay
//! waits on subscribers; publishing with none attached is fine.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::collector::ValidationFailure;
use crate::record::EventKind;
use crate::session::ConnectionState;

/// Notifications published by the session layer and the relay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    StateChanged {
        state: ConnectionState,
    },
    ValidationSucceeded {
        name: String,
        version: String,
    },
    ValidationFailed {
        reason: ValidationFailure,
    },
    ReconnectScheduled {
        delay_ms: u64,
    },
    Closed {
        code: u16,
        intentional: bool,
    },
    CommandIgnored {
        command: String,
        reason: String,
    },
    EventSent {
        kind: EventKind,
    },
    TransmissionFailed {
        kind: EventKind,
        reason: String,
    },
    LogsWiped,
}

/// Simple event bus using tokio broadcast channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RelayEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: RelayEvent) {
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
