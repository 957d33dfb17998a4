//! Command channel to the collector
//!
//! Core principle: one WebSocket per capture context, owned by a single
//! [`SessionManager`]. Nobody else touches the socket or its timers.

pub mod manager;
pub mod protocol;
pub mod state;

pub use manager::SessionManager;
pub use protocol::{InboundFrame, OutboundFrame, RequestId};
pub use state::{should_reconnect, ConnectionState};
