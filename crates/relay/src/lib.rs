//! Telemetry relay between an instrumented page and a local collector
//!
//! A capture context owns one [`CaptureRelay`]. Captured records flow out
//! through it as bounded, redacted HTTP posts; commands from the collector
//! flow in over a single WebSocket held by the [`SessionManager`].
//!
//! # Layout
//!
//! - [`collector`]: identity check, ingestion and wipe endpoints
//! - [`session`]: the command channel, its heartbeat and reconnect loop
//! - [`handler`] / [`handlers`]: command dispatch and the built-in commands
//! - [`relay`]: record shaping and the coordinator itself

pub mod collector;
pub mod error;
pub mod events;
pub mod handler;
pub mod handlers;
pub mod probe;
pub mod record;
pub mod relay;
pub mod session;
pub mod settings;

pub use collector::{CollectorClient, CollectorEndpoint, CollectorIdentity, ValidationFailure};
pub use error::{ProbeError, RelayError, Result};
pub use events::{EventBus, RelayEvent};
pub use handler::{CommandHandler, HandlerRegistry};
pub use probe::{PageProbe, StorageArea};
pub use record::{EventKind, EventRecord};
pub use relay::{build_envelope, CaptureRelay};
pub use session::{ConnectionState, SessionManager};
pub use settings::{SessionTimings, Settings};
