//! Capture Relay - the coordinator of a capture context
//!
//! Producers hand records in; the relay bounds and redacts them and posts
//! them to the collector. In the other direction it registers the command
//! handlers that answer the collector through the [`SessionManager`].

use sanitize::{
    filter_cookies, filter_storage, process_structured_text, transform_strings, truncate_str,
    truncate_strings, SensitiveDataMode, REDACTED_MARKER,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::collector::{CollectorClient, CollectorEndpoint};
use crate::error::{RelayError, Result};
use crate::events::{EventBus, RelayEvent};
use crate::handlers::{CookiesHandler, ScreenshotHandler, StorageHandler};
use crate::probe::PageProbe;
use crate::record::{EventKind, EventRecord};
use crate::session::SessionManager;
use crate::settings::{SessionTimings, Settings, SharedSettings};

/// Fields of a network-request payload that hold request/response text
const NETWORK_TEXT_FIELDS: &[&str] = &["requestBody", "responseBody"];
/// Fields of a console payload that hold the logged text
const CONSOLE_TEXT_FIELDS: &[&str] = &["message"];

/// Coordinator of one capture context
pub struct CaptureRelay {
    settings: SharedSettings,
    collector: CollectorClient,
    session: SessionManager,
    events: EventBus,
}

impl CaptureRelay {
    /// Build a relay with default timings. Must be called inside a tokio
    /// runtime.
    pub fn new(settings: Settings, probe: Arc<dyn PageProbe>) -> Result<Self> {
        Self::with_timings(settings, SessionTimings::default(), probe)
    }

    pub fn with_timings(
        settings: Settings,
        timings: SessionTimings,
        probe: Arc<dyn PageProbe>,
    ) -> Result<Self> {
        settings.validate()?;

        let events = EventBus::new();
        let session = SessionManager::new(&settings, timings, events.clone());
        let settings: SharedSettings = Arc::new(RwLock::new(Arc::new(settings)));

        session.register_handler(Arc::new(ScreenshotHandler::new(probe.clone())));
        session.register_handler(Arc::new(CookiesHandler::new(
            probe.clone(),
            settings.clone(),
        )));
        session.register_handler(Arc::new(StorageHandler::local(
            probe.clone(),
            settings.clone(),
        )));
        session.register_handler(Arc::new(StorageHandler::session(probe, settings.clone())));

        Ok(Self {
            settings,
            collector: CollectorClient::new(timings.identity_timeout),
            session,
            events,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current settings snapshot
    pub async fn settings(&self) -> Arc<Settings> {
        self.settings.read().await.clone()
    }

    /// Open the command channel
    pub async fn start(&self) -> Result<()> {
        self.session.connect().await
    }

    /// Bound, redact and post one record.
    ///
    /// The collector's identity is checked first, every time. If that fails
    /// the record is dropped; there is no per-record retry.
    pub async fn relay(&self, record: EventRecord) -> Result<()> {
        let settings = self.settings().await;
        let endpoint = CollectorEndpoint::from_settings(&settings);
        let kind = record.kind;

        if let Err(failure) = self.collector.validate_identity(&endpoint).await {
            tracing::warn!(
                kind = %kind,
                reason = failure.reason_code(),
                "Dropping event, collector at {} failed identity check",
                endpoint
            );
            self.events.publish(RelayEvent::TransmissionFailed {
                kind,
                reason: failure.to_string(),
            });
            return Err(RelayError::Validation(failure));
        }

        let envelope = build_envelope(record, &settings);
        match self.collector.post_log(&endpoint, &envelope).await {
            Ok(_) => {
                tracing::debug!(kind = %kind, "Event delivered");
                self.events.publish(RelayEvent::EventSent { kind });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(kind = %kind, "Event transmission failed: {}", e);
                self.events.publish(RelayEvent::TransmissionFailed {
                    kind,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Clear every log the collector holds
    pub async fn wipe_logs(&self) -> Result<()> {
        let settings = self.settings().await;
        let endpoint = CollectorEndpoint::from_settings(&settings);
        self.collector.wipe_logs(&endpoint).await?;
        tracing::info!("Collector logs wiped");
        self.events.publish(RelayEvent::LogsWiped);
        Ok(())
    }

    /// Replace the settings snapshot.
    ///
    /// Limits and redaction mode apply from the next record on. A new
    /// host/port reconnects the command channel; the return value says
    /// whether that happened.
    pub async fn update_settings(&self, settings: Settings) -> Result<bool> {
        settings.validate()?;
        let previous = std::mem::replace(
            &mut *self.settings.write().await,
            Arc::new(settings.clone()),
        );
        if !previous.endpoint_changed(&settings) {
            return Ok(false);
        }
        Ok(self.session.apply_settings(&settings).await)
    }

    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}

/// The ingestion body: `{data, settings}`
pub fn build_envelope(record: EventRecord, settings: &Settings) -> Value {
    json!({
        "data": bound_record(record, settings).into_data(),
        "settings": settings.envelope(),
    })
}

/// Apply size limits and redaction to a record according to its kind
pub fn bound_record(record: EventRecord, settings: &Settings) -> EventRecord {
    let mode = settings.sensitive_data_mode;
    let payload = match record.kind {
        EventKind::NetworkRequest => bound_text_fields(record.payload, NETWORK_TEXT_FIELDS, settings),
        EventKind::ConsoleLog | EventKind::ConsoleError => {
            bound_text_fields(record.payload, CONSOLE_TEXT_FIELDS, settings)
        }
        EventKind::SelectedElement => truncate_strings(&record.payload, settings.string_size_limit),
        EventKind::CookiesData => bound_redacted(
            &redact_field(record.payload, "cookies", mode, filter_cookies),
            settings.string_size_limit,
        ),
        EventKind::StorageData => bound_redacted(
            &redact_field(record.payload, "storage", mode, filter_storage),
            settings.string_size_limit,
        ),
    };

    EventRecord { payload, ..record }
}

fn bound_text_fields(payload: Value, fields: &[&str], settings: &Settings) -> Value {
    let Value::Object(mut map) = payload else {
        return truncate_strings(&payload, settings.string_size_limit);
    };

    for field in fields {
        if let Some(value) = map.get_mut(*field) {
            *value = match value.take() {
                Value::String(text) => Value::String(process_structured_text(
                    &text,
                    settings.string_size_limit,
                    settings.max_log_size,
                )),
                Value::Null => Value::Null,
                other => truncate_strings(&other, settings.string_size_limit),
            };
        }
    }

    Value::Object(map)
}

/// Truncate every string except the redaction marker, which must survive
/// any limit
fn bound_redacted(payload: &Value, max_len: usize) -> Value {
    transform_strings(payload, |text| {
        Ok(Value::String(if text == REDACTED_MARKER {
            text.to_string()
        } else {
            truncate_str(text, max_len)
        }))
    })
}

/// Filter `payload[field]` if the payload carries it, the whole payload
/// otherwise
fn redact_field(
    payload: Value,
    field: &str,
    mode: SensitiveDataMode,
    filter: fn(&Value, SensitiveDataMode) -> Value,
) -> Value {
    if mode == SensitiveDataMode::ShowAll {
        return payload;
    }

    match payload {
        Value::Object(mut map) if map.contains_key(field) => {
            let filtered = filter(&map[field], mode);
            map.insert(field.to_string(), filtered);
            Value::Object(map)
        }
        other => filter(&other, mode),
    }
}
