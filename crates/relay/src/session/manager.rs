//! Session Manager - owns the command channel to the collector
//!
//! Design decisions:
//! 1. One socket per capture context. Connect and close are serialized by a
//!    lifecycle lock so they can never interleave.
//! 2. Identity is checked over HTTP before every socket is opened.
//! 3. Retries are timers that post a message to a single control task.
//!    Cancelling a timer bumps an epoch, so a timer that already fired is
//!    ignored instead of reconnecting behind a `close()`.
//! 4. Every socket gets a generation number. Events from a socket that has
//!    since been replaced are dropped.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::protocol::{InboundFrame, OutboundFrame, HEARTBEAT_RESPONSE};
use super::state::{should_reconnect, ConnectionState, CLOSE_ABNORMAL, CLOSE_NORMAL, CLOSE_NO_STATUS};
use crate::collector::{CollectorClient, CollectorEndpoint};
use crate::error::{RelayError, Result};
use crate::events::{EventBus, RelayEvent};
use crate::handler::{respond, CommandHandler, HandlerRegistry};
use crate::settings::{SessionTimings, Settings};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Messages to the control task
#[derive(Debug)]
enum Control {
    /// A reconnect timer fired
    Reconnect { epoch: u64 },
}

/// Long-lived tasks; at most one of each
#[derive(Default)]
struct Tasks {
    control: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

struct Inner {
    context_id: Uuid,
    timings: SessionTimings,
    collector: CollectorClient,
    handlers: HandlerRegistry,
    events: EventBus,

    /// Cached connection parameters, replaced on settings change
    endpoint: RwLock<CollectorEndpoint>,
    state: watch::Sender<ConnectionState>,

    /// Write half of the live socket
    sink: tokio::sync::Mutex<Option<WsSink>>,
    /// Held for the whole of a connect or close
    lifecycle: tokio::sync::Mutex<()>,
    tasks: Mutex<Tasks>,

    generation: AtomicU64,
    reconnect_epoch: AtomicU64,
    intentional_close: AtomicBool,
    /// Set by a failed validation or an endpoint switch, cleared by the next
    /// successful validation. Since a socket only opens after a successful
    /// validation, a live socket sees it set only when the peer closes in the
    /// window between an endpoint switch and the intentional close that
    /// follows it.
    revalidation_pending: AtomicBool,
    /// Terminal: no connect or retry after `shutdown()`
    shut_down: AtomicBool,

    control: mpsc::UnboundedSender<Control>,
}

/// Owns the duplex connection of one capture context.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a disconnected manager. Must be called inside a tokio runtime.
    pub fn new(settings: &Settings, timings: SessionTimings, events: EventBus) -> Self {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let inner = Arc::new(Inner {
            context_id: Uuid::now_v7(),
            timings,
            collector: CollectorClient::new(timings.identity_timeout),
            handlers: HandlerRegistry::new(),
            events,
            endpoint: RwLock::new(CollectorEndpoint::from_settings(settings)),
            state,
            sink: tokio::sync::Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            tasks: Mutex::new(Tasks::default()),
            generation: AtomicU64::new(0),
            reconnect_epoch: AtomicU64::new(0),
            intentional_close: AtomicBool::new(false),
            revalidation_pending: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            control: control_tx,
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let control = tokio::spawn(async move {
            while let Some(Control::Reconnect { epoch }) = control_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                // Failures are reported and rescheduled inside
                let _ = inner.connect(Some(epoch)).await;
            }
        });
        inner.tasks().control = Some(control);

        Self { inner }
    }

    /// Unique id of this capture context, used in log fields
    pub fn context_id(&self) -> Uuid {
        self.inner.context_id
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub async fn endpoint(&self) -> CollectorEndpoint {
        self.inner.endpoint.read().await.clone()
    }

    /// Register a handler for inbound commands
    pub fn register_handler(&self, handler: Arc<dyn CommandHandler>) {
        self.inner.handlers.register(handler);
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// Validate the collector and open the command channel.
    ///
    /// Does nothing if a connection or an attempt already exists. On failure
    /// a retry is already scheduled when this returns.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect(None).await
    }

    /// Close the channel on purpose. No reconnect follows.
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Send a frame. Fails with [`RelayError::Closed`] when no socket is open.
    pub async fn send(&self, frame: &OutboundFrame) -> Result<()> {
        self.inner.send(frame).await
    }

    /// Take a new settings snapshot.
    ///
    /// Only host/port matter here: if they changed the channel is closed,
    /// the new collector validated and the channel reopened. Returns whether
    /// that happened.
    pub async fn apply_settings(&self, settings: &Settings) -> bool {
        if self.inner.is_shut_down() {
            return false;
        }
        let next = CollectorEndpoint::from_settings(settings);
        {
            let mut endpoint = self.inner.endpoint.write().await;
            if *endpoint == next {
                return false;
            }
            tracing::info!(
                context = %self.inner.context_id,
                "Collector moved from {} to {}, reconnecting",
                *endpoint,
                next
            );
            *endpoint = next;
        }

        self.inner.revalidation_pending.store(true, Ordering::SeqCst);
        self.inner.close().await;
        if let Err(e) = self.inner.connect(None).await {
            tracing::warn!(context = %self.inner.context_id, "Reconnect to new collector failed: {}", e);
        }
        true
    }

    /// Close intentionally and stop the control task. The manager cannot be
    /// reconnected afterwards.
    pub async fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        self.inner.close().await;
        if let Some(control) = self.inner.tasks().control.take() {
            control.abort();
        }
    }
}

impl Inner {
    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(context = %self.context_id, "Connection state {:?} -> {:?}", previous, next);
            self.events.publish(RelayEvent::StateChanged { state: next });
        }
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// One connection attempt. `epoch` is set when a retry timer asked for
    /// it; a stale epoch means the timer was cancelled after firing.
    async fn connect(self: &Arc<Self>, epoch: Option<u64>) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.is_shut_down() {
            return Err(RelayError::Closed);
        }

        if let Some(epoch) = epoch {
            if epoch != self.reconnect_epoch.load(Ordering::SeqCst) {
                tracing::debug!(context = %self.context_id, "Ignoring cancelled reconnect");
                return Ok(());
            }
        }

        let state = self.current_state();
        if state.is_active() {
            tracing::debug!(context = %self.context_id, "Connect requested while {:?}, ignoring", state);
            return Ok(());
        }

        self.cancel_reconnect();
        self.intentional_close.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Validating);

        let endpoint = self.endpoint.read().await.clone();
        match self.collector.validate_identity(&endpoint).await {
            Ok(identity) => {
                self.revalidation_pending.store(false, Ordering::SeqCst);
                tracing::info!(
                    context = %self.context_id,
                    "Collector {} identified as {} {}",
                    endpoint,
                    identity.name,
                    identity.version
                );
                self.events.publish(RelayEvent::ValidationSucceeded {
                    name: identity.name,
                    version: identity.version,
                });
            }
            Err(failure) => {
                tracing::warn!(
                    context = %self.context_id,
                    reason = failure.reason_code(),
                    "Collector {} failed identity check: {}",
                    endpoint,
                    failure
                );
                self.revalidation_pending.store(true, Ordering::SeqCst);
                self.events.publish(RelayEvent::ValidationFailed {
                    reason: failure.clone(),
                });
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
                return Err(RelayError::Validation(failure));
            }
        }

        self.set_state(ConnectionState::Connecting);

        let url = match endpoint.command_channel_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(context = %self.context_id, "Cannot build command channel URL: {}", e);
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let connected =
            tokio::time::timeout(self.timings.connect_timeout, connect_async(url.as_str())).await;
        let ws = match connected {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => {
                tracing::error!(context = %self.context_id, "Command channel upgrade failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!(context = %self.context_id, "Command channel upgrade timed out");
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
                return Err(RelayError::Closed);
            }
        };

        let (sink, stream) = ws.split();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.sink.lock().await = Some(sink);

        self.set_state(ConnectionState::Open);
        self.start_heartbeat();
        self.start_reader(generation, stream);

        tracing::info!(context = %self.context_id, "Command channel open at {}", url);
        tracing::debug!(context = %self.context_id, commands = ?self.handlers.commands(), "Accepting commands");
        Ok(())
    }

    async fn close(self: &Arc<Self>) {
        self.intentional_close.store(true, Ordering::SeqCst);
        self.cancel_reconnect();

        let _lifecycle = self.lifecycle.lock().await;
        // An attempt that finished while we waited may have scheduled a retry
        self.cancel_reconnect();
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(reader) = self.tasks().reader.take() {
            reader.abort();
        }

        if self.teardown().await {
            tracing::info!(context = %self.context_id, "Command channel closed");
            self.events.publish(RelayEvent::Closed {
                code: CLOSE_NORMAL,
                intentional: true,
            });
        }
    }

    /// Called by the reader once its socket is gone
    async fn on_closed(self: &Arc<Self>, generation: u64, code: u16) {
        let _lifecycle = self.lifecycle.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);

        // This task is the reader; detach rather than abort ourselves
        drop(self.tasks().reader.take());

        let intentional = self.intentional_close.swap(false, Ordering::SeqCst);
        self.teardown().await;
        self.events.publish(RelayEvent::Closed { code, intentional });

        let revalidation_pending = self.revalidation_pending.load(Ordering::SeqCst);
        if should_reconnect(code, intentional, revalidation_pending) {
            tracing::warn!(context = %self.context_id, "Command channel closed with code {}", code);
            self.schedule_reconnect();
        } else {
            tracing::info!(
                context = %self.context_id,
                "Command channel closed with code {}, not reconnecting",
                code
            );
        }
    }

    /// Stop the heartbeat and drop the socket. Returns whether one was open.
    async fn teardown(&self) -> bool {
        if let Some(heartbeat) = self.tasks().heartbeat.take() {
            heartbeat.abort();
        }

        let sink = self.sink.lock().await.take();
        let had_socket = sink.is_some();
        if let Some(mut sink) = sink {
            self.set_state(ConnectionState::Closing);
            // Already closed by the peer in the common case
            let _ = sink.close().await;
        }

        self.set_state(ConnectionState::Disconnected);
        had_socket
    }

    fn schedule_reconnect(&self) {
        if self.is_shut_down() {
            return;
        }
        let delay = self.timings.reconnect_delay;
        let epoch = self.reconnect_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let control = self.control.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = control.send(Control::Reconnect { epoch });
        });
        if let Some(previous) = self.tasks().reconnect.replace(timer) {
            previous.abort();
        }

        tracing::info!(context = %self.context_id, "Reconnecting in {:?}", delay);
        self.events.publish(RelayEvent::ReconnectScheduled {
            delay_ms: delay.as_millis() as u64,
        });
    }

    fn cancel_reconnect(&self) {
        self.reconnect_epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = self.tasks().reconnect.take() {
            timer.abort();
        }
    }

    fn start_heartbeat(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.timings.heartbeat_interval;

        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let open = inner.current_state() == ConnectionState::Open;
                if !open {
                    continue;
                }
                if let Err(e) = inner.send(&OutboundFrame::heartbeat()).await {
                    tracing::debug!(context = %inner.context_id, "Heartbeat not sent: {}", e);
                }
            }
        });

        if let Some(previous) = self.tasks().heartbeat.replace(ticker) {
            previous.abort();
        }
    }

    fn start_reader(self: &Arc<Self>, generation: u64, mut stream: SplitStream<WsStream>) {
        let inner = Arc::clone(self);

        let reader = tokio::spawn(async move {
            let code = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => inner.handle_frame(&text),
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or(CLOSE_NO_STATUS, |f| u16::from(f.code));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(context = %inner.context_id, "Command channel error: {}", e);
                        break CLOSE_ABNORMAL;
                    }
                    None => break CLOSE_ABNORMAL,
                }
            };
            inner.on_closed(generation, code).await;
        });

        if let Some(previous) = self.tasks().reader.replace(reader) {
            previous.abort();
        }
    }

    /// Route one inbound frame. Handlers run on their own tasks so a slow
    /// producer never blocks the reader.
    fn handle_frame(self: &Arc<Self>, text: &str) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(context = %self.context_id, "Ignoring malformed frame: {}", e);
                return;
            }
        };

        if frame.frame_type == HEARTBEAT_RESPONSE {
            tracing::trace!(context = %self.context_id, "Heartbeat acknowledged");
            return;
        }

        let Some(handler) = self.handlers.get(&frame.frame_type) else {
            tracing::debug!(context = %self.context_id, "Ignoring unknown command {}", frame.frame_type);
            self.events.publish(RelayEvent::CommandIgnored {
                command: frame.frame_type,
                reason: "unknown command".to_string(),
            });
            return;
        };

        let Some(request_id) = frame.request_id else {
            tracing::warn!(context = %self.context_id, "Ignoring {} without requestId", frame.frame_type);
            self.events.publish(RelayEvent::CommandIgnored {
                command: frame.frame_type,
                reason: "missing requestId".to_string(),
            });
            return;
        };

        tracing::debug!(context = %self.context_id, "Command {} ({})", frame.frame_type, request_id);
        let params = frame.params;
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let response = respond(handler.as_ref(), request_id, &params).await;
            if let Err(e) = inner.send(&response).await {
                // Best effort: the socket went away while the handler ran
                tracing::debug!(
                    context = %inner.context_id,
                    "Dropped {} response: {}",
                    response.frame_type(),
                    e
                );
            }
        });
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(RelayError::Closed)?;
        sink.send(Message::Text(json)).await?;
        Ok(())
    }
}
