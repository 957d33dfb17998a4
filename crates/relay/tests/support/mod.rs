//! In-process collector for integration tests
//!
//! A hyper HTTP/1.1 server for the identity, ingestion and wipe endpoints.
//! `/extension-ws` upgrades to a WebSocket that is handed to the test.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONNECTION, CONTENT_TYPE, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, UPGRADE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::upgrade::Upgraded;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use relay::{PageProbe, ProbeError, RelayEvent, SessionTimings, Settings, StorageArea};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub const SIGNATURE: &str = "mcp-browser-connector-24x7";
pub const WAIT: Duration = Duration::from_secs(5);

pub type ServerSocket = WebSocketStream<TokioIo<Upgraded>>;

#[derive(Default)]
struct MockState {
    signature: Mutex<String>,
    identity_status: AtomicU16,
    logs: Mutex<Vec<Value>>,
    wipes: AtomicUsize,
    upgrades: AtomicUsize,
}

pub struct MockCollector {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    sockets: mpsc::UnboundedReceiver<ServerSocket>,
    task: JoinHandle<()>,
}

impl MockCollector {
    /// A genuine collector
    pub async fn start() -> Self {
        Self::with_signature(SIGNATURE).await
    }

    pub async fn with_signature(signature: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState::default());
        *state.signature.lock().unwrap() = signature.to_string();
        state.identity_status.store(200, Ordering::SeqCst);

        let (tx, sockets) = mpsc::unbounded_channel();
        let shared = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| route(req, state.clone(), tx.clone()));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .with_upgrades()
                        .await;
                });
            }
        });

        Self {
            addr,
            state,
            sockets,
            task,
        }
    }

    pub fn set_identity_status(&self, status: u16) {
        self.state.identity_status.store(status, Ordering::SeqCst);
    }

    pub fn set_signature(&self, signature: &str) {
        *self.state.signature.lock().unwrap() = signature.to_string();
    }

    /// Settings pointing at this collector
    pub fn settings(&self) -> Settings {
        Settings {
            server_host: "127.0.0.1".into(),
            server_port: self.addr.port(),
            ..Settings::default()
        }
    }

    /// Ingested envelopes, oldest first
    pub fn logs(&self) -> Vec<Value> {
        self.state.logs.lock().unwrap().clone()
    }

    pub fn wipes(&self) -> usize {
        self.state.wipes.load(Ordering::SeqCst)
    }

    /// Command-channel sockets accepted so far
    pub fn upgrades(&self) -> usize {
        self.state.upgrades.load(Ordering::SeqCst)
    }

    /// Next accepted command-channel socket
    pub async fn next_socket(&mut self) -> Option<ServerSocket> {
        self.socket_within(WAIT).await
    }

    /// Like [`Self::next_socket`] but only waits `wait`
    pub async fn socket_within(&mut self, wait: Duration) -> Option<ServerSocket> {
        tokio::time::timeout(wait, self.sockets.recv())
            .await
            .ok()
            .flatten()
    }
}

impl Drop for MockCollector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn route(
    req: Request<Incoming>,
    state: Arc<MockState>,
    sockets: mpsc::UnboundedSender<ServerSocket>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    if path == "/extension-ws" {
        return Ok(upgrade(req, state, sockets));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let (status, reply) = match path.as_str() {
        "/.identity" => {
            let signature = state.signature.lock().unwrap().clone();
            (
                state.identity_status.load(Ordering::SeqCst),
                json!({ "name": "mock-collector", "version": "1.0.0", "signature": signature }),
            )
        }
        "/extension-log" => {
            let envelope: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            state.logs.lock().unwrap().push(envelope);
            (200, json!({ "status": "ok" }))
        }
        "/wipelogs" => {
            state.wipes.fetch_add(1, Ordering::SeqCst);
            (200, json!({ "status": "ok" }))
        }
        _ => (404, json!({ "error": "not found" })),
    };

    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(reply.to_string())))
        .unwrap())
}

/// Answer the WebSocket handshake and hand the socket over once hyper
/// releases the connection
fn upgrade(
    mut req: Request<Incoming>,
    state: Arc<MockState>,
    sockets: mpsc::UnboundedSender<ServerSocket>,
) -> Response<Full<Bytes>> {
    let Some(key) = req.headers().get(SEC_WEBSOCKET_KEY) else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Full::new(Bytes::from_static(b"missing Sec-WebSocket-Key")))
            .unwrap();
    };
    let accept = derive_accept_key(key.as_bytes());

    let on_upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        if let Ok(upgraded) = on_upgrade.await {
            let ws = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None)
                .await;
            state.upgrades.fetch_add(1, Ordering::SeqCst);
            let _ = sockets.send(ws);
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(CONNECTION, "Upgrade")
        .header(UPGRADE, "websocket")
        .header(SEC_WEBSOCKET_ACCEPT, accept)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Short delays so lifecycle tests finish quickly
pub fn quick_timings() -> SessionTimings {
    SessionTimings {
        reconnect_delay: Duration::from_millis(50),
        heartbeat_interval: Duration::from_secs(60),
        identity_timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(2),
    }
}

/// Push a command frame to the relay
pub async fn send_command(ws: &mut ServerSocket, command: Value) {
    ws.send(Message::Text(command.to_string())).await.unwrap();
}

/// Push arbitrary text, valid JSON or not
pub async fn send_raw(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next JSON frame from the relay, skipping heartbeats
pub async fn next_frame(ws: &mut ServerSocket) -> Option<Value> {
    next_frame_within(ws, WAIT).await
}

pub async fn next_frame_within(ws: &mut ServerSocket, wait: Duration) -> Option<Value> {
    tokio::time::timeout(wait, async {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let value: Value = serde_json::from_str(&text).ok()?;
                if value["type"] != "heartbeat" {
                    return Some(value);
                }
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Close the socket from the collector side with `code`
pub async fn close_with(ws: &mut ServerSocket, code: u16) {
    let _ = ws
        .close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        }))
        .await;
}

/// First event matching `pred`
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<RelayEvent>, mut pred: F) -> Option<RelayEvent>
where
    F: FnMut(&RelayEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Wait until the watched state equals `target`
pub async fn wait_for_state<T: PartialEq + Clone>(rx: &mut watch::Receiver<T>, target: T) -> bool {
    tokio::time::timeout(WAIT, rx.wait_for(|state| *state == target))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

/// Events already published, without waiting
pub fn drain(rx: &mut broadcast::Receiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Probe with canned answers
pub struct StubProbe {
    pub screenshot: Result<String, String>,
    pub cookies: Value,
    pub local: Value,
    pub session: Value,
}

impl Default for StubProbe {
    fn default() -> Self {
        Self {
            screenshot: Ok("data:image/png;base64,iVBORw0KGgo=".into()),
            cookies: json!([]),
            local: json!({}),
            session: json!({}),
        }
    }
}

#[async_trait]
impl PageProbe for StubProbe {
    async fn capture_screenshot(&self) -> Result<String, ProbeError> {
        self.screenshot.clone().map_err(ProbeError::new)
    }

    async fn read_cookies(&self) -> Result<Value, ProbeError> {
        Ok(self.cookies.clone())
    }

    async fn read_storage(&self, area: StorageArea) -> Result<Value, ProbeError> {
        Ok(match area {
            StorageArea::Local => self.local.clone(),
            StorageArea::Session => self.session.clone(),
        })
    }
}
