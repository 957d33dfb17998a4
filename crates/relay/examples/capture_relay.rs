//! Capture relay example - relay a few records and answer commands with a
//! fake page

use async_trait::async_trait;
use relay::{CaptureRelay, EventKind, EventRecord, PageProbe, ProbeError, Settings, StorageArea};
use serde_json::{json, Value};
use std::sync::Arc;

/// Stands in for a real browser
struct DemoPage;

#[async_trait]
impl PageProbe for DemoPage {
    async fn capture_screenshot(&self) -> Result<String, ProbeError> {
        Ok("data:image/png;base64,iVBORw0KGgo=".to_string())
    }

    async fn read_cookies(&self) -> Result<Value, ProbeError> {
        Ok(json!([
            { "name": "sessionId", "value": "550e8400-e29b-41d4-a716-446655440000" },
            { "name": "theme", "value": "dark" }
        ]))
    }

    async fn read_storage(&self, area: StorageArea) -> Result<Value, ProbeError> {
        Ok(match area {
            StorageArea::Local => json!({ "apiKey": "sk-abcdefghijklmnopqrstuvwx", "lang": "en" }),
            StorageArea::Session => json!({}),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let relay = CaptureRelay::new(settings, Arc::new(DemoPage))?;
    if let Err(e) = relay.start().await {
        println!("Collector not ready: {}", e);
    }

    let records = [
        EventRecord::new(
            EventKind::ConsoleLog,
            json!({ "level": "log", "message": "page loaded" }),
        ),
        EventRecord::new(
            EventKind::NetworkRequest,
            json!({
                "url": "https://example.com/api/items",
                "method": "GET",
                "status": 200,
                "responseBody": "[{\"id\":1},{\"id\":2}]"
            }),
        ),
    ];

    for record in records {
        let kind = record.kind;
        match relay.relay(record).await {
            Ok(()) => println!("Sent {}", kind),
            Err(e) => println!("Dropped {}: {}", kind, e),
        }
    }

    // Give the collector time to send commands
    tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;

    relay.shutdown().await;
    Ok(())
}
