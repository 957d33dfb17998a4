//! `take-screenshot` - capture the visible tab

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ProbeError;
use crate::handler::CommandHandler;
use crate::probe::PageProbe;
use crate::session::protocol::TAKE_SCREENSHOT;

pub struct ScreenshotHandler {
    probe: Arc<dyn PageProbe>,
}

impl ScreenshotHandler {
    pub fn new(probe: Arc<dyn PageProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl CommandHandler for ScreenshotHandler {
    fn command(&self) -> &str {
        TAKE_SCREENSHOT
    }

    fn response_prefix(&self) -> &str {
        "screenshot"
    }

    async fn handle(&self, _params: &Map<String, Value>) -> Result<Value, ProbeError> {
        let image = self.probe.capture_screenshot().await?;
        tracing::debug!("Captured screenshot ({} bytes)", image.len());
        Ok(Value::String(image))
    }
}
