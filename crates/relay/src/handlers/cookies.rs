//! `get-cookies` - read and redact the page's cookies

use async_trait::async_trait;
use sanitize::{filter_cookies, SensitiveDataMode};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ProbeError;
use crate::handler::CommandHandler;
use crate::probe::PageProbe;
use crate::session::protocol::GET_COOKIES;
use crate::settings::SharedSettings;

pub struct CookiesHandler {
    probe: Arc<dyn PageProbe>,
    settings: SharedSettings,
}

impl CookiesHandler {
    pub fn new(probe: Arc<dyn PageProbe>, settings: SharedSettings) -> Self {
        Self { probe, settings }
    }
}

#[async_trait]
impl CommandHandler for CookiesHandler {
    fn command(&self) -> &str {
        GET_COOKIES
    }

    fn response_prefix(&self) -> &str {
        "cookies"
    }

    async fn handle(&self, _params: &Map<String, Value>) -> Result<Value, ProbeError> {
        let cookies = self.probe.read_cookies().await?;
        // Mode is read after the probe returns so a settings change made
        // while it ran still applies
        let mode = self.settings.read().await.sensitive_data_mode;

        Ok(match mode {
            SensitiveDataMode::ShowAll => cookies,
            mode => filter_cookies(&cookies, mode),
        })
    }
}
