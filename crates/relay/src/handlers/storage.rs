//! `get-local-storage` / `get-session-storage` - dump and redact web storage

use async_trait::async_trait;
use sanitize::{filter_storage, SensitiveDataMode};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ProbeError;
use crate::handler::CommandHandler;
use crate::probe::{PageProbe, StorageArea};
use crate::settings::SharedSettings;

/// One instance per storage area
pub struct StorageHandler {
    probe: Arc<dyn PageProbe>,
    settings: SharedSettings,
    area: StorageArea,
}

impl StorageHandler {
    pub fn new(probe: Arc<dyn PageProbe>, settings: SharedSettings, area: StorageArea) -> Self {
        Self {
            probe,
            settings,
            area,
        }
    }

    pub fn local(probe: Arc<dyn PageProbe>, settings: SharedSettings) -> Self {
        Self::new(probe, settings, StorageArea::Local)
    }

    pub fn session(probe: Arc<dyn PageProbe>, settings: SharedSettings) -> Self {
        Self::new(probe, settings, StorageArea::Session)
    }
}

#[async_trait]
impl CommandHandler for StorageHandler {
    fn command(&self) -> &str {
        self.area.command()
    }

    fn response_prefix(&self) -> &str {
        self.area.response_prefix()
    }

    async fn handle(&self, _params: &Map<String, Value>) -> Result<Value, ProbeError> {
        let storage = self.probe.read_storage(self.area).await?;
        let mode = self.settings.read().await.sensitive_data_mode;

        Ok(match mode {
            SensitiveDataMode::ShowAll => storage,
            mode => filter_storage(&storage, mode),
        })
    }
}
