//! Settings provider trait and a fixed in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::game::{ChatId, SessionSettings};

/// Settings lookup errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid settings for chat {chat_id}: {reason}")]
    Invalid { chat_id: ChatId, reason: String },
}

/// Source of per-chat session settings.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn settings_for(&self, chat_id: ChatId) -> Result<SessionSettings, SettingsError>;
}

/// Serves one default snapshot, with optional per-chat overrides.
#[derive(Debug, Default)]
pub struct StaticSettingsProvider {
    defaults: SessionSettings,
    overrides: RwLock<HashMap<ChatId, SessionSettings>>,
}

impl StaticSettingsProvider {
    pub fn new(defaults: SessionSettings) -> Self {
        Self {
            defaults,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &SessionSettings {
        &self.defaults
    }

    /// Store settings for one chat. Rejected if they do not validate.
    pub async fn set_override(
        &self,
        chat_id: ChatId,
        settings: SessionSettings,
    ) -> Result<(), SettingsError> {
        settings
            .validate()
            .map_err(|reason| SettingsError::Invalid { chat_id, reason })?;
        self.overrides.write().await.insert(chat_id, settings);
        Ok(())
    }

    pub async fn clear_override(&self, chat_id: ChatId) -> bool {
        self.overrides.write().await.remove(&chat_id).is_some()
    }
}

#[async_trait]
impl SettingsProvider for StaticSettingsProvider {
    async fn settings_for(&self, chat_id: ChatId) -> Result<SessionSettings, SettingsError> {
        let overrides = self.overrides.read().await;
        Ok(overrides
            .get(&chat_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone()))
    }
}
