use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Id of the singleton settings row.
pub const SETTINGS_ID: i64 = 1;

/// Mean similarity a batch must exceed to be liked, when nothing is stored yet.
pub const DEFAULT_LIKE_PHOTOS_THRESHOLD: f64 = 70.0;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i64,
    pub like_photos_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: SETTINGS_ID,
            like_photos_threshold: DEFAULT_LIKE_PHOTOS_THRESHOLD,
        }
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Settings>, SettingsError>;

    async fn create(&self, settings: &Settings) -> Result<Settings, SettingsError>;
}

/// Load the singleton settings, creating the default row on first use.
pub async fn find_or_create_settings(store: &dyn SettingsStore) -> Result<Settings, SettingsError> {
    if let Some(settings) = store.find(SETTINGS_ID).await? {
        return Ok(settings);
    }
    tracing::info!(id = SETTINGS_ID, "settings missing; creating defaults");
    store.create(&Settings::default()).await
}
