//! SQLite persistence for the settings singleton and chat messages.

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use std::path::Path;
use taste_core::messages::{Message, MessageError, MessageStore};
use taste_core::settings::{Settings, SettingsError, SettingsStore};
use thiserror::Error;
use tokio_rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS settings (
    id                    INTEGER PRIMARY KEY,
    like_photos_threshold REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    channel_name       TEXT NOT NULL,
    channel_message_id TEXT NOT NULL,
    sender             TEXT,
    text               TEXT NOT NULL,
    sent_at            TEXT NOT NULL,
    PRIMARY KEY (channel_name, channel_message_id)
);
";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).await?;
        let store = Self { conn };
        store.migrate().await?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(store)
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, DbError> {
        let store = Self {
            conn: Connection::open_in_memory().await?,
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), DbError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn find(&self, id: i64) -> Result<Option<Settings>, SettingsError> {
        self.conn
            .call(move |conn| {
                let settings = conn
                    .query_row(
                        "SELECT id, like_photos_threshold FROM settings WHERE id = ?1",
                        [id],
                        |row| {
                            Ok(Settings {
                                id: row.get(0)?,
                                like_photos_threshold: row.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(settings)
            })
            .await
            .map_err(|e| SettingsError::Store(e.to_string()))
    }

    /// Insert unless a row with the same id exists; returns the stored row.
    async fn create(&self, settings: &Settings) -> Result<Settings, SettingsError> {
        let settings = settings.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO settings (id, like_photos_threshold) VALUES (?1, ?2)
                     ON CONFLICT(id) DO NOTHING",
                    rusqlite::params![settings.id, settings.like_photos_threshold],
                )?;
                let stored = conn.query_row(
                    "SELECT id, like_photos_threshold FROM settings WHERE id = ?1",
                    [settings.id],
                    |row| {
                        Ok(Settings {
                            id: row.get(0)?,
                            like_photos_threshold: row.get(1)?,
                        })
                    },
                )?;
                Ok(stored)
            })
            .await
            .map_err(|e| SettingsError::Store(e.to_string()))
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn upsert(&self, message: &Message) -> Result<(), MessageError> {
        let message = message.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO messages (channel_name, channel_message_id, sender, text, sent_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(channel_name, channel_message_id) DO UPDATE SET
                         sender = excluded.sender,
                         text = excluded.text,
                         sent_at = excluded.sent_at",
                    rusqlite::params![
                        message.channel_name,
                        message.channel_message_id,
                        message.sender,
                        message.text,
                        message.sent_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| MessageError::Store(e.to_string()))
    }
}
