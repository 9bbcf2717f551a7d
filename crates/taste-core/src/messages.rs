//! Chat message persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("message store error: {0}")]
    Store(String),
    #[error("stored {stored} of {total} messages before failure: {source}")]
    Partial {
        stored: usize,
        total: usize,
        #[source]
        source: Box<MessageError>,
    },
}

/// A chat message, unique per `(channel_name, channel_message_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub channel_name: String,
    pub channel_message_id: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert the message, or replace the one with the same match key.
    async fn upsert(&self, message: &Message) -> Result<(), MessageError>;
}

/// Upsert a batch in order, one message at a time.
///
/// Sequential application keeps per-channel ordering intact. Stops at the
/// first failure.
pub async fn store_messages(
    store: &dyn MessageStore,
    messages: &[Message],
) -> Result<usize, MessageError> {
    for (stored, message) in messages.iter().enumerate() {
        if let Err(e) = store.upsert(message).await {
            return Err(MessageError::Partial {
                stored,
                total: messages.len(),
                source: Box::new(e),
            });
        }
    }
    tracing::debug!(count = messages.len(), "messages stored");
    Ok(messages.len())
}
