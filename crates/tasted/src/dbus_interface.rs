use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use taste_core::checkout::CheckOutError;
use taste_core::messages::Message;
use taste_core::photos::PhotoError;
use taste_core::{Photo, Taste};
use zbus::fdo;
use zbus::interface;

/// D-Bus interface for the taste daemon.
///
/// Bus name: org.getmeadate.Taste1
/// Object path: /org/getmeadate/Taste1
///
/// Photos, messages and reports travel as JSON strings.
pub struct TasteService {
    taste: Arc<Taste>,
}

impl TasteService {
    pub fn new(taste: Arc<Taste>) -> Self {
        Self { taste }
    }
}

#[interface(name = "org.getmeadate.Taste1")]
impl TasteService {
    /// Score a batch of candidate photos against the training collection.
    async fn check_photos_out(&self, channel: &str, photos: &str) -> fdo::Result<String> {
        let photos: Vec<Photo> = parse("photos", photos)?;
        tracing::info!(channel, count = photos.len(), "check_photos_out requested");
        let report = self
            .taste
            .check_photos_out(channel, &photos)
            .await
            .map_err(check_out_error)?;
        render(&report)
    }

    /// Copy liked photos into the training area and index them.
    async fn acquire_taste(&self, photos: &str) -> fdo::Result<String> {
        let photos: Vec<Photo> = parse("photos", photos)?;
        tracing::info!(count = photos.len(), "acquire_taste requested");
        render(&self.taste.acquire_taste(&photos).await)
    }

    /// Store an 84x84 thumbnail of one photo and return its URL.
    async fn mental_snapshot(&self, channel: &str, photo: &str) -> fdo::Result<String> {
        let photo: Photo = parse("photo", photo)?;
        self.taste
            .mental_snapshot(channel, &photo)
            .await
            .map_err(photo_error)
    }

    /// Reconcile the face collection with the training images.
    async fn sync(&self) -> fdo::Result<String> {
        tracing::info!("sync requested");
        let report = self
            .taste
            .sync()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        render(&report)
    }

    /// Upsert chat messages; returns how many were stored.
    async fn store_messages(&self, messages: &str) -> fdo::Result<u32> {
        let messages: Vec<Message> = parse("messages", messages)?;
        let stored = self
            .taste
            .store_messages(&messages)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        Ok(u32::try_from(stored).unwrap_or(u32::MAX))
    }

    /// Return daemon status information.
    async fn status(&self) -> fdo::Result<String> {
        let resources = self.taste.resources();
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "bucket": resources.bucket,
            "collection": resources.collection,
        })
        .to_string())
    }
}

fn parse<T: DeserializeOwned>(what: &str, json: &str) -> fdo::Result<T> {
    serde_json::from_str(json).map_err(|e| fdo::Error::InvalidArgs(format!("{what}: {e}")))
}

fn render<T: Serialize>(value: &T) -> fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| fdo::Error::Failed(e.to_string()))
}

fn photo_error(e: PhotoError) -> fdo::Error {
    match e {
        PhotoError::MissingArgument(_) | PhotoError::InvalidUrl(_) => {
            fdo::Error::InvalidArgs(e.to_string())
        }
        other => fdo::Error::Failed(other.to_string()),
    }
}

fn check_out_error(e: CheckOutError) -> fdo::Error {
    match e {
        CheckOutError::Photo(inner) => photo_error(inner),
        other => fdo::Error::Failed(other.to_string()),
    }
}
