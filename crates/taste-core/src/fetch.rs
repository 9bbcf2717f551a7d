//! Remote image download and resizing collaborators.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("download failed: {url} returned {status} {message}")]
    Download {
        url: String,
        status: u16,
        message: String,
    },
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("resize failed: {0}")]
    Resize(String),
}

/// Downloaded image body.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// GET `url`. Any non-success status is a [`FetchError::Download`].
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

#[async_trait]
pub trait ImageResizer: Send + Sync {
    async fn resize(&self, bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, FetchError>;
}
