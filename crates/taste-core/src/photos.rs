//! Photo persistence and thumbnail capture.

use crate::context::TasteContext;
use crate::fetch::FetchError;
use crate::object_store::StoreError;
use crate::paths;
use crate::types::Photo;
use thiserror::Error;

/// Edge length of the square thumbnail kept by [`mental_snapshot`].
pub const THUMBNAIL_SIZE: u32 = 84;
/// Filename prefix that distinguishes thumbnails from full-size photos.
pub const THUMBNAIL_PREFIX: &str = "84x84_";

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("cannot derive an object path from {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Target `(width, height)`.
    pub resize: Option<(u32, u32)>,
    /// Prepended to the filename segment of the stored key.
    pub filename_prefix: Option<String>,
}

impl SaveOptions {
    pub fn thumbnail() -> Self {
        Self {
            resize: Some((THUMBNAIL_SIZE, THUMBNAIL_SIZE)),
            filename_prefix: Some(THUMBNAIL_PREFIX.to_string()),
        }
    }
}

/// Where a saved photo ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    pub key: String,
    pub url: String,
}

pub(crate) fn require_channel(channel: &str) -> Result<(), PhotoError> {
    if channel.trim().is_empty() {
        return Err(PhotoError::MissingArgument("channel"));
    }
    Ok(())
}

/// Download a photo and store it under `photos/<channel>/…`.
///
/// The caller decides whether to adopt the returned URL; `photo` is not modified.
pub async fn save_photo(
    ctx: &TasteContext,
    channel: &str,
    photo: &Photo,
    options: &SaveOptions,
) -> Result<SavedPhoto, PhotoError> {
    require_channel(channel)?;
    if photo.url.trim().is_empty() {
        return Err(PhotoError::MissingArgument("photo"));
    }

    let bucket = ctx.resources.bucket.as_str();
    let mut relative = paths::relative_path(&photo.url, bucket, channel)
        .ok_or_else(|| PhotoError::InvalidUrl(photo.url.clone()))?;
    if let Some(prefix) = &options.filename_prefix {
        relative = paths::prepend_to_filename(&relative, prefix);
    }
    let key = paths::photo_key(channel, &relative);

    let fetched = ctx.clients.fetcher.fetch(&photo.url).await?;
    let content_type = fetched
        .content_type
        .clone()
        .unwrap_or_else(|| paths::guess_content_type(&key).to_string());

    let bytes = match options.resize {
        Some((width, height)) => {
            ctx.clients
                .resizer
                .resize(fetched.bytes, width, height)
                .await?
        }
        None => fetched.bytes,
    };

    let size = bytes.len();
    ctx.clients
        .objects
        .put_object(bucket, &key, bytes, &content_type)
        .await?;
    tracing::debug!(channel, key = %key, size, "photo saved");

    Ok(SavedPhoto {
        url: ctx.clients.objects.object_url(bucket, &key),
        key,
    })
}

/// Store an 84×84 thumbnail of `photo` and return its URL.
pub async fn mental_snapshot(
    ctx: &TasteContext,
    channel: &str,
    photo: &Photo,
) -> Result<String, PhotoError> {
    let saved = save_photo(ctx, channel, photo, &SaveOptions::thumbnail()).await?;
    tracing::info!(channel, url = %saved.url, "snapshot taken");
    Ok(saved.url)
}
