//! Object key layout and URL-to-key mapping.
//!
//! Candidate photos live under `photos/<channel>/…`, training images under
//! `train/<channel>/…`. Canonical object URLs are path-style:
//! `https://<host>/<bucket>/<key>`.

use url::Url;

pub const PHOTOS_PREFIX: &str = "photos/";
pub const TRAIN_PREFIX: &str = "train/";

/// Key of a candidate photo inside the bucket.
pub fn photo_key(channel: &str, relative_path: &str) -> String {
    format!("{PHOTOS_PREFIX}{channel}/{relative_path}")
}

/// Path of a remote photo relative to its origin.
///
/// Strips the first known prefix from the URL path so that re-saving a photo
/// already stored in our bucket lands on the same key. Returns `None` for
/// unparsable URLs or an empty remainder.
pub fn relative_path(photo_url: &str, bucket: &str, channel: &str) -> Option<String> {
    let url = Url::parse(photo_url).ok()?;
    let path = url.path();

    let own_photos = format!("/{bucket}/{PHOTOS_PREFIX}{channel}/");
    let own_bucket = format!("/{bucket}/");
    let relative = [own_photos.as_str(), own_bucket.as_str(), "/"]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))?;

    if relative.is_empty() {
        None
    } else {
        Some(relative.to_string())
    }
}

/// Prepend `prefix` to the last path segment: `a/b.jpg` → `a/<prefix>b.jpg`.
pub fn prepend_to_filename(relative_path: &str, prefix: &str) -> String {
    match relative_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/{prefix}{file}"),
        None => format!("{prefix}{relative_path}"),
    }
}

/// Object key of a canonical object URL: its path without the bucket segment.
pub fn object_key_from_url(object_url: &str) -> Option<String> {
    let url = Url::parse(object_url).ok()?;
    let path = url.path().trim_start_matches('/');
    let (_bucket, key) = path.split_once('/')?;
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Training key for a stored candidate photo: `photos/…` → `train/…`.
pub fn training_key(photo_key: &str) -> Option<String> {
    let rest = photo_key.strip_prefix(PHOTOS_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(format!("{TRAIN_PREFIX}{rest}"))
}

/// Best-effort content type from a key's extension.
pub fn guess_content_type(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
