//! Photo check-out: score candidate photos against the trained collection.
//!
//! A photo is compared at most once. The first successful comparison stamps
//! `similarity_date`; from then on the cached `similarity` is returned
//! without touching any collaborator, even if the collection has since been
//! resynced.

use crate::context::TasteContext;
use crate::photos::{require_channel, save_photo, PhotoError, SaveOptions};
use crate::recognition::RecognitionError;
use crate::settings::{find_or_create_settings, SettingsError};
use crate::types::{round2, Photo, PhotoPatch};
use crate::BATCH_CONCURRENCY;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckOutError {
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error("face comparison failed: {0}")]
    Compare(#[from] RecognitionError),
    #[error("failed to load settings: {0}")]
    Settings(#[from] SettingsError),
}

/// Result of checking out one photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCheckOut {
    /// `None` only for a photo checked out earlier without a score.
    pub similarity: Option<f64>,
    pub patch: PhotoPatch,
}

/// Aggregate verdict over a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutReport {
    /// Scores of every photo that produced one, in input order.
    pub face_similarities: Vec<f64>,
    pub face_similarity_max: f64,
    pub face_similarity_min: f64,
    /// Mean of the non-zero scores, two decimals.
    pub face_similarity_mean: f64,
    pub like: bool,
    /// One patch per input photo, index-aligned.
    pub patches: Vec<PhotoPatch>,
}

/// Best similarity of the photo at `key` against the trained faces.
///
/// A malformed image, including one without any face, scores 0.
pub async fn compare_faces_from_image(
    ctx: &TasteContext,
    key: &str,
) -> Result<f64, RecognitionError> {
    let result = ctx
        .clients
        .faces
        .search_faces_by_image(&ctx.resources.collection, &ctx.resources.bucket, key)
        .await;
    match result {
        Ok(matches) => {
            let best = matches
                .iter()
                .map(|m| m.similarity)
                .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));
            Ok(round2(best.unwrap_or(0.0)))
        }
        Err(RecognitionError::InvalidImage(reason)) => {
            tracing::debug!(key, reason = %reason, "unusable image scores 0");
            Ok(0.0)
        }
        Err(e) => Err(e),
    }
}

/// Check out one photo, or return its cached score.
pub async fn check_photo_out(
    ctx: &TasteContext,
    channel: &str,
    photo: &Photo,
) -> Result<PhotoCheckOut, CheckOutError> {
    if photo.is_checked_out() {
        return Ok(PhotoCheckOut {
            similarity: photo.similarity,
            patch: PhotoPatch::default(),
        });
    }

    let saved = save_photo(ctx, channel, photo, &SaveOptions::default()).await?;
    let similarity = compare_faces_from_image(ctx, &saved.key).await?;
    tracing::debug!(key = %saved.key, similarity, "photo checked out");

    Ok(PhotoCheckOut {
        similarity: Some(similarity),
        patch: PhotoPatch {
            url: Some(saved.url),
            similarity: Some(similarity),
            similarity_date: Some(Utc::now()),
        },
    })
}

/// `(max, min, mean)` of a score list. Max and min are 0 for an empty list;
/// the mean ignores zero scores and is 0 when none remain.
pub fn similarity_stats(scores: &[f64]) -> (f64, f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let valid: Vec<f64> = scores.iter().copied().filter(|s| *s != 0.0).collect();
    let mean = if valid.is_empty() {
        0.0
    } else {
        round2(valid.iter().sum::<f64>() / valid.len() as f64)
    };
    (max, min, mean)
}

/// Score a batch, at most [`BATCH_CONCURRENCY`] photos at a time.
///
/// Per-photo failures are logged and leave that photo out of the scores.
pub async fn check_photos_out(
    ctx: &TasteContext,
    channel: &str,
    photos: &[Photo],
) -> Result<CheckOutReport, CheckOutError> {
    require_channel(channel)?;

    let futures: Vec<_> = photos
        .iter()
        .enumerate()
        .map(|(i, photo)| async move { (i, check_photo_out(ctx, channel, photo).await) })
        .collect();
    let mut outcomes: Vec<(usize, Result<PhotoCheckOut, CheckOutError>)> =
        stream::iter(futures)
            .buffer_unordered(BATCH_CONCURRENCY)
            .collect()
            .await;
    outcomes.sort_by_key(|(i, _)| *i);

    let mut patches = vec![PhotoPatch::default(); photos.len()];
    let mut face_similarities = Vec::with_capacity(photos.len());
    for (i, outcome) in outcomes {
        match outcome {
            Ok(checked) => {
                if let Some(similarity) = checked.similarity {
                    face_similarities.push(similarity);
                }
                patches[i] = checked.patch;
            }
            Err(e) => {
                tracing::warn!(channel, url = %photos[i].url, error = %e, "photo check-out failed");
            }
        }
    }

    let (max, min, mean) = similarity_stats(&face_similarities);
    let settings = find_or_create_settings(ctx.clients.settings.as_ref()).await?;
    let has_signal = face_similarities.iter().any(|s| *s != 0.0);
    let like = has_signal && mean > settings.like_photos_threshold;

    tracing::info!(
        channel,
        photos = photos.len(),
        scored = face_similarities.len(),
        mean,
        threshold = settings.like_photos_threshold,
        like,
        "batch checked out"
    );

    Ok(CheckOutReport {
        face_similarities,
        face_similarity_max: max,
        face_similarity_min: min,
        face_similarity_mean: mean,
        like,
        patches,
    })
}
