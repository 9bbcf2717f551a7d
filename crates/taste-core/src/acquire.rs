//! Taste acquisition: promote liked photos into the training set.

use crate::context::TasteContext;
use crate::indexer::index_images;
use crate::paths;
use crate::types::Photo;
use crate::BATCH_CONCURRENCY;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquireReport {
    /// Photos copied into `train/`.
    pub copied: usize,
    /// Photos whose URL did not map to a stored candidate photo.
    pub skipped: usize,
    /// Copied images that ended up with exactly one indexed face.
    pub indexed: usize,
    /// Copied images that already had a face record and were not re-indexed.
    pub already_indexed: usize,
}

/// Source and destination key of a photo's training copy.
pub fn training_copy(photo: &Photo) -> Option<(String, String)> {
    let src = paths::object_key_from_url(&photo.url)?;
    let dst = paths::training_key(&src)?;
    Some((src, dst))
}

/// Copy each photo server-side into `train/`, then index the copies that
/// have no face record yet.
///
/// Must not overlap a sync pass; [`crate::Taste::acquire_taste`] takes the
/// sync guard around this call.
pub async fn acquire_taste(ctx: &TasteContext, photos: &[Photo]) -> AcquireReport {
    let mut copies = Vec::with_capacity(photos.len());
    let mut skipped = 0;
    for photo in photos {
        match training_copy(photo) {
            Some(copy) => copies.push(copy),
            None => {
                tracing::debug!(url = %photo.url, "photo URL does not map to a stored photo; skipping");
                skipped += 1;
            }
        }
    }
    copies.sort();
    copies.dedup();

    let bucket = ctx.resources.bucket.as_str();
    let results: Vec<Option<String>> = stream::iter(copies)
        .map(|(src, dst)| async move {
            match ctx.clients.objects.copy_object(bucket, &src, &dst).await {
                Ok(()) => Some(dst),
                Err(e) => {
                    tracing::warn!(src = %src, dst = %dst, error = %e, "training copy failed");
                    None
                }
            }
        })
        .buffer_unordered(BATCH_CONCURRENCY)
        .collect()
        .await;
    let copied: Vec<String> = results.into_iter().flatten().collect();

    let (to_index, already_indexed) = match unindexed(ctx, &copied).await {
        Some(keys) => {
            let already = copied.len() - keys.len();
            (keys, already)
        }
        None => (Vec::new(), 0),
    };

    let summary = index_images(ctx, &to_index).await;
    let report = AcquireReport {
        copied: copied.len(),
        skipped,
        indexed: summary.indexed,
        already_indexed,
    };
    tracing::info!(
        copied = report.copied,
        skipped = report.skipped,
        indexed = report.indexed,
        already_indexed = report.already_indexed,
        "taste acquired"
    );
    report
}

/// Keys without any face record in the collection.
///
/// `None` when the collection cannot be listed; indexing is then left to the
/// next sync, which picks up every unindexed training image.
async fn unindexed(ctx: &TasteContext, keys: &[String]) -> Option<Vec<String>> {
    if keys.is_empty() {
        return Some(Vec::new());
    }
    let faces = match ctx.clients.faces.list_faces(&ctx.resources.collection).await {
        Ok(faces) => faces,
        Err(e) => {
            tracing::warn!(error = %e, "cannot list faces; deferring indexing to next sync");
            return None;
        }
    };
    let indexed: HashSet<&str> = faces.iter().map(|f| f.external_image_id.as_str()).collect();
    Some(
        keys.iter()
            .filter(|key| !indexed.contains(key.as_str()))
            .cloned()
            .collect(),
    )
}
