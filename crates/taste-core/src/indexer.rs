//! Face indexing with curation by face count.
//!
//! A training image is usable only when exactly one face is detected in it.
//! Anything else is purged from both the collection and the bucket so it can
//! never be trained on.

use crate::context::TasteContext;
use crate::BATCH_CONCURRENCY;
use futures::stream::{self, StreamExt};
use serde::Serialize;

/// What happened to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Exactly one face indexed.
    Indexed,
    /// Zero or several faces; faces and object removed.
    Purged { faces: usize },
    /// Malformed image; object removed.
    Rejected,
    /// Transient failure; left untouched for the next pass.
    Deferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub indexed: usize,
    pub purged: usize,
    pub rejected: usize,
    pub deferred: usize,
}

impl IndexSummary {
    fn record(mut self, outcome: IndexOutcome) -> Self {
        match outcome {
            IndexOutcome::Indexed => self.indexed += 1,
            IndexOutcome::Purged { .. } => self.purged += 1,
            IndexOutcome::Rejected => self.rejected += 1,
            IndexOutcome::Deferred => self.deferred += 1,
        }
        self
    }
}

/// Index a single training image and apply the curation policy.
pub async fn index_image(ctx: &TasteContext, key: &str) -> IndexOutcome {
    let bucket = ctx.resources.bucket.as_str();
    let collection = ctx.resources.collection.as_str();

    match ctx.clients.faces.index_faces(collection, bucket, key).await {
        Ok(face_ids) if face_ids.len() == 1 => {
            tracing::debug!(key, face_id = %face_ids[0], "image indexed");
            IndexOutcome::Indexed
        }
        Ok(face_ids) => {
            tracing::info!(key, faces = face_ids.len(), "image unusable; purging");
            purge_image(ctx, key, &face_ids).await;
            IndexOutcome::Purged {
                faces: face_ids.len(),
            }
        }
        Err(e) if e.is_invalid_image() => {
            tracing::info!(key, error = %e, "malformed image; deleting object");
            delete_object(ctx, key).await;
            IndexOutcome::Rejected
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "indexing failed; will retry on next sync");
            IndexOutcome::Deferred
        }
    }
}

/// Index every key, at most [`BATCH_CONCURRENCY`] at a time.
pub async fn index_images(ctx: &TasteContext, keys: &[String]) -> IndexSummary {
    let futures: Vec<_> = keys.iter().map(|key| index_image(ctx, key)).collect();
    let outcomes: Vec<IndexOutcome> = stream::iter(futures)
        .buffer_unordered(BATCH_CONCURRENCY)
        .collect()
        .await;

    let summary = outcomes
        .into_iter()
        .fold(IndexSummary::default(), IndexSummary::record);
    tracing::debug!(?summary, "index batch finished");
    summary
}

/// Remove an image's faces and the image itself. Failures are logged only.
async fn purge_image(ctx: &TasteContext, key: &str, face_ids: &[String]) {
    if !face_ids.is_empty() {
        if let Err(e) = ctx
            .clients
            .faces
            .delete_faces(&ctx.resources.collection, face_ids)
            .await
        {
            tracing::warn!(key, faces = face_ids.len(), error = %e, "failed to delete faces");
        }
    }
    delete_object(ctx, key).await;
}

async fn delete_object(ctx: &TasteContext, key: &str) {
    if let Err(e) = ctx
        .clients
        .objects
        .delete_object(&ctx.resources.bucket, key)
        .await
    {
        tracing::warn!(key, error = %e, "failed to delete object");
    }
}
