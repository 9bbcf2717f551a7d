//! Collection synchronizer.
//!
//! Brings the set of indexed images (face records grouped by
//! `external_image_id`) into agreement with the set of training images under
//! `train/` in the bucket, in both directions, in one pass.
//!
//! Passes must not overlap each other or an acquisition:
//! [`crate::Taste`] holds a single-flight guard around both.

use crate::context::TasteContext;
use crate::indexer::index_images;
use crate::object_store::StoreError;
use crate::paths::TRAIN_PREFIX;
use crate::recognition::RecognitionError;
use crate::types::FaceRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to list collection faces: {0}")]
    ListFaces(#[from] RecognitionError),
    #[error("failed to list training images: {0}")]
    ListTraining(#[from] StoreError),
    #[error("a sync pass is already running")]
    InProgress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Faces removed from the collection.
    pub deleted: usize,
    /// Images that ended up with exactly one indexed face.
    pub indexed: usize,
    /// `previous total − deleted + indexed`.
    pub total: usize,
}

/// Work computed from one snapshot of both sides.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Indexed images no longer in training, with all their face ids.
    pub to_delete: BTreeMap<String, Vec<String>>,
    /// Training images with no face record.
    pub to_index: Vec<String>,
    /// Surplus face ids of training images indexed more than once. The
    /// first face of each image is kept, and so is the image.
    pub extra_faces: BTreeMap<String, Vec<String>>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_index.is_empty() && self.extra_faces.is_empty()
    }
}

/// Diff face records against training keys.
///
/// Only images that already have a face record can become delete candidates.
pub fn plan_sync(faces: &[FaceRecord], training: &[String]) -> SyncPlan {
    let mut by_image: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for face in faces {
        by_image
            .entry(face.external_image_id.as_str())
            .or_default()
            .push(face.face_id.clone());
    }
    let training: BTreeSet<&str> = training.iter().map(String::as_str).collect();

    let mut plan = SyncPlan::default();
    for (image, face_ids) in by_image.iter() {
        if !training.contains(image) {
            plan.to_delete.insert(image.to_string(), face_ids.clone());
        } else if face_ids.len() > 1 {
            plan.extra_faces.insert(image.to_string(), face_ids[1..].to_vec());
        }
    }
    plan.to_index = training
        .iter()
        .filter(|key| !by_image.contains_key(*key))
        .map(|key| key.to_string())
        .collect();
    plan
}

/// Run one reconciliation pass.
pub async fn synchronize(ctx: &TasteContext) -> Result<SyncReport, SyncError> {
    let faces = ctx
        .clients
        .faces
        .list_faces(&ctx.resources.collection)
        .await?;
    let training: Vec<String> = ctx
        .clients
        .objects
        .list_objects(&ctx.resources.bucket, TRAIN_PREFIX)
        .await?
        .into_iter()
        .filter(|key| !key.ends_with('/'))
        .collect();

    let plan = plan_sync(&faces, &training);
    tracing::info!(
        faces = faces.len(),
        training = training.len(),
        to_delete = plan.to_delete.len(),
        to_index = plan.to_index.len(),
        extra_faces = plan.extra_faces.len(),
        "sync planned"
    );

    let deleted = delete_faces(ctx, &plan.to_delete, "stale").await
        + delete_faces(ctx, &plan.extra_faces, "surplus").await;

    let summary = index_images(ctx, &plan.to_index).await;

    let report = SyncReport {
        deleted,
        indexed: summary.indexed,
        total: faces.len().saturating_sub(deleted) + summary.indexed,
    };
    tracing::info!(
        deleted = report.deleted,
        indexed = report.indexed,
        total = report.total,
        "sync finished"
    );
    Ok(report)
}

/// One batched delete for every listed face. Best effort: the next pass retries.
async fn delete_faces(
    ctx: &TasteContext,
    faces: &BTreeMap<String, Vec<String>>,
    kind: &str,
) -> usize {
    let face_ids: Vec<String> = faces.values().flatten().cloned().collect();
    if face_ids.is_empty() {
        return 0;
    }
    match ctx
        .clients
        .faces
        .delete_faces(&ctx.resources.collection, &face_ids)
        .await
    {
        Ok(()) => face_ids.len(),
        Err(e) => {
            tracing::warn!(faces = face_ids.len(), kind, error = %e, "failed to delete faces");
            0
        }
    }
}
