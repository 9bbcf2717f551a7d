//! Face recognition collaborator.
//!
//! The recognition service owns face detection and matching. This crate
//! only orchestrates which images are indexed and what to do with the
//! outcome.

use crate::types::{FaceMatch, FaceRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Failure categories reported by a [`FaceRecognition`] implementation.
///
/// Adapters classify service errors into this closed set so callers never
/// inspect error codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// The image is malformed or otherwise unusable. Deterministic, never retried.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("recognition service throttled: {0}")]
    Throttled(String),
    #[error("recognition service error: {0}")]
    Service(String),
}

impl RecognitionError {
    pub fn is_invalid_image(&self) -> bool {
        matches!(self, Self::InvalidImage(_))
    }
}

#[async_trait]
pub trait FaceRecognition: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError>;

    async fn create_collection(&self, collection: &str) -> Result<(), RecognitionError>;

    /// Every face in the collection, following pagination internally.
    async fn list_faces(&self, collection: &str) -> Result<Vec<FaceRecord>, RecognitionError>;

    /// Detect and index the faces of `bucket/key`, tagging them with `key`.
    /// Returns the ids of every face that was added.
    async fn index_faces(
        &self,
        collection: &str,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<String>, RecognitionError>;

    async fn delete_faces(
        &self,
        collection: &str,
        face_ids: &[String],
    ) -> Result<(), RecognitionError>;

    /// Faces in the collection matching the largest face of `bucket/key`.
    async fn search_faces_by_image(
        &self,
        collection: &str,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<FaceMatch>, RecognitionError>;
}
