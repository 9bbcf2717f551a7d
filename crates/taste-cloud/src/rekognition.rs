//! Rekognition-backed [`FaceRecognition`].
//!
//! Faces are tagged with the object key of their source image. Rekognition
//! forbids `/` in `ExternalImageId`, so keys are stored with `/` replaced by
//! `:` and translated back when listed.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rekognition::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client;
use taste_core::recognition::{FaceRecognition, RecognitionError};
use taste_core::types::{FaceMatch, FaceRecord};

const INVALID_IMAGE_CODES: [&str; 2] = ["InvalidImageFormatException", "InvalidParameterException"];
const THROTTLING_CODES: [&str; 2] = [
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
];

pub struct RekognitionCollection {
    client: Client,
    /// Minimum similarity for a search match; `None` keeps the service default.
    match_threshold: Option<f32>,
}

impl RekognitionCollection {
    pub fn new(config: &SdkConfig, match_threshold: Option<f32>) -> Self {
        Self {
            client: Client::new(config),
            match_threshold,
        }
    }
}

/// Object key → `ExternalImageId`.
pub fn external_image_id(key: &str) -> String {
    key.replace('/', ":")
}

/// `ExternalImageId` → object key.
pub fn key_from_external_image_id(id: &str) -> String {
    id.replace(':', "/")
}

/// Classify an SDK error into the closed [`RecognitionError`] set.
pub fn classify(code: Option<&str>, message: Option<&str>, detail: String) -> RecognitionError {
    let reason = message.map(str::to_string).unwrap_or(detail);
    match code {
        Some(c) if INVALID_IMAGE_CODES.contains(&c) => RecognitionError::InvalidImage(reason),
        Some(c) if THROTTLING_CODES.contains(&c) => RecognitionError::Throttled(reason),
        _ => RecognitionError::Service(reason),
    }
}

fn recognition_error<E, R>(op: &str, err: SdkError<E, R>) -> RecognitionError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err.message().map(str::to_string);
    let detail = format!("{op}: {}", DisplayErrorContext(&err));
    classify(code.as_deref(), message.as_deref(), detail)
}

fn s3_image(bucket: &str, key: &str) -> Image {
    Image::builder()
        .s3_object(S3Object::builder().bucket(bucket).name(key).build())
        .build()
}

#[async_trait]
impl FaceRecognition for RekognitionCollection {
    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let out = self
                .client
                .list_collections()
                .set_next_token(token.take())
                .send()
                .await
                .map_err(|e| recognition_error("ListCollections", e))?;
            ids.extend(out.collection_ids().iter().cloned());
            match out.next_token() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn create_collection(&self, collection: &str) -> Result<(), RecognitionError> {
        self.client
            .create_collection()
            .collection_id(collection)
            .send()
            .await
            .map_err(|e| recognition_error("CreateCollection", e))?;
        tracing::info!(collection, "Rekognition collection created");
        Ok(())
    }

    async fn list_faces(&self, collection: &str) -> Result<Vec<FaceRecord>, RecognitionError> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let out = self
                .client
                .list_faces()
                .collection_id(collection)
                .set_next_token(token.take())
                .send()
                .await
                .map_err(|e| recognition_error("ListFaces", e))?;
            for face in out.faces() {
                let (Some(face_id), Some(image)) = (face.face_id(), face.external_image_id()) else {
                    tracing::debug!(?face, "face without id or image tag; ignoring");
                    continue;
                };
                records.push(FaceRecord {
                    face_id: face_id.to_string(),
                    external_image_id: key_from_external_image_id(image),
                });
            }
            match out.next_token() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }
        tracing::debug!(collection, count = records.len(), "faces listed");
        Ok(records)
    }

    async fn index_faces(
        &self,
        collection: &str,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<String>, RecognitionError> {
        let out = self
            .client
            .index_faces()
            .collection_id(collection)
            .image(s3_image(bucket, key))
            .external_image_id(external_image_id(key))
            .send()
            .await
            .map_err(|e| recognition_error("IndexFaces", e))?;
        Ok(out
            .face_records()
            .iter()
            .filter_map(|r| r.face().and_then(|f| f.face_id()).map(str::to_string))
            .collect())
    }

    async fn delete_faces(
        &self,
        collection: &str,
        face_ids: &[String],
    ) -> Result<(), RecognitionError> {
        self.client
            .delete_faces()
            .collection_id(collection)
            .set_face_ids(Some(face_ids.to_vec()))
            .send()
            .await
            .map_err(|e| recognition_error("DeleteFaces", e))?;
        tracing::debug!(collection, count = face_ids.len(), "faces deleted");
        Ok(())
    }

    async fn search_faces_by_image(
        &self,
        collection: &str,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<FaceMatch>, RecognitionError> {
        let out = self
            .client
            .search_faces_by_image()
            .collection_id(collection)
            .image(s3_image(bucket, key))
            .set_face_match_threshold(self.match_threshold)
            .send()
            .await
            .map_err(|e| recognition_error("SearchFacesByImage", e))?;
        Ok(out
            .face_matches()
            .iter()
            .map(|m| FaceMatch {
                face_id: m.face().and_then(|f| f.face_id()).map(str::to_string),
                similarity: f64::from(m.similarity().unwrap_or(0.0)),
            })
            .collect())
    }
}
