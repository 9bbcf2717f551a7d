use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate photo as owned by the caller.
///
/// `similarity_date` marks the photo as checked out. Once set, the cached
/// `similarity` is authoritative and the photo is never compared again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub similarity_date: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.similarity_date.is_some()
    }

    /// Merge a patch produced by one of the pipelines.
    pub fn apply(&mut self, patch: &PhotoPatch) {
        if let Some(url) = &patch.url {
            self.url.clone_from(url);
        }
        if let Some(similarity) = patch.similarity {
            self.similarity = Some(similarity);
        }
        if let Some(date) = patch.similarity_date {
            self.similarity_date = Some(date);
        }
    }
}

/// Changes a pipeline wants applied to a [`Photo`]. Empty when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_date: Option<DateTime<Utc>>,
}

impl PhotoPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.similarity.is_none() && self.similarity_date.is_none()
    }
}

/// One face inside the recognition collection, tied to the object key it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_id: String,
    /// Object-store key of the training image.
    pub external_image_id: String,
}

/// A trained face matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub face_id: Option<String>,
    /// Similarity percentage in [0, 100].
    pub similarity: f64,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
