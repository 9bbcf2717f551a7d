//! Bucket and collection provisioning.
//!
//! Each deployment owns exactly one bucket and one recognition collection.
//! A configured name wins; otherwise an existing resource carrying the
//! reserved prefix is adopted; otherwise a fresh name is minted. The
//! resolved resource is created when missing and never deleted here.

use crate::context::{Clients, Resources};
use crate::object_store::{ObjectStore, StoreError};
use crate::recognition::{FaceRecognition, RecognitionError};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Reserved name prefix for buckets and collections owned by this subsystem.
pub const RESOURCE_PREFIX: &str = "get-me-a-date-";

const NAME_SUFFIX_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("bucket provisioning failed: {0}")]
    Bucket(#[from] StoreError),
    #[error("collection provisioning failed: {0}")]
    Collection(#[from] RecognitionError),
}

/// Names requested by configuration. `None` triggers discovery.
#[derive(Debug, Clone, Default)]
pub struct ResourceConfig {
    pub bucket: Option<String>,
    pub collection: Option<String>,
}

/// Pick the resource name: configured, then first prefixed existing, then minted.
pub fn resolve_name(configured: Option<&str>, existing: &[String]) -> String {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    existing
        .iter()
        .find(|name| name.starts_with(RESOURCE_PREFIX))
        .cloned()
        .unwrap_or_else(mint_name)
}

/// `get-me-a-date-<UTC timestamp>-<random>`, valid as both bucket and collection id.
pub fn mint_name() -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{RESOURCE_PREFIX}{stamp}-{suffix}")
}

pub async fn ensure_collection(
    faces: &dyn FaceRecognition,
    configured: Option<&str>,
) -> Result<String, RecognitionError> {
    let existing = faces.list_collections().await?;
    let name = resolve_name(configured, &existing);
    if existing.contains(&name) {
        tracing::info!(collection = %name, "using existing collection");
    } else {
        faces.create_collection(&name).await?;
        tracing::info!(collection = %name, "collection created");
    }
    Ok(name)
}

pub async fn ensure_bucket(
    objects: &dyn ObjectStore,
    configured: Option<&str>,
) -> Result<String, StoreError> {
    let existing = objects.list_buckets().await?;
    let name = resolve_name(configured, &existing);
    if existing.contains(&name) {
        tracing::info!(bucket = %name, "using existing bucket");
    } else {
        objects.create_bucket(&name).await?;
        tracing::info!(bucket = %name, "bucket created");
    }
    Ok(name)
}

/// Ensure both resources exist, concurrently. Any failure is fatal.
pub async fn provision(
    clients: &Clients,
    config: &ResourceConfig,
) -> Result<Resources, ProvisionError> {
    let (collection, bucket) = tokio::try_join!(
        async {
            ensure_collection(clients.faces.as_ref(), config.collection.as_deref())
                .await
                .map_err(ProvisionError::from)
        },
        async {
            ensure_bucket(clients.objects.as_ref(), config.bucket.as_deref())
                .await
                .map_err(ProvisionError::from)
        },
    )?;
    Ok(Resources { bucket, collection })
}
