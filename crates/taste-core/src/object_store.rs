//! Object storage collaborator.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object store error: {0}")]
    Service(String),
}

/// Bucket-scoped object storage.
///
/// Implementations must return every matching key from `list_objects`,
/// following pagination internally.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Server-side copy within one bucket.
    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str)
        -> Result<(), StoreError>;

    /// Canonical public URL of an object. Its path is `/<bucket>/<key>`.
    fn object_url(&self, bucket: &str, key: &str) -> String;
}
