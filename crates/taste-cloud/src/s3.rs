//! S3-backed [`ObjectStore`].

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use taste_core::object_store::{ObjectStore, StoreError};

/// us-east-1 rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    pub fn new(config: &SdkConfig) -> Self {
        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self {
            client: Client::new(config),
            region,
        }
    }
}

/// Path-style URL of an object: `https://s3.<region>.amazonaws.com/<bucket>/<key>`.
pub fn path_style_url(region: &str, bucket: &str, key: &str) -> String {
    format!("https://s3.{region}.amazonaws.com/{bucket}/{key}")
}

/// `CopySource` header value: URL-encoded `<bucket>/<key>`.
pub fn copy_source(bucket: &str, key: &str) -> String {
    urlencoding::encode(&format!("{bucket}/{key}")).into_owned()
}

fn service_error<E: std::error::Error>(op: &str, err: E) -> StoreError {
    StoreError::Service(format!("{op}: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let out = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| service_error("ListBuckets", e))?;
        Ok(out
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| service_error("CreateBucket", e))?;
        tracing::info!(bucket, region = %self.region, "S3 bucket created");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let out = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| service_error("ListObjectsV2", e))?;
            keys.extend(
                out.contents()
                    .iter()
                    .filter_map(|o| o.key().map(str::to_string)),
            );
            match out.next_continuation_token() {
                Some(next) if out.is_truncated().unwrap_or(false) => token = Some(next.to_string()),
                _ => break,
            }
        }
        tracing::debug!(bucket, prefix, count = keys.len(), "objects listed");
        Ok(keys)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| service_error("PutObject", e))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| service_error("DeleteObject", e))?;
        tracing::debug!(bucket, key, "object deleted");
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_key: &str,
    ) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, src_key))
            .key(dst_key)
            .send()
            .await
            .map_err(|e| service_error("CopyObject", e))?;
        Ok(())
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        path_style_url(&self.region, bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taste_core::paths::object_key_from_url;

    #[test]
    fn test_path_style_url_round_trips_key() {
        let url = path_style_url("eu-west-1", "get-me-a-date-x", "photos/tinder/u1/a.jpg");
        assert_eq!(
            url,
            "https://s3.eu-west-1.amazonaws.com/get-me-a-date-x/photos/tinder/u1/a.jpg"
        );
        assert_eq!(object_key_from_url(&url).as_deref(), Some("photos/tinder/u1/a.jpg"));
    }

    #[test]
    fn test_copy_source_is_encoded() {
        assert_eq!(copy_source("b", "photos/c/a b.jpg"), "b%2Fphotos%2Fc%2Fa%20b.jpg");
    }
}
