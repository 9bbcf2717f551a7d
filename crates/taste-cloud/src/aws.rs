//! Shared AWS SDK configuration.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::config::Credentials;
use std::time::Duration;

/// Connection settings shared by the S3 and Rekognition clients.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Upper bound for one SDK operation, retries included.
    pub operation_timeout: Duration,
}

/// Build an SDK config with static credentials and an operation timeout.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let credentials = Credentials::new(
        settings.access_key_id.clone(),
        settings.secret_access_key.clone(),
        None,
        None,
        "taste",
    );
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(settings.operation_timeout)
        .build();

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials)
        .timeout_config(timeouts)
        .load()
        .await;
    tracing::debug!(
        region = %settings.region,
        timeout_secs = settings.operation_timeout.as_secs(),
        "AWS config loaded"
    );
    config
}
