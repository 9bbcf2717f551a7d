use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Which D-Bus bus the daemon registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Session,
    System,
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// AWS region for S3 and Rekognition (default: us-east-1).
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Rekognition collection id; discovered or minted when unset.
    pub collection_name: Option<String>,
    /// S3 bucket; discovered or minted when unset.
    pub bucket_name: Option<String>,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Timeout for one AWS operation or photo download.
    pub request_timeout: Duration,
    /// Minimum similarity for a Rekognition search match.
    pub face_match_threshold: Option<f32>,
    pub bus: Bus,
}

impl Config {
    /// Load configuration from `AWS_*` and `TASTE_*` environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("taste");

        let db_path = std::env::var("TASTE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("taste.db"));

        Ok(Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            collection_name: optional("TASTE_COLLECTION_NAME"),
            bucket_name: optional("TASTE_BUCKET_NAME"),
            db_path,
            request_timeout: Duration::from_secs(env_u64("TASTE_REQUEST_TIMEOUT_SECS", 30)),
            face_match_threshold: std::env::var("TASTE_FACE_MATCH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok()),
            bus: match std::env::var("TASTE_BUS").as_deref() {
                Ok("system") => Bus::System,
                _ => Bus::Session,
            },
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
