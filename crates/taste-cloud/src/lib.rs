//! taste-cloud — Concrete collaborators for taste-core.
//!
//! S3 for training and candidate images, Rekognition for the reference face
//! collection, `reqwest` for downloading remote photos and the `image` crate
//! for thumbnails.

pub mod aws;
pub mod http;
pub mod rekognition;
pub mod resize;
pub mod s3;

pub use aws::{load_sdk_config, AwsSettings};
pub use http::HttpFetcher;
pub use rekognition::RekognitionCollection;
pub use resize::ImageCrateResizer;
pub use s3::S3ObjectStore;
