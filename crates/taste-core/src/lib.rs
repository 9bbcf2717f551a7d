//! taste-core — Training-collection sync, photo check-out and taste acquisition.
//!
//! Face detection and matching are delegated to a [`FaceRecognition`]
//! service, images live in an [`ObjectStore`] bucket. This crate keeps the
//! two consistent and turns similarity searches into like decisions.

pub mod acquire;
pub mod checkout;
pub mod context;
pub mod fetch;
pub mod indexer;
pub mod messages;
pub mod object_store;
pub mod paths;
pub mod photos;
pub mod provision;
pub mod recognition;
pub mod service;
pub mod settings;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

/// Concurrency cap of every batch fan-out (indexing, check-out, copies).
pub const BATCH_CONCURRENCY: usize = 2;

pub use context::{Clients, Resources, TasteContext};
pub use object_store::{ObjectStore, StoreError};
pub use recognition::{FaceRecognition, RecognitionError};
pub use service::Taste;
pub use types::{FaceMatch, FaceRecord, Photo, PhotoPatch};
