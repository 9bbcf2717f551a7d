use crate::fetch::{ImageFetcher, ImageResizer};
use crate::messages::MessageStore;
use crate::object_store::ObjectStore;
use crate::recognition::FaceRecognition;
use crate::settings::SettingsStore;
use std::sync::Arc;

/// Collaborators every pipeline can reach. Constructed by the process entry point.
#[derive(Clone)]
pub struct Clients {
    pub objects: Arc<dyn ObjectStore>,
    pub faces: Arc<dyn FaceRecognition>,
    pub settings: Arc<dyn SettingsStore>,
    pub messages: Arc<dyn MessageStore>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub resizer: Arc<dyn ImageResizer>,
}

/// Resolved per-deployment resource names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    pub bucket: String,
    pub collection: String,
}

/// Everything a pipeline call needs: collaborators plus the resources they act on.
#[derive(Clone)]
pub struct TasteContext {
    pub clients: Clients,
    pub resources: Resources,
}
