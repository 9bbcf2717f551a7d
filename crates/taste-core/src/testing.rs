//! In-memory collaborators for pipeline tests.

use crate::context::{Clients, Resources, TasteContext};
use crate::fetch::{FetchError, FetchedImage, ImageFetcher, ImageResizer};
use crate::messages::{Message, MessageError, MessageStore};
use crate::object_store::{ObjectStore, StoreError};
use crate::recognition::{FaceRecognition, RecognitionError};
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::types::{FaceMatch, FaceRecord};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_BUCKET: &str = "get-me-a-date-test-bucket";
pub const TEST_COLLECTION: &str = "get-me-a-date-test-collection";

/// Tracks concurrent calls and the peak seen.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    async fn run<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let out = fut.await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    failing_copies: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    copies: AtomicUsize,
    in_flight: InFlight,
}

impl MemoryObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_copy_of(&self, src_key: &str) {
        self.failing_copies.lock().unwrap().insert(src_key.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        self.touch();
        Ok(self.buckets())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.touch();
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.touch();
        Ok(self
            .keys(bucket)
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        self.touch();
        self.insert(bucket, key, &bytes);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.touch();
        if let Some(objects) = self.buckets.lock().unwrap().get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_key: &str,
    ) -> Result<(), StoreError> {
        self.touch();
        self.in_flight
            .run(async {
                self.copies.fetch_add(1, Ordering::SeqCst);
                if self.failing_copies.lock().unwrap().contains(src_key) {
                    return Err(StoreError::Service("copy refused".into()));
                }
                let bytes = self
                    .get(bucket, src_key)
                    .ok_or_else(|| StoreError::Service(format!("no such key: {src_key}")))?;
                self.insert(bucket, dst_key, &bytes);
                Ok(())
            })
            .await
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("https://objects.test/{bucket}/{key}")
    }
}

/// Scripted result of `index_faces` for one key. Unscripted keys yield one face.
#[derive(Debug, Clone)]
pub enum IndexScript {
    Faces(usize),
    InvalidImage,
    ServiceError,
}

/// Scripted result of `search_faces_by_image` for one key. Unscripted keys match nothing.
#[derive(Debug, Clone)]
pub enum SearchScript {
    Similarities(Vec<f64>),
    InvalidImage,
    ServiceError,
}

#[derive(Default)]
pub struct MemoryRecognition {
    collections: Mutex<BTreeSet<String>>,
    faces: Mutex<Vec<FaceRecord>>,
    index_scripts: Mutex<HashMap<String, IndexScript>>,
    search_scripts: Mutex<HashMap<String, SearchScript>>,
    next_face: AtomicUsize,
    calls: AtomicUsize,
    index_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    deleted_faces: AtomicUsize,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
    in_flight: InFlight,
}

impl MemoryRecognition {
    pub fn script(&self, key: &str, script: IndexScript) {
        self.index_scripts
            .lock()
            .unwrap()
            .insert(key.to_string(), script);
    }

    pub fn script_search(&self, key: &str, script: SearchScript) {
        self.search_scripts
            .lock()
            .unwrap()
            .insert(key.to_string(), script);
    }

    pub fn seed(&self, record: FaceRecord) {
        self.faces.lock().unwrap().push(record);
    }

    pub fn faces_for(&self, key: &str) -> Vec<FaceRecord> {
        self.faces
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.external_image_id == key)
            .cloned()
            .collect()
    }

    pub fn all_faces(&self) -> Vec<FaceRecord> {
        self.faces.lock().unwrap().clone()
    }

    pub fn collections(&self) -> Vec<String> {
        self.collections.lock().unwrap().iter().cloned().collect()
    }

    pub fn fail_create_collection(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn fail_list_faces(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_face_count(&self) -> usize {
        self.deleted_faces.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FaceRecognition for MemoryRecognition {
    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError> {
        self.touch();
        Ok(self.collections())
    }

    async fn create_collection(&self, collection: &str) -> Result<(), RecognitionError> {
        self.touch();
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RecognitionError::Service("access denied".into()));
        }
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string());
        Ok(())
    }

    async fn list_faces(&self, _collection: &str) -> Result<Vec<FaceRecord>, RecognitionError> {
        self.touch();
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RecognitionError::Service("list failed".into()));
        }
        Ok(self.all_faces())
    }

    async fn index_faces(
        &self,
        _collection: &str,
        _bucket: &str,
        key: &str,
    ) -> Result<Vec<String>, RecognitionError> {
        self.touch();
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight
            .run(async {
                let script = self
                    .index_scripts
                    .lock()
                    .unwrap()
                    .get(key)
                    .cloned()
                    .unwrap_or(IndexScript::Faces(1));
                match script {
                    IndexScript::Faces(n) => {
                        let mut ids = Vec::with_capacity(n);
                        let mut faces = self.faces.lock().unwrap();
                        for _ in 0..n {
                            let id = format!("face-{}", self.next_face.fetch_add(1, Ordering::SeqCst));
                            faces.push(FaceRecord {
                                face_id: id.clone(),
                                external_image_id: key.to_string(),
                            });
                            ids.push(id);
                        }
                        Ok(ids)
                    }
                    IndexScript::InvalidImage => Err(RecognitionError::InvalidImage(
                        "InvalidImageFormatException".into(),
                    )),
                    IndexScript::ServiceError => {
                        Err(RecognitionError::Service("internal server error".into()))
                    }
                }
            })
            .await
    }

    async fn delete_faces(
        &self,
        _collection: &str,
        face_ids: &[String],
    ) -> Result<(), RecognitionError> {
        self.touch();
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RecognitionError::Throttled("slow down".into()));
        }
        let mut faces = self.faces.lock().unwrap();
        let before = faces.len();
        faces.retain(|f| !face_ids.contains(&f.face_id));
        self.deleted_faces
            .fetch_add(before - faces.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn search_faces_by_image(
        &self,
        _collection: &str,
        _bucket: &str,
        key: &str,
    ) -> Result<Vec<FaceMatch>, RecognitionError> {
        self.touch();
        self.in_flight
            .run(async {
                let script = self.search_scripts.lock().unwrap().get(key).cloned();
                match script {
                    None => Ok(Vec::new()),
                    Some(SearchScript::Similarities(values)) => Ok(values
                        .into_iter()
                        .map(|similarity| FaceMatch {
                            face_id: None,
                            similarity,
                        })
                        .collect()),
                    Some(SearchScript::InvalidImage) => Err(RecognitionError::InvalidImage(
                        "There are no faces in the image".into(),
                    )),
                    Some(SearchScript::ServiceError) => {
                        Err(RecognitionError::Service("internal server error".into()))
                    }
                }
            })
            .await
    }
}

#[derive(Default)]
pub struct MemorySettings {
    stored: Mutex<Option<Settings>>,
    creates: AtomicUsize,
}

impl MemorySettings {
    pub fn set_threshold(&self, threshold: f64) {
        *self.stored.lock().unwrap() = Some(Settings {
            like_photos_threshold: threshold,
            ..Settings::default()
        });
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn find(&self, id: i64) -> Result<Option<Settings>, SettingsError> {
        Ok(self.stored.lock().unwrap().clone().filter(|s| s.id == id))
    }

    async fn create(&self, settings: &Settings) -> Result<Settings, SettingsError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(settings.clone());
        Ok(settings.clone())
    }
}

#[derive(Default)]
pub struct MemoryMessages {
    pub stored: Mutex<Vec<Message>>,
}

#[async_trait]
impl MessageStore for MemoryMessages {
    async fn upsert(&self, message: &Message) -> Result<(), MessageError> {
        let mut stored = self.stored.lock().unwrap();
        stored.retain(|m| {
            !(m.channel_name == message.channel_name
                && m.channel_message_id == message.channel_message_id)
        });
        stored.push(message.clone());
        Ok(())
    }
}

/// Serves `b"jpeg:<url>"` for every URL unless told to fail.
#[derive(Default)]
pub struct StaticFetcher {
    failing: Mutex<HashMap<String, u16>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn fail(&self, url: &str, status: u16) {
        self.failing.lock().unwrap().insert(url.to_string(), status);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.failing.lock().unwrap().get(url).copied() {
            return Err(FetchError::Download {
                url: url.to_string(),
                status,
                message: "Not Found".into(),
            });
        }
        Ok(FetchedImage {
            bytes: format!("jpeg:{url}").into_bytes(),
            content_type: Some("image/jpeg".into()),
        })
    }
}

/// Replaces the image with `b"<w>x<h>"`.
#[derive(Default)]
pub struct RecordingResizer {
    pub requests: Mutex<Vec<(u32, u32)>>,
}

#[async_trait]
impl ImageResizer for RecordingResizer {
    async fn resize(&self, _bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push((width, height));
        Ok(format!("{width}x{height}").into_bytes())
    }
}

/// One of each fake, shared between the test and the pipeline under test.
#[derive(Clone)]
pub struct Fakes {
    pub objects: Arc<MemoryObjectStore>,
    pub faces: Arc<MemoryRecognition>,
    pub settings: Arc<MemorySettings>,
    pub messages: Arc<MemoryMessages>,
    pub fetcher: Arc<StaticFetcher>,
    pub resizer: Arc<RecordingResizer>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            objects: Arc::default(),
            faces: Arc::default(),
            settings: Arc::default(),
            messages: Arc::default(),
            fetcher: Arc::default(),
            resizer: Arc::default(),
        }
    }

    pub fn clients(&self) -> Clients {
        Clients {
            objects: self.objects.clone(),
            faces: self.faces.clone(),
            settings: self.settings.clone(),
            messages: self.messages.clone(),
            fetcher: self.fetcher.clone(),
            resizer: self.resizer.clone(),
        }
    }

    /// Context over pre-provisioned test resources.
    pub fn context(&self) -> TasteContext {
        self.objects
            .buckets
            .lock()
            .unwrap()
            .entry(TEST_BUCKET.to_string())
            .or_default();
        self.faces
            .collections
            .lock()
            .unwrap()
            .insert(TEST_COLLECTION.to_string());
        TasteContext {
            clients: self.clients(),
            resources: Resources {
                bucket: TEST_BUCKET.to_string(),
                collection: TEST_COLLECTION.to_string(),
            },
        }
    }

    /// Calls made to any remote collaborator.
    pub fn network_calls(&self) -> usize {
        self.objects.calls() + self.faces.calls() + self.fetcher.calls()
    }
}
