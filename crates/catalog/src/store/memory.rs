//! In-process product store.
//!
//! Keeps documents and image objects in memory and notifies watchers on every
//! write. Failures can be injected per operation so callers can exercise
//! their error paths without a backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::{DocumentId, ProductKey};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::debug;

use super::{BlobRef, ChangeStream, ProductDocument, ProductStore, StoreError};

#[derive(Default)]
struct MemoryState {
    documents: Vec<ProductDocument>,
    /// Image objects per product key, in listing order.
    images: HashMap<ProductKey, Vec<(BlobRef, String)>>,
    failing_image_keys: HashSet<ProductKey>,
    failing_blobs: HashSet<String>,
    image_delays: HashMap<ProductKey, Duration>,
    blob_delays: HashMap<String, Duration>,
}

/// In-memory [`ProductStore`].
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    /// Latest document set, republished on every write.
    changes: watch::Sender<Vec<ProductDocument>>,
    fail_queries: Arc<AtomicBool>,
    fail_votes: AtomicBool,
    image_list_calls: AtomicUsize,
    /// Image listings and URL resolutions currently running, and the peak.
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Counts one running image request for as long as it lives.
struct InFlight<'a> {
    store: &'a MemoryStore,
}

impl<'a> InFlight<'a> {
    fn enter(store: &'a MemoryStore) -> Self {
        let now = store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        store.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { store }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(Vec::new());
        Self {
            state: RwLock::new(MemoryState::default()),
            changes,
            fail_queries: Arc::new(AtomicBool::new(false)),
            fail_votes: AtomicBool::new(false),
            image_list_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the current documents. Called with the write lock held so
    /// watchers see writes in the order they were applied.
    fn publish(&self, state: &MemoryState) {
        self.changes.send_replace(state.documents.clone());
    }

    /// Insert or replace a document and notify watchers.
    pub fn upsert_document(&self, id: impl Into<DocumentId>, fields: Map<String, Value>) {
        let id = id.into();
        let mut state = self.write();
        if let Some(existing) = state.documents.iter_mut().find(|d| d.id == id) {
            existing.fields = fields;
        } else {
            state.documents.push(ProductDocument::new(id, fields));
        }
        self.publish(&state);
    }

    /// Remove a document and notify watchers. Returns whether it existed.
    pub fn remove_document(&self, id: &DocumentId) -> bool {
        let mut state = self.write();
        let before = state.documents.len();
        state.documents.retain(|d| &d.id != id);
        let removed = state.documents.len() != before;
        if removed {
            self.publish(&state);
        }
        removed
    }

    /// Store an image object under a product key.
    pub fn add_image(&self, product_key: impl Into<ProductKey>, path: &str, url: &str) {
        self.write()
            .images
            .entry(product_key.into())
            .or_default()
            .push((BlobRef::new(path), url.to_owned()));
    }

    /// Make every query and watch emission fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Make vote increments fail.
    pub fn set_fail_votes(&self, fail: bool) {
        self.fail_votes.store(fail, Ordering::SeqCst);
    }

    /// Make image listing fail for one product key.
    pub fn fail_images_for(&self, product_key: impl Into<ProductKey>) {
        self.write().failing_image_keys.insert(product_key.into());
    }

    /// Make URL resolution fail for one object path.
    pub fn fail_blob(&self, path: &str) {
        self.write().failing_blobs.insert(path.to_owned());
    }

    /// Delay image listing for one product key.
    pub fn delay_images_for(&self, product_key: impl Into<ProductKey>, delay: Duration) {
        self.write().image_delays.insert(product_key.into(), delay);
    }

    /// Make image listing succeed again for one product key.
    pub fn heal_images_for(&self, product_key: impl Into<ProductKey>) {
        self.write().failing_image_keys.remove(&product_key.into());
    }

    /// Delay URL resolution for one object path.
    pub fn delay_blob(&self, path: &str, delay: Duration) {
        self.write().blob_delays.insert(path.to_owned(), delay);
    }

    /// Highest number of image listings and URL resolutions that ran at
    /// the same time.
    #[must_use]
    pub fn peak_image_requests(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of image listings served so far.
    #[must_use]
    pub fn image_list_calls(&self) -> usize {
        self.image_list_calls.load(Ordering::SeqCst)
    }

    /// Current `votes` value stored for a document.
    #[must_use]
    pub fn stored_votes(&self, id: &DocumentId) -> Option<i64> {
        self.read()
            .documents
            .iter()
            .find(|d| &d.id == id)
            .map(|d| d.fields.get("votes").and_then(Value::as_i64).unwrap_or(0))
    }

    fn snapshot(&self) -> Result<Vec<ProductDocument>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("query failed".to_string()));
        }
        Ok(self.read().documents.clone())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<ProductDocument>, StoreError> {
        self.snapshot()
    }

    async fn list_images(&self, product_key: &ProductKey) -> Result<Vec<BlobRef>, StoreError> {
        self.image_list_calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(self);

        let delay = self.read().image_delays.get(product_key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.read();
        if state.failing_image_keys.contains(product_key) {
            return Err(StoreError::Unavailable(format!(
                "image listing failed for {product_key}"
            )));
        }
        Ok(state
            .images
            .get(product_key)
            .map(|objects| objects.iter().map(|(blob, _)| blob.clone()).collect())
            .unwrap_or_default())
    }

    async fn resolve_image_url(&self, blob: &BlobRef) -> Result<String, StoreError> {
        let _in_flight = InFlight::enter(self);

        let delay = self.read().blob_delays.get(&blob.path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.read();
        if state.failing_blobs.contains(&blob.path) {
            return Err(StoreError::Unavailable(format!(
                "no download URL for {}",
                blob.path
            )));
        }
        state
            .images
            .values()
            .flatten()
            .find(|(candidate, _)| candidate == blob)
            .map(|(_, url)| url.clone())
            .ok_or_else(|| StoreError::NotFound(blob.path.clone()))
    }

    async fn increment_votes(&self, id: &DocumentId, delta: i64) -> Result<(), StoreError> {
        if self.fail_votes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("vote update failed".to_string()));
        }
        let mut state = self.write();
        let document = state
            .documents
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let current = document
            .fields
            .get("votes")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        document
            .fields
            .insert("votes".to_string(), Value::from(current.saturating_add(delta)));
        self.publish(&state);
        drop(state);

        debug!(%id, delta, "Incremented votes");
        Ok(())
    }

    fn watch_products(&self) -> ChangeStream {
        let mut changes = self.changes.subscribe();
        let fail_queries = Arc::clone(&self.fail_queries);

        Box::pin(async_stream::stream! {
            loop {
                let documents = changes.borrow_and_update().clone();
                if fail_queries.load(Ordering::SeqCst) {
                    yield Err(StoreError::Unavailable("listen failed".to_string()));
                } else {
                    yield Ok(documents);
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
