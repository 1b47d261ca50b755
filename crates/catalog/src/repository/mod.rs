//! Product repository.
//!
//! Owns the canonical product list. Every change (full fetch, live batch,
//! confirmed vote) is published as a complete [`CatalogSnapshot`] through a
//! `tokio::sync::watch` channel, so readers always see either the previous
//! list or the next one, never a partially merged one.

mod images;

pub use images::{ImagePolicy, ImageResolver};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use boutique_core::{DocumentId, Product, ProductKey, derive_tags};
use futures::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::{CatalogError, Result};
use crate::store::{ProductDocument, ProductStore, decode_document};

/// A published product list.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Full merged product list.
    pub products: Arc<[Product]>,
    /// Incremented on every publication; 0 until the first list arrives.
    pub revision: u64,
    /// Message of the most recent remote failure, cleared by the next
    /// successful fetch or live batch.
    pub error: Option<String>,
}

impl CatalogSnapshot {
    /// Whether at least one product list has been published.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.revision > 0
    }
}

/// Product repository shared by the coordinator and background tasks.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ProductRepository {
    inner: Arc<RepositoryInner>,
}

struct RepositoryInner {
    store: Arc<dyn ProductStore>,
    images: ImageResolver,
    snapshot: watch::Sender<CatalogSnapshot>,
    /// Serializes vote updates per product.
    vote_locks: std::sync::Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl ProductRepository {
    /// Create a repository over a remote store.
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>, sync: &SyncConfig) -> Self {
        let images = ImageResolver::new(
            Arc::clone(&store),
            sync.image_cache_capacity,
            sync.image_concurrency,
        );
        let (snapshot, _) = watch::channel(CatalogSnapshot::default());

        Self {
            inner: Arc::new(RepositoryInner {
                store,
                images,
                snapshot,
                vote_locks: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Subscribe to snapshot publications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// The current product list.
    #[must_use]
    pub fn products(&self) -> Arc<[Product]> {
        Arc::clone(&self.inner.snapshot.borrow().products)
    }

    /// Fetch every product, merge image URLs and publish the result.
    ///
    /// Documents without a `productID` are skipped. Image failures leave the
    /// affected product without images.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RemoteUnavailable`] if the collection query
    /// fails. The failure is also recorded on the snapshot; the previously
    /// published list stays in place.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Product>> {
        let documents = match self.inner.store.list_products().await {
            Ok(documents) => documents,
            Err(e) => {
                let err = CatalogError::from(e);
                warn!(error = %err, "Product fetch failed");
                self.record_error(&err);
                return Err(err);
            }
        };

        let products = self
            .inner
            .images
            .attach(decode_batch(&documents), ImagePolicy::Refresh)
            .await;

        info!(count = products.len(), "Fetched products");
        self.publish(products.clone());
        Ok(products)
    }

    /// Image URLs stored for a product key. Never fails; see
    /// [`ImageResolver::fetch_images`].
    pub async fn fetch_images(&self, product_key: &ProductKey) -> Vec<String> {
        self.inner.images.fetch_images(product_key).await
    }

    /// Tag universe of the current list: `"All"` followed by every product
    /// tag, sorted and deduplicated.
    #[must_use]
    pub fn fetch_tags(&self) -> Vec<String> {
        derive_tags(&self.inner.snapshot.borrow().products)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `delta` votes to a product.
    ///
    /// The remote store applies an atomic increment. Once it succeeds the
    /// local copy is updated and republished right away, without waiting for
    /// the live stream to echo the change. Updates for the same product are
    /// serialized.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RemoteUnavailable`] if the increment fails; the
    /// local vote count is left unchanged.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn update_votes(&self, id: &DocumentId, delta: i64) -> Result<()> {
        let lock = self.vote_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.apply_vote(id, delta).await
        };
        self.release_vote_lock(id, &lock);
        result
    }

    async fn apply_vote(&self, id: &DocumentId, delta: i64) -> Result<()> {
        self.inner.store.increment_votes(id, delta).await?;

        let applied = self.inner.snapshot.send_if_modified(|snapshot| {
            let mut products = snapshot.products.to_vec();
            let Some(product) = products.iter_mut().find(|p| p.id() == id) else {
                return false;
            };
            product.apply_vote_delta(delta);
            snapshot.products = products.into();
            snapshot.revision += 1;
            true
        });

        if applied {
            debug!(delta, "Applied vote locally");
        } else {
            debug!("Voted product is not in the local list");
        }
        Ok(())
    }

    /// Drop a product's cached image list so the next merge refetches it.
    pub async fn invalidate_images(&self, product_key: &ProductKey) {
        self.inner.images.invalidate(product_key).await;
    }

    /// Drop every cached image list.
    pub fn clear_image_cache(&self) {
        self.inner.images.clear();
    }

    // =========================================================================
    // Live updates
    // =========================================================================

    /// Spawn a background task that keeps the snapshot in sync with the
    /// remote collection.
    ///
    /// Every batch is merged with cached image lists (fetching only
    /// uncached keys) and published whole. Stream errors are recorded on the
    /// snapshot and the subscription continues.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let repository = self.clone();
        info!("Spawning product listener task");
        tokio::spawn(async move { repository.listen().await })
    }

    async fn listen(&self) {
        let mut changes = self.inner.store.watch_products();

        while let Some(batch) = changes.next().await {
            match batch {
                Ok(documents) => {
                    let products = self
                        .inner
                        .images
                        .attach(decode_batch(&documents), ImagePolicy::Cached)
                        .await;
                    info!(count = products.len(), "Publishing live product update");
                    self.publish(products);
                }
                Err(e) => {
                    let err = CatalogError::from(e);
                    warn!(error = %err, "Product listener error");
                    self.record_error(&err);
                }
            }
        }

        info!("Product listener stream ended");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn publish(&self, products: Vec<Product>) {
        self.inner.snapshot.send_modify(|snapshot| {
            snapshot.products = products.into();
            snapshot.revision += 1;
            snapshot.error = None;
        });
    }

    fn record_error(&self, err: &CatalogError) {
        let message = err.to_string();
        self.inner
            .snapshot
            .send_modify(|snapshot| snapshot.error = Some(message));
    }

    fn vote_lock(&self, id: &DocumentId) -> Arc<Mutex<()>> {
        let mut locks = self
            .inner
            .vote_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Drop the lock entry once no other update holds or awaits it.
    ///
    /// Clones are only taken under the map mutex, so the count is stable
    /// while it is held: the map and `lock` account for two references.
    fn release_vote_lock(&self, id: &DocumentId, lock: &Arc<Mutex<()>>) {
        let mut locks = self
            .inner
            .vote_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(lock) == 2 {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    fn vote_lock_count(&self) -> usize {
        self.inner
            .vote_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Decode a batch, skipping malformed documents.
fn decode_batch(documents: &[ProductDocument]) -> Vec<Product> {
    documents
        .iter()
        .filter_map(|document| match decode_document(document) {
            Ok(product) => Some(product),
            Err(source) => {
                let err = CatalogError::MalformedRecord {
                    document_id: document.id.clone(),
                    source,
                };
                debug!(error = %err, "Skipping product record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn fields(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    fn repository(store: &Arc<MemoryStore>) -> ProductRepository {
        ProductRepository::new(store.clone(), &SyncConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_all_skips_records_without_product_id() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "sku-1", "title": "Tote" })));
        store.upsert_document("d2", fields(json!({ "title": "No key" })));

        let repo = repository(&store);
        let products = repo.fetch_all().await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products.first().unwrap().title, "Tote");
        assert_eq!(repo.snapshot().revision, 1);
    }

    #[tokio::test]
    async fn test_fetch_all_failure_keeps_previous_list() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "sku-1" })));
        let repo = repository(&store);
        repo.fetch_all().await.unwrap();

        store.set_fail_queries(true);
        let result = repo.fetch_all().await;

        assert!(matches!(result, Err(CatalogError::RemoteUnavailable(_))));
        let snapshot = repo.snapshot();
        assert_eq!(snapshot.products.len(), 1);
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_fetch_images_excludes_failed_blob() {
        let store = Arc::new(MemoryStore::new());
        store.add_image("sku-1", "images/sku-1/a.jpg", "https://cdn/a.jpg");
        store.add_image("sku-1", "images/sku-1/b.jpg", "https://cdn/b.jpg");
        store.fail_blob("images/sku-1/a.jpg");

        let repo = repository(&store);
        let urls = repo.fetch_images(&ProductKey::new("sku-1")).await;

        assert_eq!(urls, vec!["https://cdn/b.jpg"]);
    }

    #[tokio::test]
    async fn test_fetch_images_listing_failure_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.add_image("sku-1", "images/sku-1/a.jpg", "https://cdn/a.jpg");
        store.fail_images_for("sku-1");

        let repo = repository(&store);
        assert!(repo.fetch_images(&ProductKey::new("sku-1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_tags_from_current_list() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "a", "tags": ["Shoes", "Sale"] })));
        store.upsert_document("d2", fields(json!({ "productID": "b", "tags": ["Hats", "Sale"] })));

        let repo = repository(&store);
        assert_eq!(repo.fetch_tags(), vec!["All"]);

        repo.fetch_all().await.unwrap();
        assert_eq!(repo.fetch_tags(), vec!["All", "Hats", "Sale", "Shoes"]);
    }

    #[tokio::test]
    async fn test_update_votes_applies_locally_after_remote_success() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "sku-1", "votes": 2 })));
        let repo = repository(&store);
        repo.fetch_all().await.unwrap();

        repo.update_votes(&DocumentId::new("d1"), 1).await.unwrap();

        assert_eq!(repo.products().first().unwrap().votes(), 3);
        assert_eq!(store.stored_votes(&DocumentId::new("d1")), Some(3));
    }

    #[tokio::test]
    async fn test_update_votes_failure_leaves_local_count() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "sku-1", "votes": 2 })));
        let repo = repository(&store);
        repo.fetch_all().await.unwrap();
        let revision = repo.snapshot().revision;

        store.set_fail_votes(true);
        let result = repo.update_votes(&DocumentId::new("d1"), 1).await;

        assert!(matches!(result, Err(CatalogError::RemoteUnavailable(_))));
        assert_eq!(repo.products().first().unwrap().votes(), 2);
        assert_eq!(repo.snapshot().revision, revision);
        assert_eq!(repo.vote_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_votes_on_same_product_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_document("d1", fields(json!({ "productID": "sku-1", "votes": 0 })));
        let repo = repository(&store);
        repo.fetch_all().await.unwrap();

        let id = DocumentId::new("d1");
        let updates: Vec<_> = (0..10)
            .map(|_| {
                let repo = repo.clone();
                let id = id.clone();
                tokio::spawn(async move { repo.update_votes(&id, 1).await })
            })
            .collect();
        for update in updates {
            update.await.unwrap().unwrap();
        }

        assert_eq!(repo.products().first().unwrap().votes(), 10);
        assert_eq!(store.stored_votes(&id), Some(10));
        assert_eq!(repo.vote_lock_count(), 0);
    }

    #[test]
    fn test_decode_batch_preserves_order() {
        let documents = vec![
            ProductDocument::new(DocumentId::new("b"), fields(json!({ "productID": "2" }))),
            ProductDocument::new(DocumentId::new("x"), fields(json!({}))),
            ProductDocument::new(DocumentId::new("a"), fields(json!({ "productID": "1" }))),
        ];
        let ids: Vec<String> = decode_batch(&documents)
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
