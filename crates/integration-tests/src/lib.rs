//! Integration tests for Boutique.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boutique-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `repository` - product sync, image merging and votes
//! - `cart` - cart lines and totals against synced products
//! - `view` - view-state coordination in one-shot and live mode
//!
//! Every test runs against [`MemoryStore`], so no backend is needed.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use boutique_catalog::store::MemoryStore;
use boutique_catalog::{CatalogConfig, CatalogState, FirebaseConfig, SyncConfig};
use serde_json::{Map, Value, json};
use tokio::sync::watch;

/// How long helpers wait for an asynchronous publication.
pub const WAIT: Duration = Duration::from_secs(5);

/// A catalog wired to an in-memory store.
pub struct TestCatalog {
    pub store: Arc<MemoryStore>,
    pub state: CatalogState,
}

impl TestCatalog {
    /// Empty store with default sync settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sync(SyncConfig::default())
    }

    /// Empty store with custom sync settings.
    #[must_use]
    pub fn with_sync(sync: SyncConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = CatalogState::with_store(test_config(sync), store.clone());
        Self { store, state }
    }

    /// Store seeded with [`seed_products`].
    #[must_use]
    pub fn seeded() -> Self {
        let catalog = Self::new();
        seed_products(&catalog.store);
        catalog
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration pointing at unroutable URLs; only the sync settings matter.
#[must_use]
pub fn test_config(sync: SyncConfig) -> CatalogConfig {
    CatalogConfig {
        firebase: FirebaseConfig {
            project_id: "boutique-test".to_string(),
            storage_bucket: "boutique-test.appspot.com".to_string(),
            api_key: None,
            firestore_url: "http://127.0.0.1:9".to_string(),
            storage_url: "http://127.0.0.1:9".to_string(),
            collection: "products".to_string(),
            image_namespace: "images".to_string(),
        },
        sync,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Document fields for a product.
#[must_use]
pub fn product_fields(
    product_id: &str,
    title: &str,
    price: &str,
    votes: i64,
    tags: &[&str],
) -> Map<String, Value> {
    json!({
        "productID": product_id,
        "title": title,
        "description": format!("{title} description"),
        "price": price,
        "votes": votes,
        "tags": tags,
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Three products with images:
///
/// | doc | productID | price  | tags           | images |
/// |-----|-----------|--------|----------------|--------|
/// | d1  | sku-tee   | $25    | Shirts, Summer | 2      |
/// | d2  | sku-cap   | $15.50 | Hats, Summer   | 1      |
/// | d3  | sku-mug   | N/A    | Home           | 0      |
pub fn seed_products(store: &MemoryStore) {
    store.upsert_document("d1", product_fields("sku-tee", "Tee", "$25", 4, &["Shirts", "Summer"]));
    store.upsert_document("d2", product_fields("sku-cap", "Cap", "$15.50", 1, &["Hats", "Summer"]));
    store.upsert_document("d3", product_fields("sku-mug", "Mug", "N/A", 0, &["Home"]));

    store.add_image("sku-tee", "images/sku-tee/front.jpg", "https://cdn.test/tee-front.jpg");
    store.add_image("sku-tee", "images/sku-tee/back.jpg", "https://cdn.test/tee-back.jpg");
    store.add_image("sku-cap", "images/sku-cap/side.jpg", "https://cdn.test/cap-side.jpg");
}

/// Wait until a watched value satisfies `predicate`, returning a copy.
///
/// # Panics
///
/// Panics if the predicate does not hold within [`WAIT`] or the channel
/// closes first.
pub async fn wait_until<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    match tokio::time::timeout(WAIT, rx.wait_for(predicate)).await {
        Ok(Ok(value)) => value.clone(),
        Ok(Err(_)) => panic!("watch channel closed"),
        Err(_) => panic!("timed out waiting for publication"),
    }
}
