//! Image URL resolution and the product key → images cache.

use std::sync::Arc;

use boutique_core::{Product, ProductKey};
use futures::{StreamExt, stream};
use moka::future::Cache;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::error::CatalogError;
use crate::store::{BlobRef, ProductStore};

/// How [`ImageResolver::attach`] should source image lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    /// Fetch every product's images from the store (full resync).
    Refresh,
    /// Reuse cached lists; fetch only keys that are not cached yet.
    Cached,
}

/// Resolves product image URLs with bounded fan-out and caches the results.
///
/// Products and their objects fan out in nested streams, so every remote
/// call also takes a permit from one shared semaphore. At most
/// `concurrency` listings and resolutions run at once across all products.
#[derive(Clone)]
pub struct ImageResolver {
    store: Arc<dyn ProductStore>,
    cache: Cache<ProductKey, Arc<Vec<String>>>,
    concurrency: usize,
    permits: Arc<Semaphore>,
}

impl ImageResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>, cache_capacity: u64, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            store,
            cache: Cache::builder().max_capacity(cache_capacity).build(),
            concurrency,
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Fetch the image URLs stored under a product key.
    ///
    /// Never fails: a listing failure yields an empty list, and each object
    /// whose URL cannot be resolved is logged and left out. The result is
    /// cached only when every object resolved.
    #[instrument(skip(self), fields(product_key = %product_key))]
    pub async fn fetch_images(&self, product_key: &ProductKey) -> Vec<String> {
        let listed = {
            let _permit = self.permits.acquire().await.ok();
            self.store.list_images(product_key).await
        };
        let blobs = match listed {
            Ok(blobs) => blobs,
            Err(e) => {
                warn!(error = %e, "Failed to list product images");
                return Vec::new();
            }
        };

        let total = blobs.len();
        let resolved: Vec<Option<String>> = stream::iter(blobs)
            .map(|blob| self.resolve(blob))
            .buffered(self.concurrency)
            .collect()
            .await;
        let urls: Vec<String> = resolved.into_iter().flatten().collect();

        if urls.len() == total {
            self.cache
                .insert(product_key.clone(), Arc::new(urls.clone()))
                .await;
        } else {
            debug!(resolved = urls.len(), total, "Not caching partial image list");
        }

        urls
    }

    async fn resolve(&self, blob: BlobRef) -> Option<String> {
        let resolved = {
            let _permit = self.permits.acquire().await.ok();
            self.store.resolve_image_url(&blob).await
        };
        match resolved {
            Ok(url) => Some(url),
            Err(source) => {
                let err = CatalogError::ImageResolution {
                    path: blob.path,
                    source,
                };
                warn!(error = %err, "Excluding image");
                None
            }
        }
    }

    /// Image URLs for a key, from the cache when present.
    pub async fn cached_or_fetch(&self, product_key: &ProductKey) -> Vec<String> {
        if let Some(hit) = self.cache.get(product_key).await {
            return hit.as_ref().clone();
        }
        self.fetch_images(product_key).await
    }

    /// Attach image URLs to every product, preserving order.
    ///
    /// At most `concurrency` products are fetched at once. A failure for one
    /// product leaves that product without images and does not hold back
    /// the others.
    pub async fn attach(&self, products: Vec<Product>, policy: ImagePolicy) -> Vec<Product> {
        stream::iter(products)
            .map(|product| async move {
                let urls = match policy {
                    ImagePolicy::Refresh => self.fetch_images(product.product_id()).await,
                    ImagePolicy::Cached => self.cached_or_fetch(product.product_id()).await,
                };
                product.with_image_urls(urls)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Drop one key from the cache so the next merge refetches it.
    pub async fn invalidate(&self, product_key: &ProductKey) {
        self.cache.invalidate(product_key).await;
    }

    /// Drop every cached image list.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
