//! Catalog state shared by every consumer of the core.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::config::CatalogConfig;
use crate::firebase::FirestoreStore;
use crate::repository::ProductRepository;
use crate::store::ProductStore;
use crate::view::CatalogView;

/// Owns the repository, the view coordinator and the cart.
///
/// This struct is cheaply cloneable via `Arc`; clones share the same
/// product list and cart.
#[derive(Clone)]
pub struct CatalogState {
    inner: Arc<CatalogStateInner>,
}

struct CatalogStateInner {
    config: CatalogConfig,
    view: CatalogView,
    cart: CartStore,
}

impl CatalogState {
    /// Build the state on top of the Firestore REST store.
    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        let store = FirestoreStore::new(&config.firebase, config.sync.poll_interval);
        Self::with_store(config, Arc::new(store))
    }

    /// Build the state on top of any product store.
    #[must_use]
    pub fn with_store(config: CatalogConfig, store: Arc<dyn ProductStore>) -> Self {
        let repository = ProductRepository::new(store, &config.sync);
        let view = CatalogView::new(repository);

        Self {
            inner: Arc::new(CatalogStateInner {
                config,
                view,
                cart: CartStore::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn view(&self) -> &CatalogView {
        &self.inner.view
    }

    #[must_use]
    pub fn repository(&self) -> &ProductRepository {
        self.inner.view.repository()
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }
}
