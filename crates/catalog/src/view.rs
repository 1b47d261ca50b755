//! Product view-state coordinator.
//!
//! Bridges the [`ProductRepository`] to a presentation layer: it mirrors the
//! repository's product list, derives the tag universe, applies the selected
//! tag filter and surfaces errors. The presentation layer only reads
//! [`ViewState`] and calls the operations here.

use std::sync::Arc;

use boutique_core::{ALL_TAG, DocumentId, Product, derive_tags, filter_by_tag};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::repository::{CatalogSnapshot, ProductRepository};

/// Loading lifecycle of the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewPhase {
    /// `start` has not been called.
    #[default]
    Idle,
    /// Waiting for the first product list.
    Loading,
    /// A list (possibly empty) or a failure has arrived.
    Ready,
}

/// How [`CatalogView::start`] keeps the product list current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// One full fetch.
    Once,
    /// Follow the remote collection until shut down.
    #[default]
    Live,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub phase: ViewPhase,
    /// Full product list from the repository.
    pub products: Arc<[Product]>,
    /// `products` filtered by `selected_tag`.
    pub visible: Vec<Product>,
    /// `"All"` followed by the sorted, deduplicated product tags.
    pub tags: Vec<String>,
    pub selected_tag: String,
    /// Last failure message, if any.
    pub error: Option<String>,
    /// Repository revision this state was derived from.
    pub revision: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: ViewPhase::Idle,
            products: Arc::from(Vec::new()),
            visible: Vec::new(),
            tags: vec![ALL_TAG.to_string()],
            selected_tag: ALL_TAG.to_string(),
            error: None,
            revision: 0,
        }
    }
}

impl ViewState {
    /// Whether the view is ready and has no pending error.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self.phase, ViewPhase::Ready) && self.error.is_none()
    }

    /// Mirror a repository snapshot. Returns whether anything changed.
    ///
    /// A newer revision replaces the list and re-derives tags and the
    /// visible subset. An older or equal revision only picks up a recorded
    /// failure, keeping whatever was loaded before.
    fn apply(&mut self, snapshot: &CatalogSnapshot) -> bool {
        if snapshot.revision > self.revision {
            self.products = Arc::clone(&snapshot.products);
            self.tags = derive_tags(&self.products);
            self.visible = filter_by_tag(&self.products, &self.selected_tag);
            self.revision = snapshot.revision;
            self.error.clone_from(&snapshot.error);
            self.phase = ViewPhase::Ready;
            return true;
        }

        match &snapshot.error {
            Some(message) if self.error.as_ref() != Some(message) => {
                self.error = Some(message.clone());
                self.phase = ViewPhase::Ready;
                true
            }
            _ => false,
        }
    }
}

/// Background tasks started by [`CatalogView::start`].
///
/// Dropping the handle aborts them.
#[derive(Debug)]
pub struct SyncHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    /// Abort every background task.
    pub fn shutdown(self) {
        drop(self);
    }

    /// Whether every background task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Product view-state coordinator.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct CatalogView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    repository: ProductRepository,
    state: watch::Sender<ViewState>,
}

impl CatalogView {
    #[must_use]
    pub fn new(repository: ProductRepository) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            inner: Arc::new(ViewInner { repository, state }),
        }
    }

    /// The underlying repository.
    #[must_use]
    pub fn repository(&self) -> &ProductRepository {
        &self.inner.repository
    }

    /// Subscribe to view-state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    /// The current view state.
    #[must_use]
    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    /// Start synchronizing.
    ///
    /// Moves the view to `Loading` and spawns a task that re-derives the view
    /// on every repository publication. With [`SyncMode::Once`] this also
    /// performs a full fetch and returns once it has been applied; a failed
    /// fetch leaves the view `Ready` with an error. With [`SyncMode::Live`]
    /// the repository listener is spawned and this returns immediately.
    pub async fn start(&self, mode: SyncMode) -> SyncHandle {
        self.inner.state.send_if_modified(|state| {
            if state.phase == ViewPhase::Idle {
                state.phase = ViewPhase::Loading;
                true
            } else {
                false
            }
        });

        let mut tasks = vec![self.spawn_forwarder()];

        match mode {
            SyncMode::Once => {
                info!("Starting one-shot product sync");
                if let Err(e) = self.inner.repository.fetch_all().await {
                    warn!(error = %e, "Initial product fetch failed");
                }
                self.apply_current();
            }
            SyncMode::Live => {
                info!("Starting live product sync");
                tasks.push(self.inner.repository.spawn_listener());
            }
        }

        SyncHandle { tasks }
    }

    fn spawn_forwarder(&self) -> JoinHandle<()> {
        let view = self.clone();
        let mut snapshots = self.inner.repository.subscribe();

        tokio::spawn(async move {
            let initial = snapshots.borrow_and_update().clone();
            view.apply(&initial);
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                view.apply(&snapshot);
            }
            debug!("Repository channel closed; view forwarder exiting");
        })
    }

    fn apply(&self, snapshot: &CatalogSnapshot) {
        let changed = self
            .inner
            .state
            .send_if_modified(|state| state.apply(snapshot));
        if changed {
            debug!(revision = snapshot.revision, "View state updated");
        }
    }

    fn apply_current(&self) {
        let snapshot = self.inner.repository.snapshot();
        self.apply(&snapshot);
    }

    /// Select a tag and recompute the visible products.
    ///
    /// `"All"` shows the full list. The selection sticks: later
    /// publications are filtered by it too.
    pub fn filter_products(&self, tag: &str) {
        self.inner.state.send_modify(|state| {
            state.selected_tag = tag.to_string();
            state.visible = filter_by_tag(&state.products, tag);
        });
        debug!(tag, "Applied tag filter");
    }

    /// Add `delta` votes to a product.
    ///
    /// On success the repository publishes the updated count and the view
    /// picks it up. On failure the error is shown on the view and the count
    /// stays as it was.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the remote increment fails.
    pub async fn update_votes(&self, id: &DocumentId, delta: i64) -> Result<()> {
        match self.inner.repository.update_votes(id, delta).await {
            Ok(()) => {
                self.apply_current();
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.inner
                    .state
                    .send_modify(|state| state.error = Some(message));
                Err(e)
            }
        }
    }

    /// Dismiss the current error.
    pub fn clear_error(&self) {
        self.inner
            .state
            .send_if_modified(|state| state.error.take().is_some());
    }
}
