//! Remote product store contract.
//!
//! # Architecture
//!
//! The catalog never talks to a backend directly. Everything goes through
//! [`ProductStore`], which models the two halves of the remote side:
//!
//! - a document collection keyed by document id holding product records
//! - a blob store keyed by product key holding product images
//!
//! # Implementations
//!
//! - [`crate::firebase::FirestoreStore`] - Firestore + Cloud Storage REST APIs
//! - [`MemoryStore`] - in-process store with failure injection, used by tests
//!   and local demos

mod memory;
mod record;

pub use memory::MemoryStore;
pub use record::{RecordError, decode_document};

use async_trait::async_trait;
use boutique_core::{DocumentId, ProductKey};
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors that can occur when talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A raw product document as read from the collection.
///
/// `fields` holds plain JSON values (adapters decode any backend-specific
/// value encoding before handing documents out).
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDocument {
    pub id: DocumentId,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ProductDocument {
    #[must_use]
    pub const fn new(id: DocumentId, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { id, fields }
    }
}

/// Reference to a stored image object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    /// Full object path inside the bucket (e.g., `images/sku-1/front.jpg`).
    pub path: String,
}

impl BlobRef {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Stream of full collection reads, one item per change notification.
pub type ChangeStream = BoxStream<'static, Result<Vec<ProductDocument>, StoreError>>;

/// Access contract for the remote product store.
///
/// Implementations must be thread-safe; the repository shares one store
/// across concurrent image fetches and vote updates.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Read every document in the product collection.
    async fn list_products(&self) -> Result<Vec<ProductDocument>, StoreError>;

    /// List image objects stored under the product's key.
    async fn list_images(&self, product_key: &ProductKey) -> Result<Vec<BlobRef>, StoreError>;

    /// Resolve the public URL of one image object.
    async fn resolve_image_url(&self, blob: &BlobRef) -> Result<String, StoreError>;

    /// Atomically add `delta` to the document's `votes` field.
    async fn increment_votes(&self, id: &DocumentId, delta: i64) -> Result<(), StoreError>;

    /// Subscribe to the collection.
    ///
    /// Each item is the full document set after a change. Errors are
    /// reported in-band; the stream keeps going after an error unless the
    /// implementation documents otherwise.
    fn watch_products(&self) -> ChangeStream;
}
