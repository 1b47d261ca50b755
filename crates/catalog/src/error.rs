//! Catalog error taxonomy.
//!
//! Only [`CatalogError::RemoteUnavailable`] is ever returned to callers. The
//! other variants describe per-record and per-image problems that are logged
//! and skipped so the rest of a batch still gets published.

use boutique_core::DocumentId;
use thiserror::Error;

use crate::store::{RecordError, StoreError};

/// Errors raised by the repository and the view coordinator.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A query, listen or update call to the remote store failed.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(#[from] StoreError),

    /// A document could not be decoded into a product.
    #[error("Malformed record {document_id}: {source}")]
    MalformedRecord {
        document_id: DocumentId,
        #[source]
        source: RecordError,
    },

    /// One image object's URL could not be resolved.
    #[error("Failed to resolve image {path}: {source}")]
    ImageResolution {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// Result type alias for `CatalogError`.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::from(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "Remote store unavailable: Store unavailable: timeout"
        );

        let err = CatalogError::MalformedRecord {
            document_id: DocumentId::new("d9"),
            source: RecordError::MissingProductId,
        };
        assert_eq!(err.to_string(), "Malformed record d9: missing productID");

        let err = CatalogError::ImageResolution {
            path: "images/sku/a.jpg".to_string(),
            source: StoreError::NotFound("images/sku/a.jpg".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to resolve image images/sku/a.jpg: Not found: images/sku/a.jpg"
        );
    }
}
