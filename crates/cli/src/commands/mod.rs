//! Command implementations.
//!
//! Each command receives the shared [`CatalogState`] built in `main` and
//! reports results on stdout. Diagnostics go through `tracing`.

pub mod products;
pub mod quote;
pub mod tags;
pub mod vote;
pub mod watch;

use boutique_catalog::{CatalogError, CatalogState, ConfigError, SyncMode, ViewState};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The initial product sync failed.
    #[error("Product sync failed: {0}")]
    Sync(String),

    /// A `--item` argument could not be parsed.
    #[error("Invalid item '{0}': expected productID[:color[:size]]")]
    InvalidItem(String),

    /// No loaded product has this product key.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// No loaded product has this document id.
    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    /// Waiting for a shutdown signal failed.
    #[error("Signal handling error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Run a one-shot sync and return the resulting view state.
///
/// # Errors
///
/// Returns `CliError::Sync` if the product fetch failed.
pub async fn load(state: &CatalogState) -> Result<ViewState, CliError> {
    let view = state.view();
    let sync = view.start(SyncMode::Once).await;
    sync.shutdown();

    let current = view.state();
    match current.error {
        Some(error) => Err(CliError::Sync(error)),
        None => Ok(current),
    }
}
