//! `boutique watch` - follow the catalog live.

use boutique_catalog::{CatalogState, SyncMode, ViewPhase};

use super::CliError;
use super::products::print_products;

/// Follow the remote collection, printing the visible products every time
/// the list is republished, until Ctrl+C.
///
/// # Errors
///
/// Returns `CliError::Signal` if the Ctrl+C handler cannot be installed.
#[allow(clippy::print_stdout)]
pub async fn run(state: &CatalogState, tag: Option<&str>) -> Result<(), CliError> {
    let view = state.view();
    if let Some(tag) = tag {
        view.filter_products(tag);
    }

    let mut updates = view.subscribe();
    let sync = view.start(SyncMode::Live).await;
    tracing::info!("Watching products (Ctrl+C to stop)");

    let mut printed_revision = 0;
    let mut printed_error: Option<String> = None;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                if current.phase != ViewPhase::Ready {
                    continue;
                }
                if current.revision > printed_revision {
                    printed_revision = current.revision;
                    println!("--- revision {} ({} products) ---", current.revision, current.visible.len());
                    print_products(&current.visible);
                }
                if current.error != printed_error {
                    if let Some(error) = &current.error {
                        tracing::warn!(%error, "Catalog error");
                    }
                    printed_error = current.error;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    sync.shutdown();
    Ok(())
}
