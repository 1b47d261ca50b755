//! `boutique vote` - add votes to a product.

use boutique_catalog::CatalogState;
use boutique_core::DocumentId;

use super::{CliError, load};

/// Add `delta` votes to the product stored under `document_id`.
///
/// # Errors
///
/// Returns an error if the sync fails, the document is not in the catalog,
/// or the remote increment fails.
#[allow(clippy::print_stdout)]
pub async fn run(state: &CatalogState, document_id: &str, delta: i64) -> Result<(), CliError> {
    let current = load(state).await?;

    let id = DocumentId::new(document_id);
    if !current.products.iter().any(|p| p.id() == &id) {
        return Err(CliError::UnknownDocument(document_id.to_owned()));
    }

    state.view().update_votes(&id, delta).await?;

    let votes = state
        .view()
        .state()
        .products
        .iter()
        .find(|p| p.id() == &id)
        .map(boutique_core::Product::votes);

    tracing::info!(%id, delta, ?votes, "Vote recorded");
    if let Some(votes) = votes {
        println!("{id}: {votes} votes");
    }
    Ok(())
}
