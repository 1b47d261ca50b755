//! `boutique tags` - print the tag universe.

use boutique_catalog::CatalogState;

use super::{CliError, load};

/// Fetch every product and print the derived tags, `All` first.
///
/// # Errors
///
/// Returns `CliError::Sync` if the product fetch failed.
#[allow(clippy::print_stdout)]
pub async fn run(state: &CatalogState) -> Result<(), CliError> {
    let current = load(state).await?;

    for tag in &current.tags {
        println!("{tag}");
    }
    Ok(())
}
