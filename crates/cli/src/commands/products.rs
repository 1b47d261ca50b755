//! `boutique products` - list products.

use boutique_catalog::CatalogState;
use boutique_core::Product;

use super::{CliError, load};

/// Fetch every product and print those matching `tag`.
///
/// # Errors
///
/// Returns `CliError::Sync` if the product fetch failed.
pub async fn run(state: &CatalogState, tag: Option<&str>) -> Result<(), CliError> {
    load(state).await?;

    let view = state.view();
    if let Some(tag) = tag {
        view.filter_products(tag);
    }

    let current = view.state();
    tracing::info!(
        total = current.products.len(),
        visible = current.visible.len(),
        tag = %current.selected_tag,
        "Products loaded"
    );
    print_products(&current.visible);
    Ok(())
}

/// Print one line per product.
#[allow(clippy::print_stdout)]
pub fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("(no products)");
        return;
    }

    for product in products {
        println!(
            "{:<20} {:<32} {:>10}  votes: {:<5} images: {:<3} tags: {}",
            product.id(),
            product.title,
            product.price,
            product.votes(),
            product.image_urls().len(),
            product.tags.join(", ")
        );
    }
}
