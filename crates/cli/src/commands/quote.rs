//! `boutique quote` - price a cart.
//!
//! Checkout itself is not implemented; this builds a cart from the fetched
//! catalog and prints what would be handed to checkout.

use std::str::FromStr;

use boutique_catalog::CatalogState;
use boutique_core::ProductKey;

use super::{CliError, load};

/// One `--item` argument: `productID[:color[:size]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub product_key: ProductKey,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl FromStr for ItemSpec {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let product_key = parts
            .next()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CliError::InvalidItem(s.to_owned()))?;

        let mut variant = || {
            parts
                .next()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let color = variant();
        let size = variant();

        Ok(Self {
            product_key: ProductKey::new(product_key),
            color,
            size,
        })
    }
}

/// Add every item to the cart and print the resulting quote.
///
/// # Errors
///
/// Returns an error if the sync fails, an item cannot be parsed, or an item
/// names a product that is not in the catalog.
#[allow(clippy::print_stdout)]
pub async fn run(state: &CatalogState, items: &[String]) -> Result<(), CliError> {
    let specs = items
        .iter()
        .map(|item| item.parse::<ItemSpec>())
        .collect::<Result<Vec<_>, _>>()?;

    let current = load(state).await?;
    let cart = state.cart();

    for spec in &specs {
        let product = current
            .products
            .iter()
            .find(|p| p.product_id() == &spec.product_key)
            .ok_or_else(|| CliError::UnknownProduct(spec.product_key.to_string()))?;
        cart.add(product, spec.color.as_deref(), spec.size.as_deref());
    }

    let quote = cart.quote();
    tracing::info!(items = quote.item_count, total = %quote.total, "Cart quoted");

    for line in &quote.lines {
        println!(
            "{:>3} x {:<40} {:>10}  = {}",
            line.quantity(),
            line.id().to_string(),
            line.product().price,
            line.line_total().round_dp(2)
        );
    }
    println!("Items: {}", quote.item_count);
    println!("Total: {}", quote.total.round_dp(2));
    Ok(())
}
