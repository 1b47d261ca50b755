//! Tag universe derivation and tag filtering.

use std::collections::BTreeSet;

use super::product::Product;

/// Sentinel tag meaning "no filter". Always the first entry of a tag universe.
pub const ALL_TAG: &str = "All";

/// Whether `tag` is the no-filter sentinel.
#[must_use]
pub fn is_all_tag(tag: &str) -> bool {
    tag == ALL_TAG
}

/// Derive the tag universe for a product list.
///
/// Returns [`ALL_TAG`] followed by the union of every product's tags, sorted
/// lexicographically with duplicates removed. A product tagged with the
/// sentinel itself does not produce a second sentinel entry.
#[must_use]
pub fn derive_tags(products: &[Product]) -> Vec<String> {
    let unique: BTreeSet<&str> = products
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .filter(|t| !is_all_tag(t))
        .collect();

    std::iter::once(ALL_TAG.to_string())
        .chain(unique.into_iter().map(str::to_string))
        .collect()
}

/// Filter a product list by tag.
///
/// The sentinel returns the full list unchanged; any other tag keeps exactly
/// the products whose tags contain it, in their original order.
#[must_use]
pub fn filter_by_tag(products: &[Product], tag: &str) -> Vec<Product> {
    if is_all_tag(tag) {
        return products.to_vec();
    }

    products.iter().filter(|p| p.has_tag(tag)).cloned().collect()
}
