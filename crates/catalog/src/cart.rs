//! In-memory shopping cart.
//!
//! The cart lives for the lifetime of the process. All mutations go through
//! one `watch` channel, so they are applied one at a time and observers (cart
//! badges, totals) always see a complete line list.

use std::sync::Arc;

use boutique_core::{CartLine, CartLineId, Product, VariantSelection, cart_total};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// Summary handed to the checkout surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartQuote {
    pub item_count: u64,
    /// Sum of quantity x parsed display price. Approximate; see
    /// [`boutique_core::parse_display_price`].
    pub total: Decimal,
    pub lines: Vec<CartLine>,
}

/// The shopping cart.
///
/// Cheaply cloneable; clones share the same lines.
#[derive(Clone)]
pub struct CartStore {
    lines: Arc<watch::Sender<Vec<CartLine>>>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            lines: Arc::new(lines),
        }
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.lines.subscribe()
    }

    /// Add one unit of a product with the given variant selection.
    ///
    /// Increments the matching line if one exists, otherwise creates a line
    /// with quantity 1. Purchase limits are not enforced here.
    pub fn add(&self, product: &Product, color: Option<&str>, size: Option<&str>) -> CartLineId {
        self.add_quantity(product, VariantSelection::new(color, size), 1)
    }

    /// Add `quantity` units (at least one) of a product.
    pub fn add_quantity(
        &self,
        product: &Product,
        selection: VariantSelection,
        quantity: u32,
    ) -> CartLineId {
        let quantity = quantity.max(1);
        let id = CartLineId::new(product.id().clone(), selection);

        self.lines.send_modify(|lines| {
            if let Some(line) = lines.iter_mut().find(|line| line.id() == &id) {
                let _ = line.adjust(i64::from(quantity));
            } else {
                lines.push(CartLine::new(product.clone(), id.selection.clone(), quantity));
            }
        });

        debug!(line = %id, quantity, "Added to cart");
        id
    }

    /// Change a line's quantity by `delta`.
    ///
    /// Returns the new quantity. When the result would be zero or negative
    /// the line is removed and `None` is returned. Unknown lines are left
    /// alone and also yield `None`.
    pub fn adjust_quantity(&self, id: &CartLineId, delta: i64) -> Option<u32> {
        let mut outcome = None;

        self.lines.send_if_modified(|lines| {
            let Some(index) = lines.iter().position(|line| line.id() == id) else {
                return false;
            };
            match lines.get_mut(index).and_then(|line| line.adjust(delta)) {
                Some(quantity) => outcome = Some(quantity),
                None => {
                    lines.remove(index);
                }
            }
            true
        });

        match outcome {
            Some(quantity) => debug!(line = %id, quantity, "Adjusted cart line"),
            None => debug!(line = %id, "Cart line removed or missing"),
        }
        outcome
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&self, id: &CartLineId) -> bool {
        self.lines.send_if_modified(|lines| {
            let before = lines.len();
            lines.retain(|line| line.id() != id);
            lines.len() != before
        })
    }

    /// Remove every line.
    pub fn clear(&self) {
        self.lines.send_if_modified(|lines| {
            let had_lines = !lines.is_empty();
            lines.clear();
            had_lines
        });
    }

    /// Copy of the current lines, in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.borrow().clone()
    }

    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<CartLine> {
        self.lines.borrow().iter().find(|line| line.id() == id).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.lines
            .borrow()
            .iter()
            .map(|line| u64::from(line.quantity()))
            .sum()
    }

    /// Sum of quantity x parsed display price across all lines.
    ///
    /// Saturates at `Decimal::MAX` rather than overflowing.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        cart_total(self.lines.borrow().iter())
    }

    /// Item count, total and lines read from one consistent state.
    #[must_use]
    pub fn quote(&self) -> CartQuote {
        let lines = self.lines.borrow();
        CartQuote {
            item_count: lines.iter().map(|line| u64::from(line.quantity())).sum(),
            total: cart_total(lines.iter()),
            lines: lines.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{DocumentId, ProductAttributes, ProductKey};

    use super::*;

    fn product(id: &str, price: &str) -> Product {
        Product::new(
            DocumentId::new(id),
            ProductKey::new(format!("sku-{id}")),
            ProductAttributes {
                title: format!("Product {id}"),
                price: price.to_string(),
                ..ProductAttributes::default()
            },
        )
    }

    #[test]
    fn test_add_same_selection_increments() {
        let cart = CartStore::new();
        let p = product("1", "$10");

        let first = cart.add(&p, None, None);
        let second = cart.add(&p, None, None);

        assert_eq!(first, second);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&first).map(|l| l.quantity()), Some(2));
    }

    #[test]
    fn test_add_different_colors_are_distinct_lines() {
        let cart = CartStore::new();
        let p = product("1", "$10");

        cart.add(&p, Some("Red"), Some("M"));
        cart.add(&p, Some("Blue"), Some("M"));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_item_count(), 2);
    }

    #[test]
    fn test_adjust_quantity() {
        let cart = CartStore::new();
        let id = cart.add(&product("1", "$10"), None, Some("L"));

        assert_eq!(cart.adjust_quantity(&id, 4), Some(5));
        assert_eq!(cart.adjust_quantity(&id, -2), Some(3));
        assert_eq!(cart.total_item_count(), 3);
    }

    #[test]
    fn test_adjust_by_negative_quantity_removes_line() {
        let cart = CartStore::new();
        let id = cart.add(&product("1", "$10"), None, None);
        cart.adjust_quantity(&id, 2);

        assert_eq!(cart.adjust_quantity(&id, -3), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_adjust_far_below_zero_removes_line() {
        let cart = CartStore::new();
        let id = cart.add(&product("1", "$10"), None, None);

        assert_eq!(cart.adjust_quantity(&id, -6), None);
        assert!(cart.line(&id).is_none());
    }

    #[test]
    fn test_adjust_unknown_line_is_noop() {
        let cart = CartStore::new();
        cart.add(&product("1", "$10"), None, None);
        let unknown = CartLineId::new(DocumentId::new("9"), VariantSelection::default());

        assert_eq!(cart.adjust_quantity(&unknown, 1), None);
        assert_eq!(cart.total_item_count(), 1);
    }

    #[test]
    fn test_add_quantity_clamps_to_one() {
        let cart = CartStore::new();
        let id = cart.add_quantity(&product("1", "$10"), VariantSelection::default(), 0);
        assert_eq!(cart.line(&id).map(|l| l.quantity()), Some(1));
    }

    #[test]
    fn test_total_price() {
        let cart = CartStore::new();
        let id = cart.add(&product("1", "$25"), None, None);
        cart.adjust_quantity(&id, 2);
        cart.add(&product("2", "N/A"), None, None);

        assert_eq!(cart.total_price(), Decimal::new(7500, 2));
        assert_eq!(cart.total_item_count(), 4);
    }

    #[test]
    fn test_total_price_saturates_instead_of_panicking() {
        let cart = CartStore::new();
        let id = cart.add(&product("1", "$79228162514264337593543950335"), None, None);
        cart.adjust_quantity(&id, 1);
        cart.add(&product("2", "$1"), None, None);

        assert_eq!(cart.total_price(), Decimal::MAX);
        assert_eq!(cart.quote().total, Decimal::MAX);
        assert_eq!(cart.total_item_count(), 3);
    }

    #[test]
    fn test_line_keeps_product_copy() {
        let cart = CartStore::new();
        let mut p = product("1", "$10");
        let id = cart.add(&p, None, None);

        p.price = "$99".to_string();
        cart.add(&p, None, None);

        let line = cart.line(&id).unwrap();
        assert_eq!(line.product().price, "$10");
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let cart = CartStore::new();
        let a = cart.add(&product("1", "$1"), None, None);
        cart.add(&product("2", "$2"), None, None);

        assert!(cart.remove(&a));
        assert!(!cart.remove(&a));
        assert_eq!(cart.lines().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quote() {
        let cart = CartStore::new();
        cart.add(&product("1", "$1.50"), Some("Red"), None);
        cart.add(&product("1", "$1.50"), Some("Red"), None);

        let quote = cart.quote();
        assert_eq!(quote.item_count, 2);
        assert_eq!(quote.total, Decimal::new(300, 2));
        assert_eq!(quote.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let cart = CartStore::new();
        let mut rx = cart.subscribe();

        cart.add(&product("1", "$1"), None, None);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
