//! Cart line types.
//!
//! A cart line is identified by the product plus the shopper's variant
//! selection. "No color" and "no size" are valid selections of their own, so
//! a product added without a size is a different line from the same product
//! added with size "M".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::DocumentId;
use super::price::parse_display_price;
use super::product::Product;

/// The variant dimensions a shopper picked when adding a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantSelection {
    pub color: Option<String>,
    pub size: Option<String>,
}

impl VariantSelection {
    #[must_use]
    pub fn new(color: Option<&str>, size: Option<&str>) -> Self {
        Self {
            color: color.map(str::to_owned),
            size: size.map(str::to_owned),
        }
    }

    /// Human-readable label (e.g., "Red / M"); `None` when nothing is selected.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match (&self.color, &self.size) {
            (Some(color), Some(size)) => Some(format!("{color} / {size}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

/// Composite identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartLineId {
    pub product: DocumentId,
    pub selection: VariantSelection,
}

impl CartLineId {
    #[must_use]
    pub fn new(product: DocumentId, selection: VariantSelection) -> Self {
        Self { product, selection }
    }
}

impl std::fmt::Display for CartLineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.selection.label() {
            Some(label) => write!(f, "{} ({label})", self.product),
            None => write!(f, "{}", self.product),
        }
    }
}

/// A line in the shopping cart.
///
/// Holds a copy of the product taken when it was first added; later catalog
/// updates do not change it. Quantity is always at least one, so lines are
/// only built through [`CartLine::new`] (serialize-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    id: CartLineId,
    product: Product,
    quantity: u32,
}

impl CartLine {
    /// Create a line; a `quantity` of zero is raised to one.
    #[must_use]
    pub fn new(product: Product, selection: VariantSelection, quantity: u32) -> Self {
        Self {
            id: CartLineId::new(product.id().clone(), selection),
            product,
            quantity: quantity.max(1),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &CartLineId {
        &self.id
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn selection(&self) -> &VariantSelection {
        &self.id.selection
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Apply a signed change to the quantity.
    ///
    /// Returns the new quantity, or `None` when the result would be zero or
    /// negative; in that case the line is left untouched and the caller is
    /// expected to remove it.
    #[must_use = "a None result means the line must be removed"]
    pub fn adjust(&mut self, delta: i64) -> Option<u32> {
        let next = i64::from(self.quantity).saturating_add(delta);
        if next <= 0 {
            return None;
        }
        self.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        Some(self.quantity)
    }

    /// Unit price parsed from the product's display price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        parse_display_price(&self.product.price)
    }

    /// Quantity times unit price.
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing; the price is a
    /// display approximation and must never abort a total.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price().saturating_mul(Decimal::from(self.quantity))
    }
}

/// Sum of [`CartLine::line_total`] over `lines`, saturating at `Decimal::MAX`.
#[must_use]
pub fn cart_total<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> Decimal {
    lines
        .into_iter()
        .fold(Decimal::ZERO, |total, line| total.saturating_add(line.line_total()))
}
