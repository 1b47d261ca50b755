//! Core types for Boutique.
//!
//! This module provides type-safe wrappers for the catalog and cart domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod tags;

pub use cart::{CartLine, CartLineId, VariantSelection, cart_total};
pub use id::*;
pub use price::parse_display_price;
pub use product::{DEFAULT_MAX_QUANTITY, Product, ProductAttributes};
pub use tags::{ALL_TAG, derive_tags, filter_by_tag, is_all_tag};
