//! Catalog product record.

use serde::{Deserialize, Serialize};

use super::id::{DocumentId, ProductKey};

/// Purchase limit used when a record does not carry one.
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

/// Mutable descriptive attributes of a product.
///
/// Used to construct a [`Product`]; identity is supplied separately so it
/// can never be changed through this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub title: String,
    pub description: String,
    /// Display price (e.g., "$25.00"). See [`crate::parse_display_price`].
    pub price: String,
    pub votes: i64,
    /// Category labels used for filtering.
    pub tags: Vec<String>,
    /// Color labels a shopper can pick from; may be empty.
    pub colors: Vec<String>,
    /// Size labels a shopper can pick from; may be empty.
    pub sizes: Vec<String>,
    pub max_quantity: u32,
}

impl Default for ProductAttributes {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: String::new(),
            votes: 0,
            tags: Vec::new(),
            colors: Vec::new(),
            sizes: Vec::new(),
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}

/// A product as displayed to shoppers.
///
/// `id` and `product_id` are fixed at construction. `votes` changes only
/// through [`Product::apply_vote_delta`] or by replacing the product with a
/// fresh remote read; image URLs change only by wholesale replacement.
/// Serialize-only: products are built through [`Product::new`], which holds
/// the `max_quantity >= 1` invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: DocumentId,
    product_id: ProductKey,
    pub title: String,
    pub description: String,
    pub price: String,
    votes: i64,
    pub tags: Vec<String>,
    image_urls: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    max_quantity: u32,
}

impl Product {
    /// Create a product with no images.
    ///
    /// A `max_quantity` of zero is raised to one.
    #[must_use]
    pub fn new(id: DocumentId, product_id: ProductKey, attributes: ProductAttributes) -> Self {
        Self {
            id,
            product_id,
            title: attributes.title,
            description: attributes.description,
            price: attributes.price,
            votes: attributes.votes,
            tags: attributes.tags,
            image_urls: Vec::new(),
            colors: attributes.colors,
            sizes: attributes.sizes,
            max_quantity: attributes.max_quantity.max(1),
        }
    }

    /// Store document id.
    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Stable external id, also used as the image folder key.
    #[must_use]
    pub const fn product_id(&self) -> &ProductKey {
        &self.product_id
    }

    #[must_use]
    pub const fn votes(&self) -> i64 {
        self.votes
    }

    #[must_use]
    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    /// Maximum quantity a shopper may purchase (always at least one).
    #[must_use]
    pub const fn max_quantity(&self) -> u32 {
        self.max_quantity
    }

    /// Whether this product carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Apply a confirmed vote increment to the local copy.
    pub const fn apply_vote_delta(&mut self, delta: i64) {
        self.votes = self.votes.saturating_add(delta);
    }

    /// Replace the image list wholesale.
    pub fn replace_image_urls(&mut self, urls: Vec<String>) {
        self.image_urls = urls;
    }

    /// Builder-style variant of [`Product::replace_image_urls`].
    #[must_use]
    pub fn with_image_urls(mut self, urls: Vec<String>) -> Self {
        self.image_urls = urls;
        self
    }
}
