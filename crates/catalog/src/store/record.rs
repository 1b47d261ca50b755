//! Product document decoding.
//!
//! Only `productID` is required. Every other field falls back to its default
//! when it is absent, null or of the wrong type, so one bad attribute never
//! drops a product from the catalog.

use boutique_core::{DEFAULT_MAX_QUANTITY, Product, ProductAttributes, ProductKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use super::ProductDocument;

/// Why a document could not be turned into a product.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The required external id field is absent, empty or not a string.
    #[error("missing productID")]
    MissingProductId,

    /// The document body is not a field map.
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Field layout of a product document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductFields {
    #[serde(rename = "productID", default, deserialize_with = "lenient")]
    product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: String,
    #[serde(default, deserialize_with = "lenient")]
    description: String,
    #[serde(default, deserialize_with = "lenient")]
    price: String,
    #[serde(default, deserialize_with = "lenient_integer")]
    votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    colors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    sizes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    max_quantity: Option<i64>,
}

/// Decode `T`, falling back to `T::default()` on null or a type mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode an integer that may arrive as an integer, a whole or fractional
/// double (truncated toward zero) or a numeric string.
#[allow(clippy::cast_possible_truncation)]
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Decode a string list, dropping non-string elements; anything that is not
/// a list decodes as empty.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Decode a document into a [`Product`] with no images.
///
/// # Errors
///
/// Returns [`RecordError::MissingProductId`] when `productID` is absent,
/// empty or not a string. Other fields never fail decoding.
pub fn decode_document(document: &ProductDocument) -> Result<Product, RecordError> {
    let fields: ProductFields =
        serde_json::from_value(Value::Object(document.fields.clone()))?;

    let product_id = fields
        .product_id
        .filter(|id| !id.is_empty())
        .ok_or(RecordError::MissingProductId)?;

    let max_quantity = fields
        .max_quantity
        .map_or(DEFAULT_MAX_QUANTITY, |q| u32::try_from(q.max(1)).unwrap_or(u32::MAX));

    Ok(Product::new(
        document.id.clone(),
        ProductKey::new(product_id),
        ProductAttributes {
            title: fields.title,
            description: fields.description,
            price: fields.price,
            votes: fields.votes.unwrap_or(0),
            tags: fields.tags,
            colors: fields.colors,
            sizes: fields.sizes,
            max_quantity,
        },
    ))
}
