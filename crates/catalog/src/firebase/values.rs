//! Firestore REST value decoding.
//!
//! The REST API wraps every field in a typed envelope:
//!
//! ```json
//! { "title": { "stringValue": "Tote" }, "votes": { "integerValue": "12" } }
//! ```
//!
//! These helpers unwrap the envelopes into plain JSON so documents can be
//! decoded with ordinary `serde` derives.

use serde_json::{Map, Number, Value};

/// Decode a Firestore `fields` object into plain JSON.
#[must_use]
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Decode one typed Firestore value.
///
/// Unknown envelopes decode to `null`.
#[must_use]
pub fn decode_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = envelope.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "booleanValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            inner.clone()
        }
        // 64-bit integers are transported as strings
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map_or(Value::Null, Value::from),
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        "doubleValue" => match inner {
            Value::Number(_) => inner.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number),
            _ => Value::Null,
        },
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

/// Encode a signed integer the way the REST API expects it.
#[must_use]
pub fn integer_value(value: i64) -> Value {
    serde_json::json!({ "integerValue": value.to_string() })
}
