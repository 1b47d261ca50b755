//! Numeric values for display price strings.
//!
//! Product prices arrive from the remote store as display strings (e.g.
//! `"$25"`, `"$1,299.99"`). Totals are computed by stripping everything that
//! is not an ASCII digit or a decimal point and parsing the remainder.
//!
//! # Precision
//!
//! This is a display approximation, not authoritative pricing. It ignores
//! currency and is locale-sensitive: `"12,50 €"` parses as `1250`, and any
//! string with more than one `.` left after stripping is unparsable.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse the numeric value of a display price.
///
/// Unparsable input (including an empty string or `"N/A"`) yields zero.
#[must_use]
pub fn parse_display_price(display: &str) -> Decimal {
    let numeric: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    Decimal::from_str(&numeric).unwrap_or(Decimal::ZERO)
}
