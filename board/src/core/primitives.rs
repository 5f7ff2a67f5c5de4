//! Predicates for the scalar values a board document may contain.

use serde_json::Value;

/// True if `value` is a bare six-digit hex color such as `aaff00`.
///
/// A leading `#` is rejected: documents store colors as `RRGGBB`.
pub fn is_valid_hexcolor(value: &str) -> bool {
    use std::sync::LazyLock;
    static HEX_COLOR_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^[0-9a-fA-F]{6}$").unwrap());
    HEX_COLOR_RE.is_match(value)
}

/// Returns the value as a strictly positive `u32`, or `None`.
///
/// Booleans and floats are not integers here, even when they would
/// convert cleanly.
pub fn positive_int(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

/// Returns the value as a `u32` that may be zero, or `None`.
pub fn non_negative_int(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}
