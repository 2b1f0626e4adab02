//! Lenient readers for JSON values of uncertain shape.
//!
//! Records in the KV store were written by several generations of the admin
//! tools, and admin submissions arrive either as JSON or as form fields where
//! every value is a string. These helpers coerce what they can and return
//! `None` for everything else.

use serde_json::Value;

/// A string with non-whitespace content, returned untrimmed.
#[must_use]
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Any string value, or `fallback`.
#[must_use]
pub fn string_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => fallback.to_string(),
    }
}

/// A finite JSON number.
#[must_use]
pub fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// A finite number, also accepting numeric strings from form submissions.
#[must_use]
pub fn number_like(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        other => number(other),
    }
}

/// A whole number as `i64`, floored.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Saturating float-to-int cast is the intent
pub fn whole(value: Option<&Value>) -> Option<i64> {
    number(value).map(|n| n.floor() as i64)
}

/// Floors `value` and clamps it to zero or above.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to >= 0 first
pub fn clamp_non_negative(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.floor() as u64
}

/// A boolean, or `fallback` for non-bool values.
#[must_use]
pub fn bool_or(value: Option<&Value>, fallback: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(fallback)
}

/// A checkbox-style flag: JSON `true`, or the strings `on`, `true`, `1`.
#[must_use]
pub fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "on" | "true" | "1"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// Non-empty strings from a JSON array.
#[must_use]
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Lines of a textarea value, trimmed, blanks dropped.
#[must_use]
pub fn lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
