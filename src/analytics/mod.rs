//! Aggregation of the events and analytics stores into dashboard figures.

pub mod gold;
pub mod objections;
pub mod scores;
pub mod service;
pub mod stages;

use serde_json::Value;

/// JSON `true` or the string `"true"`.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Numeric value of a JSON field; missing or non-numeric fields are 0.
pub(crate) fn number(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
