//! Typed records for the managed Splunk ES objects.
//!
//! Each model owns its translation to and from the raw API JSON, so the
//! reconcile logic only ever sees typed values. The API is loosely typed in
//! places (numbers as strings, null placeholders inside lists), which the
//! helpers below absorb.

pub mod execution;
pub mod finding;
pub mod investigation;
pub mod investigation_type;
pub mod note;
pub mod plan;

use serde_json::Value;

/// Non-empty string at `key`; numbers are stringified so enum codes that
/// arrive as JSON numbers still translate.
pub(crate) fn field_string(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String at `key`, defaulting to empty when absent or null.
pub(crate) fn field_string_or_empty(obj: &Value, key: &str) -> String {
    field_string(obj, key).unwrap_or_default()
}

/// Bool at `key`.
pub(crate) fn field_bool(obj: &Value, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

/// Integer at `key`, truncating floats and numeric strings like `"50.0"`.
pub(crate) fn field_int_lossy(obj: &Value, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        Value::String(s) => s.parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Array at `key`, with null placeholders filtered out.
pub(crate) fn field_items<'a>(obj: &'a Value, key: &str) -> Vec<&'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(|v| v.is_object()).collect())
        .unwrap_or_default()
}
