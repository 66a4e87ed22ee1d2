//! Optional-field lookups over generic JSON values.

use serde_json::Value;

/// Resolve a JSON pointer against `value`, treating `null` as absent.
pub fn lookup<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    match value.pointer(pointer) {
        Some(Value::Null) | None => None,
        Some(found) => Some(found),
    }
}

/// Resolve a JSON pointer to a string slice.
///
/// Non-string values are absent.
pub fn lookup_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    lookup(value, pointer).and_then(Value::as_str)
}

/// Resolve a JSON pointer to a sender-supplied timestamp.
///
/// Upstream senders emit either a string or an epoch number. Blank strings
/// and any other JSON type are absent.
pub fn lookup_timestamp(value: &Value, pointer: &str) -> Option<String> {
    match lookup(value, pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
