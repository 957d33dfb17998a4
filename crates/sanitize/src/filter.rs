//! Cookie and storage redaction
//!
//! Both filters are total: input of the wrong shape yields an empty result
//! instead of an error.

use serde_json::{Map, Value};

use crate::classifier::{is_sensitive_key, is_sensitive_value};
use crate::types::{Cookie, SensitiveDataMode, REDACTED_MARKER};

/// Should the value behind `key` be replaced under `mode`?
pub fn should_redact(key: &str, value: &Value, mode: SensitiveDataMode) -> bool {
    match mode {
        SensitiveDataMode::HideAll => true,
        SensitiveDataMode::HideSensitive => is_sensitive_key(key) || is_sensitive_value(value),
        SensitiveDataMode::ShowAll => false,
    }
}

/// Redact cookie values according to `mode`.
///
/// `cookies` is expected to be an array of `{name, value, ...}` objects.
/// Anything else produces an empty array; individual entries that are not
/// cookies are skipped.
pub fn filter_cookies(cookies: &Value, mode: SensitiveDataMode) -> Value {
    let Value::Array(items) = cookies else {
        tracing::debug!("Cookie payload is not an array, returning empty list");
        return Value::Array(Vec::new());
    };

    let filtered = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Cookie>(item.clone()) {
            Ok(cookie) => Some(filter_cookie(cookie, mode)),
            Err(e) => {
                tracing::debug!("Skipping malformed cookie entry: {}", e);
                None
            }
        })
        .filter_map(|cookie| serde_json::to_value(cookie).ok())
        .collect();

    Value::Array(filtered)
}

/// Typed single-cookie form of [`filter_cookies`]
pub fn filter_cookie(mut cookie: Cookie, mode: SensitiveDataMode) -> Cookie {
    let value = Value::String(cookie.value.clone());
    if should_redact(&cookie.name, &value, mode) {
        cookie.value = REDACTED_MARKER.to_string();
    }
    cookie
}

/// Redact storage values according to `mode`.
///
/// `storage` is expected to be a key/value object (localStorage or
/// sessionStorage dump). Anything else produces an empty object.
pub fn filter_storage(storage: &Value, mode: SensitiveDataMode) -> Value {
    let Value::Object(map) = storage else {
        tracing::debug!("Storage payload is not an object, returning empty map");
        return Value::Object(Map::new());
    };

    let filtered = map
        .iter()
        .map(|(key, value)| {
            let value = if should_redact(key, value, mode) {
                Value::String(REDACTED_MARKER.to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect();

    Value::Object(filtered)
}
