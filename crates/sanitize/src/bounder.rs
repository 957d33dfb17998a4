//! Payload bounding
//!
//! Two independent limits:
//! - per-field: every string is cut to `max_len` characters ([`truncate_strings`])
//! - per-batch: arrays stop accumulating once the serialized total would
//!   exceed a byte budget ([`bound_array`])
//!
//! Nothing in here returns an error to the caller. The worst case is a
//! marker string where the data used to be.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{DEPTH_EXCEEDED_MARKER, ERROR_MARKER, MAX_DEPTH, TRUNCATION_MARKER};

/// Cut `text` to `max_len` characters, appending the truncation marker.
///
/// Counts chars, not bytes, so multi-byte text is never split mid-codepoint.
pub fn truncate_str(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Recursively truncate every string in `data` to `max_len` characters.
pub fn truncate_strings(data: &Value, max_len: usize) -> Value {
    transform_strings(data, |s| Ok(Value::String(truncate_str(s, max_len))))
}

/// Same walk as [`truncate_strings`] with a caller-supplied string transform.
///
/// A transform error only costs the field it happened in: that value becomes
/// [`ERROR_MARKER`] and the siblings are still processed.
pub fn transform_strings<F>(data: &Value, transform: F) -> Value
where
    F: Fn(&str) -> Result<Value>,
{
    walk(data, 0, &transform)
}

fn walk<F>(data: &Value, depth: usize, transform: &F) -> Value
where
    F: Fn(&str) -> Result<Value>,
{
    if depth > MAX_DEPTH {
        return Value::String(DEPTH_EXCEEDED_MARKER.to_string());
    }

    match data {
        Value::String(s) => transform(s).unwrap_or_else(|e| {
            tracing::debug!("String transform failed: {}", e);
            Value::String(ERROR_MARKER.to_string())
        }),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| walk(item, depth + 1, transform))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), walk(value, depth + 1, transform));
            }
            Value::Object(out)
        }
        scalar => scalar.clone(),
    }
}

/// Serialized JSON size in bytes
pub fn serialized_size(value: &Value) -> usize {
    serde_json::to_vec(value).map_or(usize::MAX, |bytes| bytes.len())
}

/// Transform each item and keep them while the running serialized size
/// stays within `max_total`.
///
/// The first item that would overflow the budget ends the batch. Items after
/// it are dropped, not truncated, so the result is always a prefix.
pub fn bound_array<F>(items: &[Value], max_total: usize, per_item: F) -> Vec<Value>
where
    F: Fn(&Value) -> Value,
{
    let mut total = 0usize;
    let mut out = Vec::new();

    for item in items {
        let bounded = per_item(item);
        let size = serialized_size(&bounded);
        match total.checked_add(size) {
            Some(next) if next <= max_total => {
                total = next;
                out.push(bounded);
            }
            _ => {
                tracing::debug!(
                    "Batch budget of {} bytes reached, dropping {} of {} items",
                    max_total,
                    items.len() - out.len(),
                    items.len()
                );
                break;
            }
        }
    }

    out
}

fn parse_structured(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Bound a text field that may or may not hold JSON.
///
/// - not JSON: the whole text is truncated as one string
/// - a JSON array: items are truncated, then batch-bounded by `max_total`
/// - any other JSON: truncated in place
///
/// The result is re-serialized. If that fails, fall back to a hard cut.
pub fn process_structured_text(text: &str, max_len: usize, max_total: usize) -> String {
    let parsed = match parse_structured(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!("Treating field as plain text: {}", e);
            return truncate_str(text, max_len);
        }
    };

    let bounded = match parsed {
        Value::Array(items) => Value::Array(bound_array(&items, max_total, |item| {
            truncate_strings(item, max_len)
        })),
        other => truncate_strings(&other, max_len),
    };

    serde_json::to_string(&bounded).unwrap_or_else(|e| {
        tracing::warn!("Re-serializing bounded text failed, hard cut instead: {}", e);
        text.chars().take(max_len).collect()
    })
}
