//! Property tests for the sanitization pipeline

use proptest::prelude::*;
use sanitize::{
    bound_array, filter_cookies, filter_storage, is_sensitive_str, truncate_strings,
    bounder::serialized_size, SensitiveDataMode, DEPTH_EXCEEDED_MARKER, REDACTED_MARKER,
};
use serde_json::{json, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,40}".prop_map(Value::String),
    ];
    leaf.prop_recursive(6, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn max_string_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.iter().map(max_string_len).max().unwrap_or(0),
        Value::Object(map) => map.values().map(max_string_len).max().unwrap_or(0),
        _ => 0,
    }
}

proptest! {
    #[test]
    fn short_strings_are_never_sensitive(s in ".{0,7}") {
        prop_assert!(!is_sensitive_str(&s));
    }

    #[test]
    fn uuids_are_always_sensitive(
        a in "[0-9a-f]{8}", b in "[0-9a-f]{4}", c in "[0-9a-f]{4}",
        d in "[0-9a-f]{4}", e in "[0-9a-f]{12}",
    ) {
        let uuid = format!("{a}-{b}-{c}-{d}-{e}");
        prop_assert!(is_sensitive_str(&uuid));
    }

    #[test]
    fn jwt_shapes_are_always_sensitive(
        header in "[A-Za-z0-9_-]{4,30}",
        body in "[A-Za-z0-9_-]{1,60}",
        sig in "[A-Za-z0-9_-]{0,40}",
    ) {
        let token = format!("eyJ{header}.{body}.{sig}");
        prop_assert!(is_sensitive_str(&token));
    }

    #[test]
    fn truncation_bounds_every_string(value in arb_json(), max_len in 1usize..20) {
        let out = truncate_strings(&value, max_len);
        // the marker itself adds a fixed suffix
        prop_assert!(max_string_len(&out) <= max_len + "... (truncated)".len());
    }

    #[test]
    fn bound_array_respects_budget(
        items in prop::collection::vec(arb_json(), 0..30),
        budget in 0usize..2_000,
    ) {
        let out = bound_array(&items, budget, |v| v.clone());

        let total: usize = out.iter().map(serialized_size).sum();
        prop_assert!(total <= budget);
        prop_assert_eq!(&items[..out.len()], &out[..]);
    }

    #[test]
    fn hide_all_redacts_every_storage_value(
        map in prop::collection::btree_map("[a-zA-Z]{1,10}", ".{0,20}", 0..10),
    ) {
        let storage = Value::Object(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
        let out = filter_storage(&storage, SensitiveDataMode::HideAll);

        let Value::Object(out) = out else { panic!("expected object") };
        prop_assert!(out.values().all(|v| v == &json!(REDACTED_MARKER)));
    }

    #[test]
    fn show_all_is_identity_for_cookies(
        names in prop::collection::vec("[a-z]{1,8}", 0..6),
        value in ".{0,30}",
    ) {
        let cookies = Value::Array(
            names.iter().map(|n| json!({ "name": n, "value": value })).collect(),
        );
        prop_assert_eq!(filter_cookies(&cookies, SensitiveDataMode::ShowAll), cookies);
    }
}

#[test]
fn very_deep_nesting_terminates() {
    let mut value = json!("leaf");
    for _ in 0..1_000 {
        value = json!({ "child": value });
    }

    let out = truncate_strings(&value, 10);

    let mut cursor = &out;
    while let Some(child) = cursor.get("child") {
        cursor = child;
    }
    assert_eq!(cursor, &json!(DEPTH_EXCEEDED_MARKER));
}
