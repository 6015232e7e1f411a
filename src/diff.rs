//! Schema-free structural diffing over JSON-like prop values.
//!
//! Snapshots are always freshly constructed by the stream decoder, so
//! reference comparison is meaningless; every comparison here is deep.

use std::collections::BTreeSet;

use serde_json::Value;

/// Top-level field names whose values differ between two prop snapshots.
/// Both sides are treated as objects; non-object values compare under a
/// single synthetic field so scalar props still produce a usable diff.
pub fn changed_fields(committed: &Value, snapshot: &Value) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    match (committed.as_object(), snapshot.as_object()) {
        (Some(old), Some(new)) => {
            for key in old.keys().chain(new.keys()) {
                if changed.contains(key.as_str()) {
                    continue;
                }
                let before = old.get(key).unwrap_or(&Value::Null);
                let after = new.get(key).unwrap_or(&Value::Null);
                if before != after {
                    changed.insert(key.clone());
                }
            }
        }
        _ => {
            if committed != snapshot {
                changed.insert("value".to_string());
            }
        }
    }
    changed
}

/// Whether a committed field value should render as a skeleton placeholder:
/// absent, null, empty string, empty array or empty object.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
