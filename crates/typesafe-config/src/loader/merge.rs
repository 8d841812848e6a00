//! Deep merge of raw mappings in precedence order.
//!
//! Objects merge key by key. Every other value, lists included, is replaced
//! wholesale by the later layer. When a mapping meets a non-mapping the later
//! value wins as well; the replacement is logged so a masked file section can
//! be traced.

use log::debug;
use serde_json::{Map, Value};

/// Merge overlay values into the base, recursively overriding objects.
pub fn merge_values(base: &mut Value, overlay: &Value) {
    merge_at(base, overlay, "");
}

/// Fold `merge_values` over the layers, lowest precedence first.
pub fn deep_merge_all<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        merge_values(&mut merged, layer);
    }
    merged
}

fn merge_at(base: &mut Value, overlay: &Value, path: &str) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_at(existing, value, &join_path(path, key)),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            if base_slot.is_object() != overlay_value.is_object() {
                debug!(
                    "merge replaced {} with {} at {}",
                    value_kind(base_slot),
                    value_kind(overlay_value),
                    if path.is_empty() { "root" } else { path }
                );
            }
            *base_slot = overlay_value.clone();
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Short name of a JSON value's type for diagnostics.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
