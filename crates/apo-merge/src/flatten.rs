//! Flatten step (§4.4 step 5): nested objects become `parent_child` keys.
//! Arrays are left exactly as arrays — only objects get joined.

use serde_json::{Map, Value};

pub(crate) fn flatten(value: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, v) in value {
        flatten_into(&mut out, &key, v);
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, key: &str, value: Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (child_key, child_value) in map {
                flatten_into(out, &format!("{key}_{child_key}"), child_value);
            }
        }
        other => {
            out.insert(key.to_string(), other);
        }
    }
}
