//! Path operations on a JSON value tree
//!
//! The hosted database has no empty containers and no nulls: writing `null`
//! deletes, and a parent left without children disappears with it.

use serde_json::{Map, Value};

/// Split a slash-separated path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Value stored under `segs`, `None` when absent
pub fn get_at<'a>(root: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for seg in segs {
        current = match current {
            Value::Object(map) => map.get(*seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Replace the value under `segs`, pruning empty parents
pub fn put_at(root: &mut Value, segs: &[&str], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *root = prune(value);
        return;
    };

    if let Value::Array(items) = root {
        let map: Map<String, Value> = items
            .drain(..)
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect();
        *root = Value::Object(map);
    }
    if !root.is_object() {
        if value.is_null() {
            return;
        }
        *root = Value::Object(Map::new());
    }

    let now_empty = match root {
        Value::Object(map) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            put_at(child, rest, value);
            if child.is_null() {
                map.remove(*head);
            }
            map.is_empty()
        }
        _ => false,
    };
    if now_empty {
        *root = Value::Null;
    }
}

/// Drop nulls and empty containers the way the database does on write
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => {
            if items.iter().all(Value::is_null) {
                Value::Null
            } else {
                Value::Array(items.into_iter().map(prune).collect())
            }
        }
        other => other,
    }
}
