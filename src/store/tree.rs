//! JSON tree helpers
//!
//! The real-time store is one JSON tree addressed by `/`-separated paths.
//! Writing `null` removes a node; objects left empty are removed as well.

use serde_json::{Map, Value};

use super::error::StoreFailure;

/// Characters a key may not contain
const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Split a path into its non-empty segments (`"products/"` -> `["products"]`)
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalized `collection/key` path
pub fn child_path(path: &str, key: &str) -> String {
    let mut parts = segments(path);
    parts.push(key);
    parts.join("/")
}

/// Reject keys the store cannot address
pub fn validate_key(key: &str) -> Result<(), StoreFailure> {
    if key.is_empty() {
        return Err(StoreFailure::invalid_path("key must not be empty"));
    }
    if let Some(c) = key.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control()) {
        return Err(StoreFailure::invalid_path(format!(
            "key {:?} contains forbidden character {:?}",
            key, c
        )));
    }
    Ok(())
}

/// Node at `path`, if present
pub fn get<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = node.as_object()?.get(*segment)?;
    }
    if is_vacant(node) {
        None
    } else {
        Some(node)
    }
}

/// Children of the node at `path` as a collection (empty when absent)
pub fn collection(root: &Value, path: &[&str]) -> Map<String, Value> {
    get(root, path)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Overwrite the node at `path`. Writing `null` removes it.
pub fn put(root: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = prune(value);
        return;
    };

    if !root.is_object() {
        if value.is_null() {
            return;
        }
        *root = Value::Object(Map::new());
    }

    if let Value::Object(map) = root {
        let child = map.entry((*head).to_string()).or_insert(Value::Null);
        put(child, rest, value);
        if is_vacant(child) {
            map.remove(*head);
        }
    }
}

/// Merge `fields` into the node at `path`, leaving other children untouched.
///
/// Field names may themselves be relative paths (`"a/b"`).
pub fn patch(root: &mut Value, path: &[&str], fields: Map<String, Value>) {
    for (field, value) in fields {
        let mut target: Vec<&str> = path.to_vec();
        target.extend(segments(&field));
        put(root, &target, value);
    }
}

/// Drop nulls and empty objects, recursively
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
