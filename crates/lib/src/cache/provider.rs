//! Deep-merge updates for provider configuration.

use serde_json::{Map, Value};

/// Merge `patch` into `target`.
///
/// Objects merge key by key; any other value replaces what was there.
pub fn merge_json(target: &mut Value, patch: Value) {
  match (target, patch) {
    (Value::Object(existing), Value::Object(incoming)) => {
      for (key, value) in incoming {
        merge_json(existing.entry(key).or_insert(Value::Null), value);
      }
    }
    (slot, value) => *slot = value,
  }
}

/// Merge `value` into `target` at the nested `key_path`, creating objects as needed.
pub fn merge_at_path(target: &mut Value, key_path: &[&str], value: Value) {
  let patch = key_path.iter().rev().fold(value, |inner, key| {
    let mut map = Map::new();
    map.insert((*key).to_string(), inner);
    Value::Object(map)
  });
  merge_json(target, patch);
}
