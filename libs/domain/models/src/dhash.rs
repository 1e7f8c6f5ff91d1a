// [libs/domain/models/src/dhash.rs]
//! Deterministic content hash for tracker configuration values.
//!
//! A tracker is identified by the hash of its static configuration, not by
//! an opaque incrementing id: two ingest requests carrying the same
//! configuration in a different key or list order must resolve to the same
//! tracker. The hash is computed bottom-up — every list and object hashes
//! its *children's hashes* rather than its raw JSON text, which is what
//! makes the result order-independent at every nesting level.

use serde_json::Value;
use sha2::{Digest, Sha256};

fn hex_sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Stringifies a JSON scalar the way it would be keyed for hashing.
/// Nulls, booleans and numbers each get a stable textual form so that
/// `1` and `"1"` do not collide.
fn scalar_repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => unreachable!("handled by caller"),
    }
}

/// Computes the recursive content hash of a JSON value.
///
/// - Arrays hash the sorted list of their elements' hashes, so element
///   order never affects the result.
/// - Objects hash the sorted list of `(key, value_hash)` pairs, so key
///   insertion order never affects the result.
/// - Everything else (strings, numbers, bools, null) hashes its scalar
///   representation directly.
pub fn config_dhash(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let mut child_hashes: Vec<String> = items.iter().map(config_dhash).collect();
            child_hashes.sort();
            hex_sha256(&format!("{child_hashes:?}"))
        }
        Value::Object(map) => {
            let mut pairs: Vec<(String, String)> = map
                .iter()
                .map(|(k, v)| (k.clone(), config_dhash(v)))
                .collect();
            pairs.sort();
            hex_sha256(&format!("{pairs:?}"))
        }
        scalar => hex_sha256(&scalar_repr(scalar)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_objects_hash_equal() {
        let a = json!({"type": "demofam", "host": "1.2.3.4", "port": 443});
        let b = json!({"port": 443, "host": "1.2.3.4", "type": "demofam"});
        assert_eq!(config_dhash(&a), config_dhash(&b));
    }

    #[test]
    fn list_order_does_not_affect_hash() {
        let a = json!({"hosts": ["a.example", "b.example", "c.example"]});
        let b = json!({"hosts": ["c.example", "a.example", "b.example"]});
        assert_eq!(config_dhash(&a), config_dhash(&b));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"type": "demofam", "port": 443});
        let b = json!({"type": "demofam", "port": 444});
        assert_ne!(config_dhash(&a), config_dhash(&b));
    }

    #[test]
    fn nested_structures_are_order_independent_at_every_level() {
        let a = json!({
            "type": "demofam",
            "cnc": [{"host": "a", "port": 1}, {"host": "b", "port": 2}]
        });
        let b = json!({
            "cnc": [{"port": 2, "host": "b"}, {"port": 1, "host": "a"}],
            "type": "demofam"
        });
        assert_eq!(config_dhash(&a), config_dhash(&b));
    }
}
