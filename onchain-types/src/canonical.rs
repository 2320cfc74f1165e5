//! Canonical JSON normalization used by the audit recorder (C9) to make
//! hashing order-independent and float-precision-stable (spec.md §4.9,
//! P5/P6/P7).

use serde_json::{Map, Number, Value};

use crate::amounts::round8;

/// Recursively normalizes a JSON value: object keys sort lexicographically
/// (guaranteed already by `serde_json::Map`'s default `BTreeMap` backing,
/// reasserted here so the function holds even if the caller built the value
/// with the `preserve_order` feature enabled elsewhere in the dependency
/// graph), and floats are rounded to 8 decimals and rendered as strings so
/// that two floats within the rounding floor hash identically (P7) while
/// JSON's own float formatting never introduces instability.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(n) => canonicalize_number(n),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut sorted: Map<String, Value> = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

fn canonicalize_number(n: &Number) -> Value {
    if let Some(f) = n.as_f64() {
        if n.is_f64() {
            return Value::String(format!("{:.8}", round8(f)));
        }
    }
    Value::Number(n.clone())
}

/// Serializes an already-canonicalized value to the exact bytes that get
/// hashed: no insignificant whitespace, keys in sorted order.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&canonicalize(value)).expect("canonical value always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_bytes() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[test]
    fn float_precision_floor_is_stable() {
        let a = json!({"x": 1.0});
        let b = json!({"x": 1.0 + 1e-9});
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[test]
    fn float_precision_above_floor_changes_hash() {
        let a = json!({"x": 1.0});
        let b = json!({"x": 1.0 + 1e-7});
        assert_ne!(canonical_bytes(&a), canonical_bytes(&b));
    }
}
