//! Deep copy and deep freeze.
//!
//! Records shared between tests are frozen so accidental writes fail instead
//! of leaking into the next test; anything handed out is a deep copy.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::value::{Array, FieldValue, Object, Value};

/// Duplicate a value so that no two owners share mutable sub-structure.
pub trait DeepCopy: Sized {
    fn deep_copy(&self) -> Self;
}

/// Recursively mark a value immutable in place.
pub trait Freeze {
    fn freeze(&mut self);
    fn is_frozen(&self) -> bool;
}

pub fn deep_copy<T: DeepCopy>(value: &T) -> T {
    value.deep_copy()
}

/// Freeze `value` and everything nested in it, then hand it back.
/// Freezing a frozen value is a no-op.
pub fn deep_freeze<T: Freeze>(mut value: T) -> T {
    value.freeze();
    value
}

impl DeepCopy for Value {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

impl DeepCopy for Array {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

impl DeepCopy for Object {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

impl<T: DeepCopy> DeepCopy for Vec<T> {
    fn deep_copy(&self) -> Self {
        self.iter().map(DeepCopy::deep_copy).collect()
    }
}

impl<K: Clone + Ord, V: DeepCopy> DeepCopy for BTreeMap<K, V> {
    fn deep_copy(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect()
    }
}

impl<K: Clone + Eq + Hash, V: DeepCopy> DeepCopy for HashMap<K, V> {
    fn deep_copy(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect()
    }
}

impl Freeze for Value {
    fn freeze(&mut self) {
        match self {
            Value::Array(a) => a.freeze(),
            Value::Object(o) => o.freeze(),
            // scalars are immutable already
            _ => {}
        }
    }

    fn is_frozen(&self) -> bool {
        match self {
            Value::Array(a) => a.is_frozen(),
            Value::Object(o) => o.is_frozen(),
            _ => true,
        }
    }
}

impl Freeze for Array {
    fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        for item in self.items.iter_mut() {
            item.freeze();
        }
        self.frozen = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Freeze for Object {
    fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        for field in self.fields.values_mut() {
            if let FieldValue::Present(v) = field {
                v.freeze();
            }
        }
        self.frozen = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl<T: Freeze> Freeze for Vec<T> {
    fn freeze(&mut self) {
        for item in self.iter_mut() {
            item.freeze();
        }
    }

    fn is_frozen(&self) -> bool {
        self.iter().all(Freeze::is_frozen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use serde_json::json;

    fn nested() -> Value {
        Value::from(json!({
            "name": {"singular": "apple", "plural": "apples"},
            "conversions": [{"unit_id": 1, "ratio": 0.5}]
        }))
    }

    #[test]
    fn deep_copy_shares_nothing() {
        let original = nested();
        let mut copy = deep_copy(&original);
        copy.as_object_mut()
            .unwrap()
            .get_mut("name")
            .unwrap()
            .and_then(Value::as_object_mut)
            .unwrap()
            .insert("singular", "pear")
            .unwrap();

        assert_eq!(
            original.to_json()["name"]["singular"],
            json!("apple")
        );
        assert_eq!(copy.to_json()["name"]["singular"], json!("pear"));
    }

    #[test]
    fn deep_freeze_reaches_every_level() {
        let mut frozen = deep_freeze(nested());
        assert!(frozen.is_frozen());

        let root = frozen.as_object_mut().unwrap();
        assert!(matches!(root.insert("x", 1i64), Err(StoreError::Frozen)));

        let name = root.get("name").and_then(Value::as_object).unwrap();
        assert!(name.is_frozen());

        let conversion = root
            .get("conversions")
            .and_then(Value::as_array)
            .and_then(|a| a.get(0))
            .and_then(Value::as_object)
            .unwrap();
        assert!(conversion.is_frozen());
    }

    #[test]
    fn deep_freeze_is_idempotent() {
        let mut value = deep_freeze(nested());
        value.freeze();
        let value = deep_freeze(value);
        assert!(value.is_frozen());
        assert_eq!(value, nested());
    }

    #[test]
    fn copy_of_frozen_value_is_mutable() {
        let frozen = deep_freeze(nested());
        let mut copy = deep_copy(&frozen);
        assert!(!copy.is_frozen());
        assert!(copy.as_object_mut().unwrap().insert("x", 1i64).is_ok());
    }

    #[test]
    fn scalars_count_as_frozen() {
        assert!(Value::from("atom").is_frozen());
        assert!(Value::Null.is_frozen());
    }
}
