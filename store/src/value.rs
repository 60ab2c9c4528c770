//! Dynamic payload values held by records.
//!
//! Payloads have no fixed schema, so records carry an open [`Object`] of
//! named fields. Containers track whether they have been frozen; every
//! mutating method on a frozen container fails with [`StoreError::Frozen`].
//! Cloning a container always yields an unfrozen deep copy.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Number;

use crate::StoreError;

/// A single payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Array),
    Object(Object),
}

/// A field slot inside an [`Object`].
///
/// `Absent` marks a field the caller wants gone; it is dropped when the
/// owning record is saved.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Present(Value),
    Absent,
}

/// Ordered sequence of values.
#[derive(Debug, Default)]
pub struct Array {
    pub(crate) items: Vec<Value>,
    pub(crate) frozen: bool,
}

/// Keyed structure of fields.
#[derive(Debug, Default)]
pub struct Object {
    pub(crate) fields: BTreeMap<String, FieldValue>,
    pub(crate) frozen: bool,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Convert to plain JSON. `Absent` fields are skipped.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(a) => serde_json::Value::Array(a.iter().map(Value::to_json).collect()),
            Value::Object(o) => serde_json::Value::Object(o.to_json_map()),
        }
    }

    /// Drop `Absent` fields at every depth below this value.
    pub(crate) fn strip_absent(&mut self) -> Result<(), StoreError> {
        match self {
            Value::Array(a) => a.strip_absent(),
            Value::Object(o) => o.strip_absent(),
            _ => Ok(()),
        }
    }
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Present(v) => Some(v),
            FieldValue::Absent => None,
        }
    }
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Result<Option<&mut Value>, StoreError> {
        self.ensure_mutable()?;
        Ok(self.items.get_mut(index))
    }

    pub fn push<V: Into<Value>>(&mut self, value: V) -> Result<(), StoreError> {
        self.ensure_mutable()?;
        self.items.push(value.into());
        Ok(())
    }

    /// Replace the element at `index`, returning the previous one. Out of
    /// range indexes leave the array untouched and return `None`.
    pub fn set<V: Into<Value>>(&mut self, index: usize, value: V) -> Result<Option<Value>, StoreError> {
        self.ensure_mutable()?;
        Ok(self
            .items
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value.into())))
    }

    fn ensure_mutable(&self) -> Result<(), StoreError> {
        if self.frozen {
            return Err(StoreError::Frozen);
        }
        Ok(())
    }

    fn strip_absent(&mut self) -> Result<(), StoreError> {
        for item in self.items.iter_mut() {
            item.strip_absent()?;
        }
        Ok(())
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of present fields.
    pub fn len(&self) -> usize {
        self.fields.values().filter(|f| !f.is_absent()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).and_then(FieldValue::as_value)
    }

    /// Raw slot for `key`, including the `Absent` marker.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Present fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter_map(|(k, f)| f.as_value().map(|v| (k.as_str(), v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    pub fn get_mut(&mut self, key: &str) -> Result<Option<&mut Value>, StoreError> {
        self.ensure_mutable()?;
        Ok(match self.fields.get_mut(key) {
            Some(FieldValue::Present(v)) => Some(v),
            _ => None,
        })
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<Option<FieldValue>, StoreError> {
        self.ensure_mutable()?;
        Ok(self
            .fields
            .insert(key.into(), FieldValue::Present(value.into())))
    }

    /// Mark `key` absent. The field disappears from reads immediately and
    /// from the stored record once it is saved.
    pub fn unset<K: Into<String>>(&mut self, key: K) -> Result<(), StoreError> {
        self.ensure_mutable()?;
        self.fields.insert(key.into(), FieldValue::Absent);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<FieldValue>, StoreError> {
        self.ensure_mutable()?;
        Ok(self.fields.remove(key))
    }

    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect()
    }

    fn ensure_mutable(&self) -> Result<(), StoreError> {
        if self.frozen {
            return Err(StoreError::Frozen);
        }
        Ok(())
    }

    /// Drop `Absent` fields here and in every nested container.
    pub(crate) fn strip_absent(&mut self) -> Result<(), StoreError> {
        if self.fields.values().any(FieldValue::is_absent) {
            self.ensure_mutable()?;
            self.fields.retain(|_, f| !f.is_absent());
        }
        for field in self.fields.values_mut() {
            if let FieldValue::Present(v) = field {
                v.strip_absent()?;
            }
        }
        Ok(())
    }
}

// Clones are deep and never frozen.
impl Clone for Array {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            frozen: false,
        }
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            frozen: false,
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(Object::from(map)),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Object {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Present(Value::from(v))))
                .collect(),
            frozen: false,
        }
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            frozen: false,
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), FieldValue::Present(v)))
                .collect(),
            frozen: false,
        }
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(a) => a.serialize(serializer),
            Value::Object(o) => o.serialize(serializer),
        }
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
