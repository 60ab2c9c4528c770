//! Simulated persistent records.
//!
//! A [`Record`] is a pure value: identity plus payload fields. Records that
//! belong to a model also carry [`Hooks`], the write callbacks the model hands
//! out at construction. The record never learns which overlay its writes end
//! up in.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::deep::{DeepCopy, Freeze};
use crate::value::{Object, Value};
use crate::{RecordId, StoreError, ID_FIELD};

/// Callback invoked with the record being written.
pub type WriteFn = Arc<dyn Fn(&Record) -> Result<(), StoreError> + Send + Sync>;

/// Write callbacks bound to a record by its owning model.
#[derive(Clone)]
pub struct Hooks {
    on_save: WriteFn,
    on_remove: WriteFn,
}

impl Hooks {
    pub fn new<S, R>(on_save: S, on_remove: R) -> Self
    where
        S: Fn(&Record) -> Result<(), StoreError> + Send + Sync + 'static,
        R: Fn(&Record) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        Self {
            on_save: Arc::new(on_save),
            on_remove: Arc::new(on_remove),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hooks { .. }")
    }
}

/// Identity, payload fields and (optionally) the owning model's write hooks.
#[derive(Debug)]
pub struct Record {
    id: RecordId,
    fields: Object,
    hooks: Option<Hooks>,
}

impl Record {
    /// A detached record. Saving or removing it fails.
    pub fn new(id: RecordId, fields: Object) -> Self {
        Self {
            id,
            fields,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn fields(&self) -> &Object {
        &self.fields
    }

    /// Mutable access to one top-level field, for editing nested values in
    /// place. The root object itself is never handed out, so `id` stays
    /// reserved.
    pub fn get_mut(&mut self, key: &str) -> Result<Option<&mut Value>, StoreError> {
        if key == ID_FIELD {
            return Err(StoreError::ReservedField(key.to_string()));
        }
        self.fields.get_mut(key)
    }

    /// Whether write callbacks are attached.
    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.fields.is_frozen()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Result<(), StoreError> {
        let key = Self::writable_key(key.into())?;
        self.fields.insert(key, value)?;
        Ok(())
    }

    /// Mark a field for deletion on the next [`Record::save`].
    pub fn unset<K: Into<String>>(&mut self, key: K) -> Result<(), StoreError> {
        let key = Self::writable_key(key.into())?;
        self.fields.unset(key)
    }

    /// Shallow-merge a JSON object into the fields, replacing existing keys.
    pub fn assign(&mut self, update: serde_json::Map<String, serde_json::Value>) -> Result<(), StoreError> {
        if update.contains_key(ID_FIELD) {
            return Err(StoreError::ReservedField(ID_FIELD.to_string()));
        }
        for (k, v) in update {
            self.fields.insert(k, Value::from(v))?;
        }
        Ok(())
    }

    /// Drop every `Absent` field, then hand the record to the owning model.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let hooks = self
            .hooks
            .clone()
            .ok_or_else(|| StoreError::Detached(self.id.clone()))?;
        if self.fields.field(ID_FIELD).is_some() {
            return Err(StoreError::ReservedField(ID_FIELD.to_string()));
        }
        self.fields.strip_absent()?;
        (hooks.on_save)(self)
    }

    pub fn remove(&self) -> Result<(), StoreError> {
        let hooks = self
            .hooks
            .as_ref()
            .ok_or_else(|| StoreError::Detached(self.id.clone()))?;
        (hooks.on_remove)(self)
    }

    /// Deep copy of the record. Hooks are kept only when `retain_callbacks`
    /// is set; otherwise the copy is a plain exportable value.
    pub fn clone_handle(&self, retain_callbacks: bool) -> Record {
        Record {
            id: self.id.clone(),
            fields: self.fields.deep_copy(),
            hooks: if retain_callbacks {
                self.hooks.clone()
            } else {
                None
            },
        }
    }

    /// Exported JSON shape: payload fields plus `id`.
    pub fn export(&self) -> serde_json::Value {
        let mut map = self.fields.to_json_map();
        map.insert(
            ID_FIELD.to_string(),
            serde_json::Value::String(self.id.as_str().to_string()),
        );
        serde_json::Value::Object(map)
    }

    /// Decode the exported shape into a concrete payload type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.export())?)
    }

    fn writable_key(key: String) -> Result<String, StoreError> {
        if key == ID_FIELD {
            return Err(StoreError::ReservedField(key));
        }
        Ok(key)
    }
}

// Callbacks are plumbing; two records are equal when their data is.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields
    }
}

impl DeepCopy for Record {
    fn deep_copy(&self) -> Self {
        self.clone_handle(true)
    }
}

impl Freeze for Record {
    fn freeze(&mut self) {
        self.fields.freeze();
    }

    fn is_frozen(&self) -> bool {
        self.fields.is_frozen()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in self.fields.iter().filter(|(k, _)| *k != ID_FIELD) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A record variant handed out by a [`crate::Collection`].
///
/// Variants wrap a [`Record`] and add whatever accessors the calling code
/// expects of its persistence layer. Cloning a variant yields the same variant.
pub trait Entity: Sized + Send + 'static {
    fn from_record(record: Record) -> Self;
    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;
    fn into_record(self) -> Record;

    fn id(&self) -> &RecordId {
        self.record().id()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.record_mut().save()
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.record().remove()
    }

    fn clone_handle(&self, retain_callbacks: bool) -> Self {
        Self::from_record(self.record().clone_handle(retain_callbacks))
    }
}

impl Entity for Record {
    fn from_record(record: Record) -> Self {
        record
    }

    fn record(&self) -> &Record {
        self
    }

    fn record_mut(&mut self) -> &mut Record {
        self
    }

    fn into_record(self) -> Record {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep::deep_freeze;
    use serde_json::json;
    use std::sync::Mutex;

    fn payload(json: serde_json::Value) -> Object {
        match Value::from(json) {
            Value::Object(o) => o,
            _ => panic!("payload must be an object"),
        }
    }

    fn recording_hooks() -> (Hooks, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let saves = log.clone();
        let removes = log.clone();
        let hooks = Hooks::new(
            move |r: &Record| {
                saves.lock().unwrap().push(format!("save {}", r.export()));
                Ok(())
            },
            move |r: &Record| {
                removes.lock().unwrap().push(format!("remove {}", r.id()));
                Ok(())
            },
        );
        (hooks, log)
    }

    #[test]
    fn export_includes_id_and_fields() {
        let r = Record::new(RecordId::new("MOCK_food_0_ID"), payload(json!({"name": "Apple"})));
        assert_eq!(r.export(), json!({"id": "MOCK_food_0_ID", "name": "Apple"}));
        assert_eq!(serde_json::to_value(&r).unwrap(), r.export());
    }

    #[test]
    fn save_strips_absent_fields_before_callback() {
        let (hooks, log) = recording_hooks();
        let mut r = Record::new(RecordId::new("x"), payload(json!({"a": 1, "b": {"c": 2, "d": 3}})))
            .with_hooks(hooks);
        r.unset("a").unwrap();
        r.get_mut("b")
            .unwrap()
            .and_then(Value::as_object_mut)
            .unwrap()
            .unset("d")
            .unwrap();

        r.save().unwrap();
        assert_eq!(r.export(), json!({"id": "x", "b": {"c": 2}}));
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], format!("save {}", json!({"id": "x", "b": {"c": 2}})));
    }

    #[test]
    fn detached_record_cannot_be_written() {
        let mut r = Record::new(RecordId::new("loose"), Object::new());
        assert!(matches!(r.save(), Err(StoreError::Detached(_))));
        assert!(matches!(r.remove(), Err(StoreError::Detached(_))));
    }

    #[test]
    fn clone_handle_controls_hooks() {
        let (hooks, log) = recording_hooks();
        let r = Record::new(RecordId::new("x"), payload(json!({"a": 1}))).with_hooks(hooks);

        let exported = r.clone_handle(false);
        assert!(!exported.has_hooks());
        assert_eq!(exported, r);

        let writable = r.clone_handle(true);
        writable.remove().unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["remove x"]);
    }

    #[test]
    fn id_is_reserved() {
        let mut r = Record::new(RecordId::new("x"), Object::new());
        assert!(matches!(r.set("id", "other"), Err(StoreError::ReservedField(_))));
        assert!(matches!(r.unset("id"), Err(StoreError::ReservedField(_))));
        let update = json!({"id": "other"}).as_object().cloned().unwrap();
        assert!(matches!(r.assign(update), Err(StoreError::ReservedField(_))));
        assert_eq!(r.id().as_str(), "x");
    }

    #[test]
    fn payload_id_never_reaches_a_saved_record() {
        let (hooks, log) = recording_hooks();
        let mut r = Record::new(RecordId::new("MOCK_food_0_ID"), payload(json!({"name": "Apple"})))
            .with_hooks(hooks);
        assert!(matches!(r.get_mut("id"), Err(StoreError::ReservedField(_))));

        let mut smuggled = Record::new(
            RecordId::new("MOCK_food_0_ID"),
            payload(json!({"id": "HIJACK", "name": "Apple"})),
        );
        assert_eq!(serde_json::to_value(&smuggled).unwrap(), smuggled.export());
        assert_eq!(smuggled.export()["id"], json!("MOCK_food_0_ID"));

        smuggled = smuggled.with_hooks(r.hooks.clone().unwrap());
        assert!(matches!(smuggled.save(), Err(StoreError::ReservedField(_))));
        r.save().unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn frozen_record_rejects_writes_but_clones_are_free() {
        let r = deep_freeze(Record::new(RecordId::new("x"), payload(json!({"a": 1}))));
        assert!(r.is_frozen());

        let mut copy = r.clone_handle(false);
        assert!(!copy.is_frozen());
        copy.set("a", 2i64).unwrap();
        assert_eq!(r.get("a").and_then(Value::as_i64), Some(1));

        let mut frozen = r;
        assert!(matches!(frozen.set("a", 3i64), Err(StoreError::Frozen)));
    }

    #[test]
    fn decode_into_concrete_shape() {
        #[derive(serde::Deserialize)]
        struct Food {
            id: String,
            name: String,
        }
        let r = Record::new(RecordId::new("MOCK_food_0_ID"), payload(json!({"name": "Apple"})));
        let food: Food = r.decode().unwrap();
        assert_eq!(food.id, "MOCK_food_0_ID");
        assert_eq!(food.name, "Apple");
    }
}
