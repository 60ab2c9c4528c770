use std::collections::BTreeMap;
use std::future::ready;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collection::{Binding, Collection};
use crate::model::ModelEntry;
use crate::record::{Entity, Record};
use crate::value::{Object, Value};
use crate::{Lookup, StoreError, ID_FIELD};

struct Model {
    entry: Arc<ModelEntry>,
    collection: String,
    binding: Binding,
}

/// The mock database: registered models keyed by name.
///
/// Lifecycle: `new()`, then `register` each model once, then `reset` before
/// every test case, then `dispose` when the run is over. Skipping `reset`
/// leaks the previous test's writes forward.
#[derive(Default)]
pub struct Store {
    models: BTreeMap<String, Model>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `records` under `name`, backed by `collection`.
    ///
    /// Each record must serialize to a JSON object without an `id` field; ids
    /// are assigned here from the model name and the record's position.
    pub fn register<H, T, I>(
        &mut self,
        collection: &Collection<H>,
        name: &str,
        records: I,
    ) -> Result<(), StoreError>
    where
        H: Entity,
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        if self.models.contains_key(name) {
            return Err(StoreError::DuplicateModel(name.to_string()));
        }
        if let Some((model, _)) = self
            .models
            .iter()
            .find(|(_, m)| m.binding.same_slot(collection.binding()))
        {
            return Err(StoreError::CollectionInUse {
                collection: collection.name().to_string(),
                model: model.clone(),
            });
        }

        let payloads = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| to_payload(name, index, record))
            .collect::<Result<Vec<_>, _>>()?;

        let entry = ModelEntry::new(name, std::any::type_name::<H>(), payloads);
        info!(
            model = name,
            collection = collection.name(),
            variant = entry.variant(),
            records = entry.len(),
            "model registered"
        );
        self.models.insert(
            name.to_string(),
            Model {
                entry: Arc::new(entry),
                collection: collection.name().to_string(),
                binding: collection.binding().clone(),
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Point lookup. `write_capable` keeps the write hooks on the returned
    /// handle; harness lookups leave it off so results compare cleanly.
    pub fn lookup(&self, name: &str, id: &str, write_capable: bool) -> Result<Lookup<Record>, StoreError> {
        let entry = self.entry(name)?;
        Ok(ready(entry.resolve(id, write_capable)?))
    }

    /// Exported record for `id`, as a test would assert on it.
    pub fn find(&self, name: &str, id: &str) -> Result<Lookup<Record>, StoreError> {
        self.lookup(name, id, false)
    }

    /// Every live record of `name`, exported.
    pub fn enumerate(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        self.entry(name)?.enumerate()
    }

    /// Forget every write and reinstall each collection's lookup.
    ///
    /// Every model is attempted even when one fails; a model that could not
    /// be cleared stays unbound and the first failure is returned.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for model in self.models.values() {
            if let Err(e) = model.binding.restore(&model.collection) {
                first_err.get_or_insert(e);
            }
        }
        for model in self.models.values() {
            let outcome = model
                .entry
                .clear_overlays()
                .and_then(|()| model.binding.install(model.entry.clone(), &model.collection));
            match outcome {
                Ok(()) => {
                    debug!(model = model.entry.name(), collection = %model.collection, "model reset")
                }
                Err(e) => {
                    warn!(model = model.entry.name(), err = %e, "model reset failed, left unbound");
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Unbind every collection and drop all overlay state.
    pub fn dispose(self) -> Result<(), StoreError> {
        for model in self.models.values() {
            model.binding.restore(&model.collection)?;
            model.entry.clear_overlays()?;
        }
        debug!(models = self.models.len(), "store disposed");
        Ok(())
    }

    /// `(updated, removed)` overlay sizes for `name`.
    pub fn pending_writes(&self, name: &str) -> Result<(usize, usize), StoreError> {
        self.entry(name)?.overlay_sizes()
    }

    fn entry(&self, name: &str) -> Result<&ModelEntry, StoreError> {
        self.models
            .get(name)
            .map(|m| m.entry.as_ref())
            .ok_or_else(|| StoreError::UnknownModel(name.to_string()))
    }
}

fn to_payload<T: Serialize>(model: &str, index: usize, record: T) -> Result<Object, StoreError> {
    match Value::from(serde_json::to_value(record)?) {
        Value::Object(fields) if fields.contains_key(ID_FIELD) => {
            Err(StoreError::ReservedField(ID_FIELD.to_string()))
        }
        Value::Object(fields) => Ok(fields),
        _ => Err(StoreError::InvalidPayload {
            model: model.to_string(),
            index,
        }),
    }
}
