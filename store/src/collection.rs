//! Write-capable entry point used by production-style code.
//!
//! A [`Collection`] stands where a real persistence model would: calling code
//! holds one and asks it for records by id. It starts out unbound; the
//! [`crate::Store`] it was registered with installs its lookup on every
//! [`crate::Store::reset`] and removes it again on dispose.

use std::future::ready;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::model::ModelEntry;
use crate::record::{Entity, Record};
use crate::{Lookup, StoreError};

/// Interception slot shared between a collection and its store.
#[derive(Clone, Default)]
pub(crate) struct Binding(Arc<RwLock<Option<Arc<ModelEntry>>>>);

impl Binding {
    pub(crate) fn install(&self, entry: Arc<ModelEntry>, collection: &str) -> Result<(), StoreError> {
        let mut slot = self
            .0
            .write()
            .map_err(|_| StoreError::Poisoned(collection.to_string()))?;
        *slot = Some(entry);
        Ok(())
    }

    pub(crate) fn restore(&self, collection: &str) -> Result<(), StoreError> {
        let mut slot = self
            .0
            .write()
            .map_err(|_| StoreError::Poisoned(collection.to_string()))?;
        *slot = None;
        Ok(())
    }

    fn current(&self, collection: &str) -> Result<Option<Arc<ModelEntry>>, StoreError> {
        let slot = self
            .0
            .read()
            .map_err(|_| StoreError::Poisoned(collection.to_string()))?;
        Ok(slot.clone())
    }

    pub(crate) fn same_slot(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Backing collection for one model, handing out handles of variant `H`.
pub struct Collection<H = Record> {
    name: String,
    binding: Binding,
    _variant: PhantomData<fn() -> H>,
}

impl<H> Clone for Collection<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            binding: self.binding.clone(),
            _variant: PhantomData,
        }
    }
}

impl<H: Entity> Collection<H> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            binding: Binding::default(),
            _variant: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.binding.current(&self.name), Ok(Some(_)))
    }

    /// Find one record by id. The handle keeps its write hooks so the caller
    /// may `save` or `remove` it.
    pub fn find_one(&self, id: &str) -> Result<Lookup<H>, StoreError> {
        let entry = self.entry()?;
        let resolution = entry.resolve(id, true)?;
        Ok(ready(resolution.map(H::from_record)))
    }

    /// Every live record of the model, exported without write hooks.
    pub fn find_all(&self) -> Result<Vec<H>, StoreError> {
        let entry = self.entry()?;
        Ok(entry
            .enumerate()?
            .into_iter()
            .map(H::from_record)
            .collect())
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    fn entry(&self) -> Result<Arc<ModelEntry>, StoreError> {
        self.binding
            .current(&self.name)?
            .ok_or_else(|| StoreError::Unbound(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_collection_fails_synchronously() {
        let food: Collection = Collection::new("Food");
        assert!(!food.is_bound());
        assert!(matches!(food.find_one("MOCK_food_0_ID"), Err(StoreError::Unbound(_))));
        assert!(matches!(food.find_all(), Err(StoreError::Unbound(_))));
    }

    #[test]
    fn clones_share_the_binding() {
        let food: Collection = Collection::new("Food");
        let copy = food.clone();
        assert!(copy.binding().same_slot(food.binding()));
        assert!(!Collection::<Record>::new("Food").binding().same_slot(food.binding()));
    }
}
