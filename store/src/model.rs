use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use crate::deep::deep_freeze;
use crate::record::{Hooks, Record};
use crate::value::Object;
use crate::{NotFound, RecordId, StoreError};

/// Writes made since the last reset.
#[derive(Default)]
struct Overlays {
    updated: HashMap<RecordId, Record>,
    removed: HashMap<RecordId, Record>,
}

/// One registered model: a frozen base dataset plus its overlays.
///
/// Base records keep registration order so enumeration is stable. Write hooks
/// hold the overlays weakly; once the entry is dropped, writes through any
/// outstanding handle fail with [`StoreError::Disposed`].
pub(crate) struct ModelEntry {
    name: String,
    variant: &'static str,
    base: Vec<Record>,
    index: HashMap<RecordId, usize>,
    overlays: Arc<Mutex<Overlays>>,
}

impl ModelEntry {
    pub(crate) fn new(name: &str, variant: &'static str, payloads: Vec<Object>) -> Self {
        let overlays = Arc::new(Mutex::new(Overlays::default()));
        let hooks = write_hooks(name, Arc::downgrade(&overlays));

        let base: Vec<Record> = payloads
            .into_iter()
            .enumerate()
            .map(|(idx, fields)| {
                Record::new(RecordId::for_model(name, idx), fields).with_hooks(hooks.clone())
            })
            .collect();
        let base = deep_freeze(base);
        let index = base
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id().clone(), idx))
            .collect();

        Self {
            name: name.to_string(),
            variant,
            base,
            index,
            overlays,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn variant(&self) -> &'static str {
        self.variant
    }

    pub(crate) fn len(&self) -> usize {
        self.base.len()
    }

    pub(crate) fn base_record(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&idx| &self.base[idx])
    }

    /// Resolve `id` through removed, updated and base, in that order.
    pub(crate) fn resolve(
        &self,
        id: &str,
        retain_callbacks: bool,
    ) -> Result<Result<Record, NotFound>, StoreError> {
        let overlays = self.lock()?;

        if overlays.removed.contains_key(id) {
            debug!(model = %self.name, id, "lookup hit removed overlay");
            return Ok(Err(NotFound::Removed {
                model: self.name.clone(),
                id: RecordId::new(id),
            }));
        }
        if let Some(record) = overlays.updated.get(id) {
            debug!(model = %self.name, id, "lookup hit updated overlay");
            return Ok(Ok(record.clone_handle(retain_callbacks)));
        }
        drop(overlays);

        match self.base_record(id) {
            Some(record) => {
                debug!(model = %self.name, id, "lookup hit base");
                Ok(Ok(record.clone_handle(retain_callbacks)))
            }
            None => {
                debug!(model = %self.name, id, "lookup missed");
                Ok(Err(NotFound::Missing {
                    model: self.name.clone(),
                    id: RecordId::new(id),
                }))
            }
        }
    }

    /// Every live record, updated versions preferred, exported without hooks.
    pub(crate) fn enumerate(&self) -> Result<Vec<Record>, StoreError> {
        let overlays = self.lock()?;
        Ok(self
            .base
            .iter()
            .filter(|r| !overlays.removed.contains_key(r.id()))
            .map(|r| overlays.updated.get(r.id()).unwrap_or(r))
            .map(|r| r.clone_handle(false))
            .collect())
    }

    pub(crate) fn clear_overlays(&self) -> Result<(), StoreError> {
        let mut overlays = self.lock()?;
        overlays.updated.clear();
        overlays.removed.clear();
        Ok(())
    }

    /// `(updated, removed)` overlay sizes.
    pub(crate) fn overlay_sizes(&self) -> Result<(usize, usize), StoreError> {
        let overlays = self.lock()?;
        Ok((overlays.updated.len(), overlays.removed.len()))
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let overlays = self.overlays.clone();
        let _ = std::thread::spawn(move || {
            let _guard = overlays.lock();
            panic!("poisoning overlays");
        })
        .join();
    }

    fn lock(&self) -> Result<MutexGuard<'_, Overlays>, StoreError> {
        self.overlays
            .lock()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))
    }
}

fn upgrade(model: &str, overlays: &Weak<Mutex<Overlays>>) -> Result<Arc<Mutex<Overlays>>, StoreError> {
    overlays
        .upgrade()
        .ok_or_else(|| StoreError::Disposed(model.to_string()))
}

// Saves land in `updated`, removals in `removed`; base is never touched.
fn write_hooks(model: &str, overlays: Weak<Mutex<Overlays>>) -> Hooks {
    let save_model = model.to_string();
    let save_target = overlays.clone();
    let remove_model = model.to_string();
    let remove_target = overlays;

    Hooks::new(
        move |record: &Record| {
            let target = upgrade(&save_model, &save_target)?;
            let mut overlays = target
                .lock()
                .map_err(|_| StoreError::Poisoned(save_model.clone()))?;
            if overlays.removed.contains_key(record.id()) {
                warn!(model = %save_model, id = %record.id(), "save rejected, record already removed");
                return Err(StoreError::AlreadyRemoved {
                    model: save_model.clone(),
                    id: record.id().clone(),
                });
            }
            overlays
                .updated
                .insert(record.id().clone(), record.clone_handle(true));
            debug!(model = %save_model, id = %record.id(), "record saved to overlay");
            Ok(())
        },
        move |record: &Record| {
            let target = upgrade(&remove_model, &remove_target)?;
            let mut overlays = target
                .lock()
                .map_err(|_| StoreError::Poisoned(remove_model.clone()))?;
            overlays
                .removed
                .insert(record.id().clone(), record.clone_handle(true));
            debug!(model = %remove_model, id = %record.id(), "record removed in overlay");
            Ok(())
        },
    )
}
