//! Seed data for the store.
//!
//! A fixture document is a JSON object mapping model names to arrays of raw
//! record payloads:
//!
//! ```json
//! { "food": [{ "name": { "singular": "apple", "plural": "apples" } }] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::StoreError;

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct Fixtures {
    models: BTreeMap<String, Vec<serde_json::Value>>,
}

impl Fixtures {
    pub fn from_json_str(s: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Fixtures {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Records for `model`, leaving nothing behind. Unknown models yield an
    /// empty list.
    pub fn take(&mut self, model: &str) -> Vec<serde_json::Value> {
        self.models.remove(model).unwrap_or_default()
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
