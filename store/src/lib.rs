//! In-process mock record store for tests.
//!
//! A [`Store`] holds one model per logical collection. Each model keeps a
//! frozen base dataset captured at registration time plus two overlays
//! (`updated` and `removed`) that record every write made since the last
//! [`Store::reset`]. Reads resolve through removed, updated and base in that
//! order and always hand out deep copies, so a test can mutate whatever it
//! receives without touching what the next test sees.
//!
//! Keep HTTP, validation and response shaping out of this crate; those live in
//! the apps that consume it.

use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::future::Ready;

use serde::Serialize;
use thiserror::Error;

/// Identity of a record, assigned once at registration.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an arbitrary identity, e.g. one taken from a request path.
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Deterministic identity of the record at `index` in a model's initial
    /// record list.
    pub fn for_model(model: &str, index: usize) -> Self {
        Self(format!("MOCK_{}_{}_ID", model, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Result of a point lookup. Lookups are synchronous in effect; the future is
/// already resolved and only mirrors the shape of a remote store.
pub type Lookup<T> = Ready<Result<T, NotFound>>;

/// The expected, recoverable failure of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("{model} record with {id} has been removed")]
    Removed { model: String, id: RecordId },

    #[error("no {model} record with {id} has been found")]
    Missing { model: String, id: RecordId },
}

impl NotFound {
    pub fn id(&self) -> &RecordId {
        match self {
            NotFound::Removed { id, .. } | NotFound::Missing { id, .. } => id,
        }
    }
}

/// Misuse of the store itself. These are never folded into a lookup result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is not a model in the mocked database")]
    UnknownModel(String),

    #[error("{0} is already a model in the mocked database")]
    DuplicateModel(String),

    #[error("collection {collection} is already registered as model {model}")]
    CollectionInUse { collection: String, model: String },

    #[error("collection {0} is not bound to a mocked database; call reset before using it")]
    Unbound(String),

    #[error("record {0} is not owned by a model and cannot be written")]
    Detached(RecordId),

    #[error("{model} record at index {index} must be a JSON object")]
    InvalidPayload { model: String, index: usize },

    #[error("field `{0}` is reserved and cannot be written")]
    ReservedField(String),

    #[error("cannot update {model} record {id} because it is already removed")]
    AlreadyRemoved { model: String, id: RecordId },

    #[error("attempted to modify a frozen value")]
    Frozen,

    #[error("model {0} has been disposed")]
    Disposed(String),

    #[error("{0} lock poisoned")]
    Poisoned(String),

    #[error("payload conversion failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to read fixtures from {path}: {source}")]
    Fixtures {
        path: String,
        source: std::io::Error,
    },
}

impl StoreError {
    /// Setup errors mean the test double was wired up wrong.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownModel(_)
                | StoreError::DuplicateModel(_)
                | StoreError::CollectionInUse { .. }
                | StoreError::Unbound(_)
                | StoreError::Detached(_)
                | StoreError::Disposed(_)
                | StoreError::InvalidPayload { .. }
                | StoreError::ReservedField(_)
        )
    }

    /// A write contradicted the overlay state, e.g. saving a removed record.
    pub fn is_consistency(&self) -> bool {
        matches!(self, StoreError::AlreadyRemoved { .. })
    }
}

/// Name of the reserved identity field in exported records.
pub const ID_FIELD: &str = "id";

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - mock record store", pkg, ver)
}

pub mod collection;
pub mod deep;
pub mod fixtures;
mod model;
pub mod record;
pub mod store;
pub mod value;

pub use collection::Collection;
pub use deep::{deep_copy, deep_freeze, DeepCopy, Freeze};
pub use fixtures::Fixtures;
pub use record::{Entity, Hooks, Record};
pub use store::Store;
pub use value::{Array, FieldValue, Object, Value};
