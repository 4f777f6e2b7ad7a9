//! Persistence adapter for validated objects.
//!
//! Objects travel to and from a store in their transport form (URL-safe
//! base64 of the YAML export). [`ObjectStore`] is the seam a real backend
//! implements; [`MemoryStore`] keeps records in a map and is what tests and
//! single-process tools use.
//!
//! # Example
//!
//! ```
//! use mlspec_core::SchemaRegistry;
//! use mlspec_db::{MemoryStore, RecordKey, persist, restore};
//!
//! let registry = SchemaRegistry::new();
//! registry
//!     .compiler()
//!     .compile_str("epochs:\n  type: int\n", Some("trainer"))
//!     .unwrap();
//! let object = registry
//!     .validator()
//!     .load_as("trainer", "epochs: 3\n")
//!     .unwrap()
//!     .into_result()
//!     .unwrap();
//!
//! let mut store = MemoryStore::new();
//! let key = RecordKey::new("0.0.1", "train", "trainer");
//! let id = persist(&mut store, &object, &key).unwrap();
//!
//! let loaded = restore(&store, &registry.validator(), "trainer", &id).unwrap();
//! assert_eq!(loaded.into_result().unwrap(), object);
//! ```

use std::collections::HashMap;

use mlspec_core::{Loaded, ValidatedObject, Validator, decode_transport};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};

/// Identifies where a record belongs in a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub workflow_version: String,
    pub step_name: String,
    pub content_type: String,
}

impl RecordKey {
    pub fn new(
        workflow_version: impl Into<String>,
        step_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            workflow_version: workflow_version.into(),
            step_name: step_name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Storage backend for transport-encoded objects.
pub trait ObjectStore {
    /// Stores `encoded` under `key` and returns a new record id.
    fn attach(&mut self, encoded: &str, key: &RecordKey) -> Result<String>;

    /// Returns the encoded content of a record.
    fn fetch(&self, record_id: &str) -> Result<String>;
}

/// One record held by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: RecordKey,
    pub encoded: String,
}

/// In-memory [`ObjectStore`] with UUID v4 record ids.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, StoredRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, record_id: &str) -> Option<&StoredRecord> {
        self.records.get(record_id)
    }

    /// Record ids stored under `key`, sorted.
    pub fn ids_for(&self, key: &RecordKey) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .records
            .iter()
            .filter(|(_, record)| record.key == *key)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl ObjectStore for MemoryStore {
    fn attach(&mut self, encoded: &str, key: &RecordKey) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.records.insert(
            id.clone(),
            StoredRecord {
                key: key.clone(),
                encoded: encoded.to_string(),
            },
        );
        debug!(record = %id, step = %key.step_name, content_type = %key.content_type, "Attached record");
        Ok(id)
    }

    fn fetch(&self, record_id: &str) -> Result<String> {
        self.records
            .get(record_id)
            .map(|record| record.encoded.clone())
            .ok_or_else(|| DatabaseError::RecordNotFound(record_id.to_string()))
    }
}

/// Encodes `object` for transport and attaches it to `store`.
pub fn persist<S: ObjectStore + ?Sized>(
    store: &mut S,
    object: &ValidatedObject,
    key: &RecordKey,
) -> Result<String> {
    let encoded = object.encode_for_transport()?;
    store.attach(&encoded, key)
}

/// Fetches a record, decodes it and validates it against `schema`.
pub fn restore<S: ObjectStore + ?Sized>(
    store: &S,
    validator: &Validator<'_>,
    schema: &str,
    record_id: &str,
) -> Result<Loaded> {
    let encoded = store.fetch(record_id)?;
    let text = decode_transport(&encoded)?;
    Ok(validator.load_as(schema, text)?)
}
