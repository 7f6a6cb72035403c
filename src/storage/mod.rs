//! Document and blob storage abstractions.
//!
//! The pipeline only needs a generic document store (collections of JSON
//! field maps addressed by id) and a key/value blob store. Both are traits so
//! the backends can be swapped; SQLite, filesystem and in-memory
//! implementations are provided.

mod fs;
mod memory;
mod sqlite;

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryDocumentStore};
pub use sqlite::SqliteDocumentStore;

use crate::error::{Result, ScribeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// A document as returned by a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Deserialize the fields into a typed record.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields)).map_err(|e| {
            ScribeError::Storage(format!("Document {} has unexpected shape: {}", self.id, e))
        })
    }
}

/// Conjunction of field-equals-value conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Match every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents whose `field` equals `value`.
    pub fn equal(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Add another equality condition.
    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| fields.get(field) == Some(value))
    }
}

/// Serialize a record into a field map.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields> {
    let value = serde_json::to_value(record)
        .map_err(|e| ScribeError::Storage(format!("Failed to serialize record: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ScribeError::Storage(format!(
            "Records must serialize to an object, got {}",
            other
        ))),
    }
}

/// Trait for document store implementations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List matching documents of a collection in creation order.
    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>>;

    /// Fetch one document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>>;

    /// Create a document. Fails if the id is already taken in the collection.
    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument>;

    /// Merge `fields` into an existing document. Fails if it does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument>;

    /// Count matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize> {
        Ok(self.list(collection, filter).await?.len())
    }
}

/// Trait for blob store implementations.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, returning the key.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String>;

    /// Fetch the bytes stored under `key`. Missing blobs are a storage error.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Reject bucket names and keys that could escape their directory or clash
/// with temp files.
pub(crate) fn validate_blob_name(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ScribeError::InvalidInput(format!("Invalid blob {}: {:?}", kind, name)))
    }
}
