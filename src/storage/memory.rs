//! In-memory storage implementations.
//!
//! Useful for testing and ephemeral runs.

use super::{validate_blob_name, BlobStore, DocumentStore, Fields, Filter, StoredDocument};
use crate::error::{Result, ScribeError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory document store. Collections keep documents in creation order.
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    /// Create a new in-memory document store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> ScribeError {
    ScribeError::Storage(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|d| d.id == id) {
            return Err(ScribeError::Storage(format!(
                "Document {} already exists in {}",
                id, collection
            )));
        }

        let now = Utc::now();
        let doc = StoredDocument {
            id: id.to_string(),
            fields,
            created_at: now,
            updated_at: now,
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| {
                ScribeError::Storage(format!("Document {} not found in {}", id, collection))
            })?;

        doc.fields.extend(fields);
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }
}

/// In-memory blob store.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create a new in-memory blob store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs across all buckets.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String> {
        validate_blob_name("bucket", bucket)?;
        validate_blob_name("key", key)?;
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.insert((bucket.to_string(), key.to_string()), bytes);
        Ok(key.to_string())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        blobs
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ScribeError::Storage(format!("Blob {}/{} not found", bucket, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::to_fields;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_document_store() {
        let store = MemoryDocumentStore::new();

        store
            .create("messages", "m1", to_fields(&json!({"session_id": "s1", "text": "hi"})).unwrap())
            .await
            .unwrap();
        store
            .create("messages", "m2", to_fields(&json!({"session_id": "s2", "text": "yo"})).unwrap())
            .await
            .unwrap();
        store
            .create("messages", "m3", to_fields(&json!({"session_id": "s1", "text": "bye"})).unwrap())
            .await
            .unwrap();

        let s1 = store.list("messages", &Filter::equal("session_id", "s1")).await.unwrap();
        let ids: Vec<&str> = s1.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(store.count("messages", &Filter::all()).await.unwrap(), 3);
        assert!(store.list("other", &Filter::all()).await.unwrap().is_empty());

        let updated = store
            .update("messages", "m1", to_fields(&json!({"text": "hello"})).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.fields["text"], "hello");
        assert_eq!(updated.fields["session_id"], "s1");
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids() {
        let store = MemoryDocumentStore::new();
        store.create("c", "x", Fields::new()).await.unwrap();

        assert!(matches!(
            store.create("c", "x", Fields::new()).await,
            Err(ScribeError::Storage(_))
        ));
        assert!(matches!(
            store.update("c", "nope", Fields::new()).await,
            Err(ScribeError::Storage(_))
        ));
        assert!(store.get("c", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_blob_store() {
        let store = MemoryBlobStore::new();
        let key = store.put("indices", "k1", vec![1, 2, 3]).await.unwrap();
        assert_eq!(key, "k1");
        assert_eq!(store.get("indices", "k1").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get("indices", "k2").await, Err(ScribeError::Storage(_))));
    }
}
