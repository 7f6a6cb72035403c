//! SQLite-based document store.
//!
//! All collections share one table; field maps are stored as JSON text and
//! filtered in Rust, which is plenty for per-user session data.

use super::{DocumentStore, Fields, Filter, StoredDocument};
use crate::error::{Result, ScribeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        fields TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (collection, id)
    );

    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

/// Raw row: id, fields JSON, created_at, updated_at.
type Row = (String, String, String, String);

/// SQLite-based document store.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) a document database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite document store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory document store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ScribeError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    fn decode(row: Row) -> Result<StoredDocument> {
        let (id, fields_json, created_at, updated_at) = row;
        let fields: Fields = serde_json::from_str(&fields_json).map_err(|e| {
            ScribeError::Storage(format!("Corrupt fields for document {}: {}", id, e))
        })?;

        Ok(StoredDocument {
            id,
            fields,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn fetch(conn: &Connection, collection: &str, id: &str) -> Result<Option<Row>> {
        let row = conn
            .query_row(
                "SELECT id, fields, created_at, updated_at FROM documents
                 WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        Ok(row)
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    #[instrument(skip(self, filter))]
    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>> {
        let rows: Vec<Row> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, fields, created_at, updated_at FROM documents
                 WHERE collection = ?1 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc = Self::decode(row)?;
            if filter.matches(&doc.fields) {
                docs.push(doc);
            }
        }

        debug!("Listed {} documents from {}", docs.len(), collection);
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let row = {
            let conn = self.lock()?;
            Self::fetch(&conn, collection, id)?
        };
        row.map(Self::decode).transpose()
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument> {
        let conn = self.lock()?;

        if Self::fetch(&conn, collection, id)?.is_some() {
            return Err(ScribeError::Storage(format!(
                "Document {} already exists in {}",
                id, collection
            )));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO documents (collection, id, fields, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collection,
                id,
                serde_json::to_string(&fields)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        debug!("Created document {} in {}", id, collection);
        Ok(StoredDocument {
            id: id.to_string(),
            fields,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<StoredDocument> {
        let conn = self.lock()?;

        let row = Self::fetch(&conn, collection, id)?.ok_or_else(|| {
            ScribeError::Storage(format!("Document {} not found in {}", id, collection))
        })?;
        let mut doc = Self::decode(row)?;
        doc.fields.extend(fields);
        doc.updated_at = Utc::now();

        conn.execute(
            "UPDATE documents SET fields = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
            params![
                serde_json::to_string(&doc.fields)?,
                doc.updated_at.to_rfc3339(),
                collection,
                id,
            ],
        )?;

        debug!("Updated document {} in {}", id, collection);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::to_fields;
    use serde_json::json;

    #[tokio::test]
    async fn test_sqlite_document_store() {
        let store = SqliteDocumentStore::in_memory().unwrap();

        for (id, session) in [("t1", "s1"), ("t2", "s2"), ("t3", "s1")] {
            store
                .create(
                    "transcripts",
                    id,
                    to_fields(&json!({"session_id": session, "original_text": id})).unwrap(),
                )
                .await
                .unwrap();
        }

        let docs = store
            .list("transcripts", &Filter::equal("session_id", "s1"))
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert_eq!(
            store.count("transcripts", &Filter::equal("session_id", "s2")).await.unwrap(),
            1
        );

        let updated = store
            .update("transcripts", "t2", to_fields(&json!({"title": "Lecture 2"})).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.fields["title"], "Lecture 2");
        assert_eq!(updated.fields["session_id"], "s2");

        let fetched = store.get("transcripts", "t2").await.unwrap().unwrap();
        assert_eq!(fetched.fields, updated.fields);
    }

    #[tokio::test]
    async fn test_sqlite_rejects_duplicates_and_missing_updates() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        tokio_test::assert_ok!(store.create("c", "a", Fields::new()).await);
        // Same id in another collection is fine.
        tokio_test::assert_ok!(store.create("d", "a", Fields::new()).await);

        assert!(matches!(
            store.create("c", "a", Fields::new()).await,
            Err(ScribeError::Storage(_))
        ));
        assert!(matches!(
            store.update("c", "b", Fields::new()).await,
            Err(ScribeError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("documents.db");

        {
            let store = SqliteDocumentStore::new(&path).unwrap();
            store
                .create("sessions", "s1", to_fields(&json!({"title": "ML"})).unwrap())
                .await
                .unwrap();
        }

        let store = SqliteDocumentStore::new(&path).unwrap();
        let doc = store.get("sessions", "s1").await.unwrap().unwrap();
        assert_eq!(doc.fields["title"], "ML");
    }
}
