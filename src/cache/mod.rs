//! Per-session vector index cache.
//!
//! Each session has at most one [`IndexCacheRecord`] pointing at a serialized
//! [`VectorIndex`] in blob storage. The record is valid while its
//! `transcript_count` equals the session's current number of transcripts;
//! otherwise the index is rebuilt from every transcript, written under a fresh
//! blob key, and the record is upserted. Nothing is persisted unless the whole
//! rebuild succeeded, so a record always points at a complete blob.

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::config::CollectionNames;
use crate::embedding::EmbeddingGateway;
use crate::error::{Result, ScribeError};
use crate::session::{IndexCacheRecord, Transcript};
use crate::storage::{to_fields, BlobStore, DocumentStore, Filter};
use crate::vector_index::VectorIndex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Cache state of a session relative to its current transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No record exists.
    Absent,
    /// The record matches the current transcript count and dimensionality.
    Valid,
    /// A record exists but was built from a different corpus or model.
    Stale,
}

impl CacheState {
    /// Classify a session's record against its live transcript count.
    pub fn evaluate(
        record: Option<&IndexCacheRecord>,
        transcript_count: usize,
        dimensions: usize,
    ) -> Self {
        match record {
            None => CacheState::Absent,
            Some(r) if r.transcript_count == transcript_count && r.dimensions == dimensions => {
                CacheState::Valid
            }
            Some(_) => CacheState::Stale,
        }
    }
}

/// How a resolved index was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    Restored,
    Rebuilt,
}

impl std::fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheOutcome::Restored => write!(f, "restored"),
            CacheOutcome::Rebuilt => write!(f, "rebuilt"),
        }
    }
}

/// A session's index ready for querying.
#[derive(Debug, Clone)]
pub struct ResolvedIndex {
    pub index: VectorIndex,
    pub record: IndexCacheRecord,
    pub outcome: CacheOutcome,
}

/// Decides whether a session's persisted index is usable and rebuilds it when not.
pub struct IndexCacheManager {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    gateway: Arc<EmbeddingGateway>,
    chunking: ChunkingConfig,
    collections: CollectionNames,
    bucket: String,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexCacheManager {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<EmbeddingGateway>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            documents,
            blobs,
            gateway,
            chunking,
            collections: CollectionNames::default(),
            bucket: "session-indices".to_string(),
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use custom collection names and index bucket.
    pub fn with_locations(mut self, collections: CollectionNames, bucket: impl Into<String>) -> Self {
        self.collections = collections;
        self.bucket = bucket.into();
        self
    }

    /// Current cache state of a session, without resolving it.
    pub async fn state(&self, session_id: &str) -> Result<CacheState> {
        let transcript_count = self
            .documents
            .count(&self.collections.transcripts, &Filter::equal("session_id", session_id))
            .await?;
        let record = self.latest_record(session_id).await?;
        Ok(CacheState::evaluate(
            record.as_ref(),
            transcript_count,
            self.gateway.dimensions(),
        ))
    }

    /// Return a valid index for `session_id`, rebuilding it if needed.
    ///
    /// Fails with `NotFound` when the session has no transcripts; in that case
    /// nothing is built or written.
    #[instrument(skip(self))]
    pub async fn resolve(&self, session_id: &str) -> Result<ResolvedIndex> {
        let lock = self.session_lock(session_id).await;
        // State is read only after taking the lock, so a caller that waited
        // on a concurrent rebuild sees its record and restores instead.
        let _guard = lock.lock().await;

        let transcripts = self.transcripts(session_id).await?;
        if transcripts.is_empty() {
            return Err(ScribeError::NotFound(format!(
                "No transcripts found for session {}",
                session_id
            )));
        }

        let existing = self.latest_record(session_id).await?;
        let state = CacheState::evaluate(
            existing.as_ref(),
            transcripts.len(),
            self.gateway.dimensions(),
        );
        debug!(?state, transcripts = transcripts.len(), "Evaluated index cache");

        if let (CacheState::Valid, Some(record)) = (state, existing.as_ref()) {
            match self.restore(record).await {
                Ok(index) => {
                    info!("Restored index for session {} ({} entries)", session_id, index.len());
                    return Ok(ResolvedIndex {
                        index,
                        record: record.clone(),
                        outcome: CacheOutcome::Restored,
                    });
                }
                Err(e @ (ScribeError::IndexFormat(_) | ScribeError::DimensionMismatch { .. })) => {
                    warn!(
                        "Cached index {} for session {} is unusable, rebuilding: {}",
                        record.blob_key, session_id, e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let (index, record) = self.rebuild(session_id, &transcripts, existing).await?;
        Ok(ResolvedIndex {
            index,
            record,
            outcome: CacheOutcome::Rebuilt,
        })
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        // Forget locks nobody is holding or waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn transcripts(&self, session_id: &str) -> Result<Vec<Transcript>> {
        self.documents
            .list(&self.collections.transcripts, &Filter::equal("session_id", session_id))
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }

    /// The session's cache record. If a past race left several, the most
    /// recently built one wins.
    async fn latest_record(&self, session_id: &str) -> Result<Option<IndexCacheRecord>> {
        let records: Vec<IndexCacheRecord> = self
            .documents
            .list(&self.collections.index_cache, &Filter::equal("session_id", session_id))
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect::<Result<_>>()?;

        if records.len() > 1 {
            warn!("Session {} has {} index cache records", session_id, records.len());
        }
        Ok(records.into_iter().max_by_key(|r| r.built_at))
    }

    #[instrument(skip(self, record), fields(blob_key = %record.blob_key))]
    async fn restore(&self, record: &IndexCacheRecord) -> Result<VectorIndex> {
        let bytes = self.blobs.get(&self.bucket, &record.blob_key).await?;
        let index = VectorIndex::from_bytes(&bytes)?;

        if index.dimensions() != self.gateway.dimensions() {
            return Err(ScribeError::DimensionMismatch {
                expected: self.gateway.dimensions(),
                actual: index.dimensions(),
            });
        }
        Ok(index)
    }

    #[instrument(skip(self, transcripts, existing), fields(transcripts = transcripts.len()))]
    async fn rebuild(
        &self,
        session_id: &str,
        transcripts: &[Transcript],
        existing: Option<IndexCacheRecord>,
    ) -> Result<(VectorIndex, IndexCacheRecord)> {
        let texts: Vec<String> = transcripts
            .iter()
            .enumerate()
            .flat_map(|(i, t)| chunk_text(&t.original_text, i, &self.chunking))
            .map(|chunk| chunk.text)
            .filter(|text| !text.is_empty())
            .collect();

        let vectors = self.gateway.embed(&texts).await?;
        let mut index = VectorIndex::new(self.gateway.dimensions());
        index.add(vectors, texts)?;

        let key = blob_key_for(session_id);
        self.blobs.put(&self.bucket, &key, index.to_bytes()).await?;

        let mut record = IndexCacheRecord::new(
            session_id,
            key,
            transcripts.len(),
            self.gateway.dimensions(),
        );
        match existing {
            Some(old) => {
                record.id = old.id;
                self.documents
                    .update(&self.collections.index_cache, &record.id, to_fields(&record)?)
                    .await?;
            }
            None => {
                self.documents
                    .create(&self.collections.index_cache, &record.id, to_fields(&record)?)
                    .await?;
            }
        }

        info!(
            "Rebuilt index for session {}: {} chunks from {} transcripts",
            session_id,
            index.len(),
            transcripts.len()
        );
        Ok((index, record))
    }
}

/// Fresh blob key for a session's index. Characters outside the blob name
/// alphabet are replaced.
fn blob_key_for(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-{}.vidx", safe, Uuid::new_v4())
}
