//! Embedding generation for semantic search and retrieval.
//!
//! [`Embedder`] is the raw capability (a remote model or a local stand-in).
//! [`EmbeddingGateway`] wraps it with the pipeline's vector contract: one
//! vector per input, same order, every vector of the configured dimensionality.

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{Result, ScribeError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder named by `settings.provider`.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            settings.dimensions as usize,
        )?)),
        "hashing" | "local" => Ok(Arc::new(HashingEmbedder::new(settings.dimensions as usize))),
        other => Err(ScribeError::Config(format!("Unknown embedding provider: {}", other))),
    }
}

/// Adapts an [`Embedder`] to the pipeline's vector contract.
pub struct EmbeddingGateway {
    embedder: Arc<dyn Embedder>,
    dimensions: usize,
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl EmbeddingGateway {
    /// Create a gateway that expects vectors of the embedder's declared size.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimensions = embedder.dimensions();
        Self {
            embedder,
            dimensions,
            batch_size: 100,
            max_concurrent_batches: 4,
        }
    }

    /// Set request batching. Zero values are clamped to one.
    pub fn with_batching(mut self, batch_size: usize, max_concurrent_batches: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_concurrent_batches = max_concurrent_batches.max(1);
        self
    }

    pub fn from_settings(embedder: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Self {
        Self::new(embedder).with_batching(settings.batch_size, settings.max_concurrent_batches)
    }

    /// Dimensionality every produced vector has.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed `texts`, returning exactly one vector per text in input order.
    ///
    /// Batches run concurrently, results are reassembled in input order. Any
    /// failed batch, short response or wrongly sized vector fails the whole call.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Futures are built up front so the returned future stays `Send`.
        let pending: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|batch| self.embed_checked(batch))
            .collect();

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(pending)
            .buffered(self.max_concurrent_batches)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScribeError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_checked(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(batch).await.map_err(|e| match e {
            ScribeError::Embedding(_) | ScribeError::DimensionMismatch { .. } => e,
            other => ScribeError::Embedding(other.to_string()),
        })?;

        if vectors.len() != batch.len() {
            return Err(ScribeError::Embedding(format!(
                "expected {} vectors, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(ScribeError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Puts each text's byte length in the first component.
    struct LengthEmbedder {
        dims: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dims];
                    v[0] = t.len() as f32;
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    /// Always answers with one vector fewer than requested.
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0; 4]; texts.len().saturating_sub(1)])
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(ScribeError::OpenAI("model overloaded".into()))
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_batches_preserve_input_order() {
        let embedder = Arc::new(LengthEmbedder {
            dims: 3,
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(embedder.clone()).with_batching(2, 3);

        let texts: Vec<String> = (1..=7).map(|n| "x".repeat(n)).collect();
        let vectors = gateway.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 7);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], (i + 1) as f32);
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_input_skips_embedder() {
        let embedder = Arc::new(LengthEmbedder {
            dims: 3,
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(embedder.clone());
        assert!(gateway.embed(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_response_is_a_failure() {
        let gateway = EmbeddingGateway::new(Arc::new(ShortEmbedder));
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(gateway.embed(&texts).await, Err(ScribeError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_capability_error_becomes_embedding_failure() {
        let gateway = EmbeddingGateway::new(Arc::new(FailingEmbedder));
        let err = gateway.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, ScribeError::Embedding(_)));
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_wrong_dimensions_rejected() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(8));
        let gateway = EmbeddingGateway {
            embedder,
            dimensions: 16,
            batch_size: 10,
            max_concurrent_batches: 1,
        };
        let result = gateway.embed(&["text".to_string()]).await;
        assert!(matches!(
            result,
            Err(ScribeError::DimensionMismatch { expected: 16, actual: 8 })
        ));
    }

    #[test]
    fn test_create_embedder_by_provider() {
        let mut settings = EmbeddingSettings {
            provider: "hashing".to_string(),
            ..Default::default()
        };
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 384);

        settings.provider = "carrier-pigeon".to_string();
        assert!(matches!(create_embedder(&settings), Err(ScribeError::Config(_))));
    }
}
