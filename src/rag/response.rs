//! Answer generation over a session's vector index.

use super::context::build_context;
use super::Generator;
use crate::config::{Prompts, RagSettings};
use crate::embedding::EmbeddingGateway;
use crate::error::Result;
use crate::vector_index::{SearchHit, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A generated answer with the context it was built from.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Trimmed answer text, or an error placeholder when generation failed.
    pub text: String,
    /// Retrieved chunks, nearest first.
    pub sources: Vec<SearchHit>,
    /// Whether `text` is a placeholder for a failed generation.
    pub degraded: bool,
}

/// Retrieves context for a question and asks the generator to answer it.
pub struct Responder {
    gateway: Arc<EmbeddingGateway>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    top_k: usize,
    max_tokens: u32,
}

impl Responder {
    pub fn new(gateway: Arc<EmbeddingGateway>, generator: Arc<dyn Generator>) -> Self {
        Self {
            gateway,
            generator,
            prompts: Prompts::default(),
            top_k: 3,
            max_tokens: 256,
        }
    }

    pub fn from_settings(
        gateway: Arc<EmbeddingGateway>,
        generator: Arc<dyn Generator>,
        settings: &RagSettings,
    ) -> Self {
        Self::new(gateway, generator)
            .with_top_k(settings.top_k)
            .with_max_tokens(settings.max_tokens)
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Render the answer prompt for `question` over `context`.
    pub fn build_prompt(&self, question: &str, context: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context.to_string());
        self.prompts.render_with_custom(&self.prompts.rag.answer, &vars)
    }

    /// Answer `question` from the `top_k` nearest entries of `index`.
    ///
    /// Embedding and search failures are returned as errors. A generation
    /// failure is not: the answer then carries a placeholder text and
    /// `degraded` is set.
    #[instrument(skip(self, index), fields(question = %question, entries = index.len()))]
    pub async fn answer(&self, question: &str, index: &VectorIndex) -> Result<Answer> {
        let query = self.gateway.embed_query(question).await?;
        let sources = index.search(&query, self.top_k)?;
        debug!("Retrieved {} context chunks", sources.len());

        let prompt = self.build_prompt(question, &build_context(&sources));

        match self.generator.generate(&prompt, self.max_tokens).await {
            Ok(text) => {
                info!("Generated answer from {} chunks", sources.len());
                Ok(Answer {
                    text: text.trim().to_string(),
                    sources,
                    degraded: false,
                })
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                Ok(Answer {
                    text: format!("[Generation error] {}", e),
                    sources,
                    degraded: true,
                })
            }
        }
    }
}
