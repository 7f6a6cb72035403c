//! Text generation capability.

use crate::error::{Result, ScribeError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for prompt-to-text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ScribeError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .build()
            .map_err(|e| ScribeError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            ScribeError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScribeError::Generation("Empty response from LLM".to_string()))?;

        debug!("Generated {} characters", text.len());
        Ok(text)
    }
}
