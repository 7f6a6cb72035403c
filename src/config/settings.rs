//! Configuration settings for SmartScribe.

use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub storage: StorageSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.smartscribe".to_string(),
            temp_dir: "/tmp/smartscribe".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Names of the document collections used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub sessions: String,
    pub transcripts: String,
    pub messages: String,
    pub index_cache: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            sessions: "sessions".to_string(),
            transcripts: "transcripts".to_string(),
            messages: "messages".to_string(),
            index_cache: "index_cache".to_string(),
        }
    }
}

/// Document and blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the SQLite document database.
    pub sqlite_path: String,
    /// Root directory of the filesystem blob store.
    pub blob_dir: String,
    /// Bucket holding serialized session indices.
    pub index_bucket: String,
    pub collections: CollectionNames,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.smartscribe/documents.db".to_string(),
            blob_dir: "~/.smartscribe/blobs".to_string(),
            index_bucket: "session-indices".to_string(),
            collections: CollectionNames::default(),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Largest accepted audio payload in bytes (the Whisper API limit is 25 MB).
    pub max_upload_bytes: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Stored indices must agree with this value.
    pub dimensions: u32,
    /// Number of texts sent per embedding request.
    pub batch_size: usize,
    /// Maximum embedding requests in flight during a rebuild.
    pub max_concurrent_batches: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
            batch_size: 100,
            max_concurrent_batches: 4,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window size in characters.
    pub max_chunk_size: usize,
    /// Characters shared between consecutive windows. Must be below `max_chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 100,
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Number of chunks retrieved as context.
    pub top_k: usize,
    /// Output token budget for a generated answer.
    pub max_tokens: u32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            top_k: 3,
            max_tokens: 256,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_size == 0 {
            return Err(ScribeError::Config("chunking.max_chunk_size must be positive".into()));
        }
        if self.chunking.overlap >= self.chunking.max_chunk_size {
            return Err(ScribeError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.max_chunk_size ({})",
                self.chunking.overlap, self.chunking.max_chunk_size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(ScribeError::Config("embedding.dimensions must be positive".into()));
        }
        if self.embedding.batch_size == 0 || self.embedding.max_concurrent_batches == 0 {
            return Err(ScribeError::Config(
                "embedding.batch_size and embedding.max_concurrent_batches must be positive".into(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(ScribeError::Config("rag.top_k must be positive".into()));
        }
        Ok(())
    }

    /// Serialize the settings as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ScribeError::Config(e.to_string()))
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smartscribe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.sqlite_path)
    }

    /// Get the expanded blob store root.
    pub fn blob_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.blob_dir)
    }
}
