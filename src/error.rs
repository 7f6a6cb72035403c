//! Error types for SmartScribe.

use thiserror::Error;

/// Library-level error type for SmartScribe operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid index data: {0}")]
    IndexFormat(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification of a [`ScribeError`], used to pick a response status
/// and to tell which pipeline stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DimensionMismatch,
    Embedding,
    Storage,
    Generation,
    NotFound,
    Transcription,
    InvalidInput,
    Internal,
}

impl ScribeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScribeError::Config(_) | ScribeError::TomlParse(_) => ErrorKind::Configuration,
            ScribeError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ScribeError::Embedding(_) => ErrorKind::Embedding,
            ScribeError::Storage(_) | ScribeError::Database(_) | ScribeError::IndexFormat(_) => {
                ErrorKind::Storage
            }
            ScribeError::Generation(_) => ErrorKind::Generation,
            ScribeError::NotFound(_) => ErrorKind::NotFound,
            ScribeError::Transcription(_)
            | ScribeError::AudioDownload(_)
            | ScribeError::ToolNotFound(_) => ErrorKind::Transcription,
            ScribeError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScribeError::Io(_)
            | ScribeError::Json(_)
            | ScribeError::Http(_)
            | ScribeError::OpenAI(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for SmartScribe operations.
pub type Result<T> = std::result::Result<T, ScribeError>;
