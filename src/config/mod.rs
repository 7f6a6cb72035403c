//! Configuration module for SmartScribe.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, CollectionNames, EmbeddingSettings, GeneralSettings, PromptSettings,
    RagSettings, ServerSettings, Settings, StorageSettings, TranscriptionSettings,
};
