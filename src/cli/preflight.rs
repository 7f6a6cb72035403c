//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, ScribeError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Storing text needs embeddings only when a question is asked.
    AddText,
    /// Transcribing an upload requires the API key.
    TranscribeFile,
    /// Transcribing a YouTube link additionally requires yt-dlp.
    TranscribeUrl,
    /// Answering requires the API key for generation.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::AddText => {}
        Operation::TranscribeFile | Operation::Ask => {
            check_api_key()?;
        }
        Operation::TranscribeUrl => {
            check_api_key()?;
            check_tool("yt-dlp")?;
        }
    }
    Ok(())
}

/// Problems that would make the server fail on first use. Reported, not fatal.
pub fn server_warnings(settings: &Settings) -> Vec<String> {
    let mut warnings = Vec::new();
    if !is_api_key_configured() {
        warnings.push("OPENAI_API_KEY is not set; transcription and answers will fail.".to_string());
    }
    if check_tool("yt-dlp").is_err() {
        warnings.push("yt-dlp not found; YouTube transcripts are unavailable.".to_string());
    }
    if settings.server.allowed_origins.is_empty() {
        warnings.push("server.allowed_origins is empty; browsers will be refused.".to_string());
    }
    warnings
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(ScribeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ScribeError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScribeError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ScribeError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_text_has_no_requirements() {
        assert!(check(Operation::AddText).is_ok());
    }

    #[test]
    fn test_missing_tool_is_reported() {
        assert!(matches!(
            check_tool("smartscribe-no-such-tool"),
            Err(ScribeError::ToolNotFound(_))
        ));
    }
}
