//! Transcription of uploaded media and YouTube links into plain text.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Media to transcribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// An uploaded audio or video file.
    File { filename: String, bytes: Vec<u8> },
    /// A link to remote media.
    Url(String),
}

impl MediaInput {
    /// Read a local file into an upload.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        Ok(MediaInput::File { filename, bytes })
    }

    /// Short description for logs and titles.
    pub fn describe(&self) -> &str {
        match self {
            MediaInput::File { filename, .. } => filename,
            MediaInput::Url(url) => url,
        }
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `input` into plain text.
    async fn transcribe(&self, input: MediaInput) -> Result<String>;
}

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?:https?://)?
        (?:www\.|m\.)?
        (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
        ([a-zA-Z0-9_-]{11})
        (?:[?&\#/].*)?
        $
    ",
    )
    .expect("Invalid regex")
});

/// Extract the video id from a YouTube URL.
pub fn youtube_video_id(url: &str) -> Option<String> {
    YOUTUBE_ID
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
