//! OpenAI Whisper transcription implementation.

use super::{youtube_video_id, MediaInput, Transcriber};
use crate::audio::download_audio;
use crate::config::TranscriptionSettings;
use crate::error::{Result, ScribeError};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_upload_bytes: usize,
    temp_dir: PathBuf,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(&TranscriptionSettings::default(), temp_dir)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(settings: &TranscriptionSettings, temp_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            max_upload_bytes: settings.max_upload_bytes,
            temp_dir: temp_dir.into(),
        })
    }

    fn check_size(&self, filename: &str, len: usize) -> Result<()> {
        if len == 0 {
            return Err(ScribeError::InvalidInput(format!("{} is empty", filename)));
        }
        if len > self.max_upload_bytes {
            return Err(ScribeError::InvalidInput(format!(
                "{} is {} bytes, the limit is {}",
                filename, len, self.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Send one audio payload to the API.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn transcribe_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        self.check_size(filename, bytes.len())?;
        debug!("Transcribing audio file");

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(filename.to_string(), bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| ScribeError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| ScribeError::OpenAI(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(ScribeError::Transcription(format!(
                "No speech recognized in {}",
                filename
            )));
        }

        info!("Transcribed {} characters", text.len());
        Ok(text)
    }

    #[instrument(skip(self))]
    async fn transcribe_youtube(&self, url: &str) -> Result<String> {
        let video_id = youtube_video_id(url).ok_or_else(|| {
            ScribeError::InvalidInput(format!("Not a supported YouTube URL: {}", url))
        })?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        // Removed with its contents when dropped.
        let work_dir = tempfile::Builder::new()
            .prefix("youtube-")
            .tempdir_in(&self.temp_dir)?;

        let audio_path = download_audio(url, &video_id, work_dir.path()).await?;
        let bytes = tokio::fs::read(&audio_path).await?;
        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        self.transcribe_bytes(&filename, bytes).await
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, input: MediaInput) -> Result<String> {
        match input {
            MediaInput::File { filename, bytes } => self.transcribe_bytes(&filename, bytes).await,
            MediaInput::Url(url) => self.transcribe_youtube(&url).await,
        }
    }
}
