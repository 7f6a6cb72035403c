//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, TranscriptAction};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::NewTranscript;
use crate::transcription::{youtube_video_id, MediaInput};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the transcript command.
pub async fn run_transcript(action: &TranscriptAction, settings: Settings) -> Result<()> {
    match action {
        TranscriptAction::Add {
            session,
            file,
            title,
            user,
        } => {
            preflight::check(Operation::AddText)?;
            let path = Path::new(file);
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            let title = title.clone().unwrap_or_else(|| file_title(path));

            let orchestrator = Orchestrator::new(settings)?;
            let transcript = orchestrator
                .add_transcript(NewTranscript::text(session, user, title, text))
                .await?;

            Output::success(&format!("Added transcript {}", transcript.title));
            Output::kv("ID", &transcript.id);
        }

        TranscriptAction::Media {
            session,
            input,
            title,
            user,
        } => {
            let media = if youtube_video_id(input).is_some() {
                preflight::check(Operation::TranscribeUrl)?;
                MediaInput::Url(input.clone())
            } else {
                preflight::check(Operation::TranscribeFile)?;
                MediaInput::from_path(Path::new(input))
                    .await
                    .with_context(|| format!("Failed to read {}", input))?
            };

            let orchestrator = Orchestrator::new(settings)?;
            let spinner = Output::spinner(&format!("Transcribing {}...", media.describe()));
            let result = orchestrator
                .transcribe_and_add(session, user, title.as_deref(), media)
                .await;
            spinner.finish_and_clear();

            let transcript = result?;
            Output::success(&format!(
                "Transcribed {} ({} characters)",
                transcript.title,
                transcript.original_text.chars().count()
            ));
            Output::kv("ID", &transcript.id);
        }

        TranscriptAction::List { session } => {
            let orchestrator = Orchestrator::new(settings)?;
            let transcripts = orchestrator.list_transcripts(session).await?;
            if transcripts.is_empty() {
                Output::info("No transcripts in this session.");
                return Ok(());
            }

            Output::header(&format!("Transcripts ({})", transcripts.len()));
            for transcript in &transcripts {
                Output::transcript(transcript);
            }
        }
    }

    Ok(())
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}
