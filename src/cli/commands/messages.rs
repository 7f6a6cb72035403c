//! Messages command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Print a session's conversation, oldest first.
pub async fn run_messages(session_id: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let session = orchestrator.get_session(session_id).await?;
    let messages = orchestrator.list_messages(session_id).await?;

    Output::header(&session.title);
    if messages.is_empty() {
        Output::info("No messages yet.");
    }
    for message in &messages {
        Output::message(message);
    }

    Ok(())
}
