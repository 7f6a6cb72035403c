//! Session command implementation.

use crate::cli::{Output, SessionAction};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the session command.
pub async fn run_session(action: &SessionAction, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match action {
        SessionAction::New { title, user } => {
            let session = orchestrator.create_session(title, user).await?;
            Output::success(&format!("Created session {}", session.title));
            Output::kv("ID", &session.id);
        }

        SessionAction::List { user } => {
            let sessions = orchestrator.list_sessions(user.as_deref()).await?;
            if sessions.is_empty() {
                Output::info("No sessions yet. Create one with 'smartscribe session new <title>'.");
                return Ok(());
            }

            Output::header(&format!("Sessions ({})", sessions.len()));
            for session in &sessions {
                Output::session(session);
            }
        }
    }

    Ok(())
}
