//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ScribeError;
use crate::orchestrator::Orchestrator;
use crate::session::Sender;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(session_id: &str, question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator
        .post_message(session_id, Sender::User, question)
        .await?;

    let spinner = Output::spinner("Searching transcripts...");
    let result = orchestrator.answer_question(session_id, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            println!("\n{}\n", result.answer.text);
            if result.answer.degraded {
                Output::warning("The answer could not be generated.");
            }

            Output::header("Sources");
            for (i, source) in result.answer.sources.iter().enumerate() {
                Output::source(i + 1, source.distance, &source.text);
            }
            println!();
            Output::kv("Index", &result.cache.to_string());
        }
        Err(ScribeError::NotFound(msg)) => {
            Output::warning(&msg);
            Output::info("Add a transcript first with 'smartscribe transcript add' or 'transcript media'.");
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
