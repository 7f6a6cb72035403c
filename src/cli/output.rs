//! CLI output formatting utilities.

use crate::session::{Message, Sender, Session, Transcript};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    pub fn session(session: &Session) {
        println!(
            "  {} {} ({}, {}, {})",
            style("*").cyan(),
            style(&session.title).bold(),
            style(&session.id).dim(),
            session.user_id,
            session.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    pub fn transcript(transcript: &Transcript) {
        println!(
            "  {} {} ({}, {}, {} chars)",
            style("*").cyan(),
            style(&transcript.title).bold(),
            style(&transcript.id).dim(),
            transcript.source.label(),
            transcript.original_text.chars().count()
        );
    }

    pub fn message(message: &Message) {
        let sender = match message.sender {
            Sender::User => style("you").cyan().bold(),
            Sender::Assistant => style("assistant").green().bold(),
        };
        println!(
            "\n{} {}\n{}",
            sender,
            style(message.timestamp.format("%Y-%m-%d %H:%M")).dim(),
            message.text
        );
    }

    /// Print a retrieved context chunk.
    pub fn source(rank: usize, distance: f32, content: &str) {
        println!(
            "\n{} [{}] (distance: {:.3})",
            style(">>").green(),
            rank,
            distance
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
