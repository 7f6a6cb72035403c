//! CLI module for SmartScribe.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// SmartScribe - ask questions about your lectures, talks and videos
///
/// Collect transcripts of uploaded media and YouTube links into sessions,
/// then get answers grounded in what was actually said.
#[derive(Parser, Debug)]
#[command(name = "smartscribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create and list sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Add transcripts to a session
    Transcript {
        #[command(subcommand)]
        action: TranscriptAction,
    },

    /// Ask a question about a session's transcripts
    Ask {
        /// Session ID
        session: String,

        /// The question to ask
        question: String,
    },

    /// Show a session's conversation
    Messages {
        /// Session ID
        session: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// Create a new session
    New {
        /// Session title
        title: String,

        /// Owner of the session
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// List sessions
    List {
        /// Only show sessions of this user
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TranscriptAction {
    /// Add a plain-text transcript from a file
    Add {
        /// Session ID
        session: String,

        /// Text file to read
        file: String,

        /// Transcript title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Transcribe an audio/video file or YouTube URL into the session
    Media {
        /// Session ID
        session: String,

        /// Local audio/video file path or YouTube URL
        input: String,

        /// Transcript title (defaults to the file name or URL)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// List a session's transcripts
    List {
        /// Session ID
        session: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
