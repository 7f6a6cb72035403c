//! SmartScribe - transcripts in, grounded answers out
//!
//! A session collects transcripts of lectures, talks and videos. Questions
//! about a session are answered from the transcript passages closest to the
//! question.
//!
//! # Overview
//!
//! SmartScribe allows you to:
//! - Transcribe uploaded audio/video files and YouTube links with Whisper
//! - Group transcripts and a conversation thread into sessions
//! - Ask questions and get answers built from the most relevant passages
//! - Serve all of it over a small JSON API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `storage` - Document and blob store abstractions with SQLite, filesystem and in-memory backends
//! - `session` - Typed session, transcript, message and cache records
//! - `audio` / `transcription` - Media download and speech-to-text
//! - `chunking` - Overlapping fixed-size transcript windows
//! - `embedding` - Embedding capability and the gateway enforcing the vector contract
//! - `vector_index` - Exact L2 nearest-neighbour index and its binary format
//! - `cache` - Per-session index cache: staleness detection, rebuild, persist, restore
//! - `rag` - Context assembly and answer generation
//! - `orchestrator` - Application service tying the pieces together
//!
//! # Example
//!
//! ```rust,no_run
//! use smartscribe::config::Settings;
//! use smartscribe::orchestrator::Orchestrator;
//! use smartscribe::session::NewTranscript;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let session = orchestrator.create_session("ML 101", "me").await?;
//!     orchestrator
//!         .add_transcript(NewTranscript::text(
//!             &session.id,
//!             "me",
//!             "Lecture 1",
//!             "Gradient descent minimizes loss by updating weights using computed gradients.",
//!         ))
//!         .await?;
//!
//!     let result = orchestrator
//!         .answer_question(&session.id, "How does gradient descent work?")
//!         .await?;
//!     println!("{}", result.answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod storage;
pub mod transcription;
pub mod vector_index;

pub use error::{Result, ScribeError};
