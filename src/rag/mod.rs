//! RAG (Retrieval-Augmented Generation) for question answering over a session.
//!
//! The question is embedded, the nearest chunks of the session's index are
//! joined into a context block, and the generator answers from that context.

pub mod context;
mod generator;
mod response;

pub use context::build_context;
pub use generator::{Generator, OpenAIGenerator};
pub use response::{Answer, Responder};
