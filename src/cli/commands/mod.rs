//! CLI command implementations.

mod ask;
mod config;
mod messages;
mod serve;
mod session;
mod transcript;

pub use ask::run_ask;
pub use config::run_config;
pub use messages::run_messages;
pub use serve::run_serve;
pub use session::run_session;
pub use transcript::run_transcript;
