//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod history;
mod ingest;
mod init;
mod serve;
mod sources;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use history::run_history;
pub use ingest::run_ingest;
pub use init::run_init;
pub use serve::{router, run_serve, AppState};
pub use sources::run_sources;
