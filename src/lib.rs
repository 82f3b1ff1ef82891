//! Peon - retrieval-augmented chat over policy documents
//!
//! Answers a user's question by retrieving the single closest document chunk
//! from a knowledge base, asking a chat model to answer from that context,
//! and recording every exchange in a durable per-user history.
//!
//! # Overview
//!
//! Peon allows you to:
//! - Index text documents into an embedding-backed knowledge base
//! - Chat with an assistant grounded on those documents
//! - Keep a per-session transcript and start a new chat at any time
//! - Review past exchanges: admins see everyone's, other users their own
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `embedding` - Embedding generation
//! - `knowledge` - Knowledge base storage and nearest-chunk retrieval
//! - `ingest` - Splitting and indexing documents
//! - `completion` - Prompt assembly and the chat model call
//! - `identity` - Caller names and roles
//! - `history` - Durable chat history with role-scoped reads
//! - `session` - Per-session transcript state
//! - `chat` - Submit, new chat and history view
//! - `render` - Terminal rendering
//! - `app` - Wiring the pieces together from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use peon::app::App;
//! use peon::config::Settings;
//! use peon::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::new(Settings::load()?).await?;
//!     let mut session = Session::new("alice");
//!
//!     let outcome = app
//!         .controller()
//!         .submit(&mut session, "What is covered under private car insurance?")
//!         .await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod identity;
pub mod ingest;
pub mod knowledge;
pub mod openai;
pub mod render;
pub mod session;

pub use error::{PeonError, Result};
