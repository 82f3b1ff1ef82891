//! Durable, append-only conversation history.
//!
//! Every answered turn becomes one [`HistoryRecord`]. Reads are scoped by the
//! caller's role: admins see every row with its session id, standard users
//! see only their own rows and never a session id.

mod memory;
mod sqlite;

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

use crate::config::{Settings, StoreProvider};
use crate::error::Result;
use crate::identity::{Identity, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One persisted question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub session_id: String,
    pub user_name: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// A history row as shown to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    /// Present only for admin-scoped reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub user_name: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Which rows and columns a read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    /// All rows, all columns.
    All,
    /// Only rows of this user, session id omitted.
    User(String),
}

impl HistoryScope {
    /// Derive the scope from a resolved identity.
    pub fn for_identity(identity: &Identity) -> Self {
        match identity.role {
            Role::Admin => HistoryScope::All,
            Role::Standard => HistoryScope::User(identity.user_name.clone()),
        }
    }

    /// Project a stored record for this scope, or None if it is out of scope.
    pub fn project(&self, record: &HistoryRecord) -> Option<HistoryRow> {
        match self {
            HistoryScope::All => Some(HistoryRow {
                session_id: Some(record.session_id.clone()),
                user_name: record.user_name.clone(),
                question: record.question.clone(),
                answer: record.answer.clone(),
                timestamp: record.timestamp,
            }),
            HistoryScope::User(user) if *user == record.user_name => Some(HistoryRow {
                session_id: None,
                user_name: record.user_name.clone(),
                question: record.question.clone(),
                answer: record.answer.clone(),
                timestamp: record.timestamp,
            }),
            HistoryScope::User(_) => None,
        }
    }
}

/// Trait for history store implementations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create the history table if it does not exist. Idempotent.
    async fn ensure_table(&self) -> Result<()>;

    /// Durably append one record. Returns an error if the write did not happen.
    async fn append(&self, record: &HistoryRecord) -> Result<()>;

    /// Read rows for a scope, oldest first.
    async fn query(&self, scope: &HistoryScope) -> Result<Vec<HistoryRow>>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// Open the history store configured in the settings and make sure its table exists.
pub async fn open(settings: &Settings) -> Result<Arc<dyn HistoryStore>> {
    let store: Arc<dyn HistoryStore> = match settings.history.provider {
        StoreProvider::Sqlite => Arc::new(SqliteHistoryStore::new(&settings.history_path())?),
        StoreProvider::Memory => Arc::new(MemoryHistoryStore::new()),
    };
    store.ensure_table().await?;
    Ok(store)
}
