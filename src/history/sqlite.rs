//! SQLite-based history store.
//!
//! All statements are parameterized. Each append is a single INSERT, and the
//! connection mutex serializes concurrent writers.

use super::{HistoryRecord, HistoryRow, HistoryScope, HistoryStore};
use crate::error::{PeonError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        user_name TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chat_history_user_name ON chat_history(user_name);
"#;

/// SQLite-based history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open a history database at the given path. Call
    /// [`HistoryStore::ensure_table`] before the first write.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        info!("Opened SQLite history store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory history store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PeonError::History(format!("Failed to acquire lock: {}", e)))
    }
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn admin_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    let timestamp: String = row.get(4)?;
    Ok(HistoryRow {
        session_id: Some(row.get(0)?),
        user_name: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    let timestamp: String = row.get(3)?;
    Ok(HistoryRow {
        session_id: None,
        user_name: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn ensure_table(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(())
    }

    #[instrument(skip(self, record), fields(session_id = %record.session_id, user = %record.user_name))]
    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            r#"
            INSERT INTO chat_history (session_id, user_name, question, answer, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.session_id,
                record.user_name,
                record.question,
                record.answer,
                record.timestamp.to_rfc3339(),
            ],
        )?;

        if inserted != 1 {
            return Err(PeonError::History(format!("Expected 1 inserted row, got {}", inserted)));
        }

        debug!("Appended history record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query(&self, scope: &HistoryScope) -> Result<Vec<HistoryRow>> {
        let conn = self.lock()?;

        let rows = match scope {
            HistoryScope::All => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT session_id, user_name, question, answer, timestamp
                    FROM chat_history
                    ORDER BY id
                    "#,
                )?;
                let rows = stmt.query_map([], admin_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            HistoryScope::User(user_name) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT user_name, question, answer, timestamp
                    FROM chat_history
                    WHERE user_name = ?1
                    ORDER BY id
                    "#,
                )?;
                let rows = stmt.query_map(params![user_name], user_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        debug!("History query returned {} rows", rows.len());
        Ok(rows)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
