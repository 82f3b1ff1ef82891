//! SQLite-based knowledge base.
//!
//! Embeddings are stored as little-endian f32 blobs and the distance is
//! computed in Rust over a full scan.

use super::{check_source, closest, Chunk, IndexedSource, KnowledgeBase, Retrieved};
use crate::error::{PeonError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// SQLite-based knowledge base.
pub struct SqliteKnowledgeBase {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeBase {
    /// Open (or create) a knowledge base at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite knowledge base at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory knowledge base (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PeonError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn insert_on(conn: &Connection, chunk: &Chunk) -> Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks (id, source, content, embedding, chunk_order, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                chunk.id.to_string(),
                chunk.source,
                chunk.content,
                Self::embedding_to_bytes(&chunk.embedding),
                chunk.chunk_order,
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl KnowledgeBase for SqliteKnowledgeBase {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<usize> {
        check_source(source, chunks)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let replaced = tx.execute("DELETE FROM chunks WHERE source = ?1", params![source])?;
        for chunk in chunks {
            Self::insert_on(&tx, chunk)?;
        }

        tx.commit()?;
        info!("Indexed {} chunks for {} (replaced {})", chunks.len(), source, replaced);
        Ok(replaced)
    }

    #[instrument(skip(self, query_embedding))]
    async fn nearest(&self, query_embedding: &[f32]) -> Result<Option<Retrieved>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, source, content, embedding, chunk_order, indexed_at
            FROM chunks
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(3)?;
            let indexed_at_str: String = row.get(5)?;

            Ok(Chunk {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                source: row.get(1)?,
                content: row.get(2)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                chunk_order: row.get(4)?,
                indexed_at: parse_time(&indexed_at_str),
            })
        })?;

        let chunks = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        let best = closest(query_embedding, chunks);

        if let Some(b) = &best {
            debug!("Nearest chunk {} at distance {:.4}", b.chunk.id, b.distance);
        }
        Ok(best)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM chunks
            GROUP BY source
            ORDER BY indexed_at DESC
            "#,
        )?;

        let sources = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(2)?;
            Ok(IndexedSource {
                source: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: parse_time(&indexed_at_str),
            })
        })?;

        Ok(sources.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
