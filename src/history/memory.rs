//! In-memory history store.
//!
//! Useful for testing and throwaway sessions.

use super::{HistoryRecord, HistoryRow, HistoryScope, HistoryStore};
use crate::error::{PeonError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory history store.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> PeonError {
        PeonError::History(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn ensure_table(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        self.records.write().map_err(Self::poisoned)?.push(record.clone());
        Ok(())
    }

    async fn query(&self, scope: &HistoryScope) -> Result<Vec<HistoryRow>> {
        let records = self.records.read().map_err(Self::poisoned)?;
        Ok(records.iter().filter_map(|r| scope.project(r)).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().map_err(Self::poisoned)?.len())
    }
}
