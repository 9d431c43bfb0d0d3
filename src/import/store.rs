//! Record stores: find-or-upsert by natural key.
//!
//! `RecordStore` is the seam to the relational database. The in-memory
//! store ships for tests, dry runs and the CLI.

use super::record::ImportRecord;
use crate::error::Result;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// What an upsert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Trait for record persistence.
///
/// # Errors
///
/// Return `Err` for connectivity problems, constraint violations and other
/// write failures. The import job records them as failed rows.
#[allow(async_fn_in_trait)]
pub trait RecordStore<R: ImportRecord>: Send + Sync {
    /// Insert `record`, or replace the row sharing its natural key.
    ///
    /// # Errors
    /// Returns `Err` if the write fails
    async fn upsert(&self, record: R) -> Result<UpsertOutcome>;

    /// # Errors
    /// Returns `Err` if the read fails
    async fn get(&self, key: &R::Key) -> Result<Option<R>>;

    /// # Errors
    /// Returns `Err` if the read fails
    async fn count(&self) -> Result<u64>;
}

/// DashMap-backed store. Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryRecordStore<R: ImportRecord> {
    rows: Arc<DashMap<R::Key, R>>,
}

impl<R: ImportRecord> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        InMemoryRecordStore {
            rows: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of every stored row, in no particular order.
    pub fn snapshot(&self) -> Vec<R> {
        self.rows.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl<R: ImportRecord> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ImportRecord> RecordStore<R> for InMemoryRecordStore<R> {
    async fn upsert(&self, record: R) -> Result<UpsertOutcome> {
        let key = record.natural_key();
        let outcome = match self.rows.insert(key.clone(), record) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        };
        trace!("Upsert {}: {:?}", key, outcome);
        Ok(outcome)
    }

    async fn get(&self, key: &R::Key) -> Result<Option<R>> {
        Ok(self.rows.get(key).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}
