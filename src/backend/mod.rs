//! Cache store implementations.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub mod inmemory;

pub use inmemory::{CacheStats, InMemoryBackend};

/// One stored value with its freshness bookkeeping.
///
/// `bytes` is shared and never mutated; a refresh installs a new entry.
#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub bytes: Arc<[u8]>,
    /// Monotonic creation time, used for staleness checks.
    pub created_at: Instant,
    /// Wall-clock creation time, reported to callers.
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl StoredEntry {
    pub fn new(bytes: Vec<u8>, ttl: Duration) -> Self {
        StoredEntry {
            bytes: bytes.into(),
            created_at: Instant::now(),
            stored_at: Utc::now(),
            ttl,
        }
    }

    /// Fresh while `now - created_at < ttl`.
    pub fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Trait for cache store implementations.
///
/// Stale entries are returned as-is; deciding what to do with them is the
/// caller's job. Nothing is evicted except through `delete` and `clear_all`.
///
/// All methods take `&self`. Implementations use interior mutability so one
/// store can be shared by clones of the cache.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync + Clone {
    /// Entry under `key`, fresh or stale.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be read
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Store `bytes` under `key`, replacing any previous entry.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<StoredEntry>;

    /// Remove one entry.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop every entry.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    async fn clear_all(&self) -> Result<()>;

    /// Entry counts and sizes.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be read
    async fn stats(&self) -> Result<CacheStats>;
}
