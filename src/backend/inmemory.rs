//! In-memory cache store (default, thread-safe, async).
//!
//! Uses DashMap for concurrent access with per-key sharding. Entries are
//! kept until overwritten or cleared; staleness is judged by the reader.

use super::{CacheBackend, StoredEntry};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Thread-safe in-memory cache store.
///
/// Cloning is cheap and every clone shares the same map. Size is unbounded:
/// parameterized keys (one per address, one per slug) accumulate until
/// [`clear_all`](CacheBackend::clear_all).
///
/// # Example
///
/// ```no_run
/// use market_intel::backend::{CacheBackend, InMemoryBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///     backend.set("market-metrics", b"payload".to_vec(), Duration::from_secs(3600)).await?;
///
///     let entry = backend.get("market-metrics").await?.expect("stored");
///     assert!(entry.is_fresh());
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, StoredEntry>>,
}

impl InMemoryBackend {
    /// Create a new, empty store.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Print cache statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.snapshot();
        debug!(
            "Cache Stats: {} entries ({} stale), {} bytes",
            stats.total_entries, stats.stale_entries, stats.total_bytes
        );
    }

    fn snapshot(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.store.iter() {
            stats.total_entries += 1;
            stats.total_bytes += entry.bytes.len();
            if !entry.is_fresh() {
                stats.stale_entries += 1;
            }
        }
        stats
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let found = self.store.get(key).map(|entry| entry.value().clone());
        match &found {
            Some(entry) if entry.is_fresh() => debug!("✓ InMemory GET {} -> FRESH", key),
            Some(_) => debug!("✓ InMemory GET {} -> STALE", key),
            None => debug!("✓ InMemory GET {} -> ABSENT", key),
        }
        Ok(found)
    }

    async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<StoredEntry> {
        let entry = StoredEntry::new(bytes, ttl);
        self.store.insert(key.to_string(), entry.clone());
        debug!("✓ InMemory SET {} (TTL: {:?})", key, ttl);
        Ok(entry)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.store.clear();
        warn!("⚠ InMemory CLEAR_ALL executed - all cache cleared!");
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(self.snapshot())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub stale_entries: usize,
    pub total_bytes: usize,
}
