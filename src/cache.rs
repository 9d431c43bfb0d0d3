//! Read-through cache - the fetch-with-cache wrapper every accessor goes through.

use crate::backend::{CacheBackend, CacheStats, InMemoryBackend};
use crate::entity::CachePayload;
use crate::error::Result;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy, DEFAULT_TTL};
use crate::response::AgentResponse;
use chrono::Utc;
use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Setup-time configuration for a [`ReadThroughCache`].
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// TTL used when neither the call nor the policy names one.
    pub default_ttl: Duration,

    /// Coalesce concurrent misses on the same key into one producer call.
    ///
    /// When off, overlapping misses each run the producer and the last one
    /// to finish wins the stored value.
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            default_ttl: DEFAULT_TTL,
            coalesce_misses: true,
        }
    }
}

impl CacheConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_misses = enabled;
        self
    }
}

/// Per-call overrides.
///
/// ```
/// use market_intel::cache::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default().with_ttl(Duration::from_secs(300));
/// assert_eq!(options.ttl_override, Some(Duration::from_secs(300)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    /// Takes precedence over the TTL policy and the configured default.
    pub ttl_override: Option<Duration>,
}

impl FetchOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }
}

/// Read-through cache with time-based expiry.
///
/// Constructed and owned by the caller; nothing here is global. Wrap it in an
/// `Arc` (or use [`MarketIntelClient`](crate::client::MarketIntelClient)) to
/// share it.
///
/// # Example
///
/// ```
/// use market_intel::cache::ReadThroughCache;
/// use market_intel::backend::InMemoryBackend;
/// use market_intel::CachePayload;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct ZipMedian(f64);
///
/// impl CachePayload for ZipMedian {
///     fn category() -> &'static str { "zip-median" }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = ReadThroughCache::new(InMemoryBackend::new());
///
/// let first = cache
///     .fetch("zip-77433", || async { Ok::<_, String>(ZipMedian(385_000.0)) })
///     .await;
/// assert!(first.success && !first.cached);
///
/// let second = cache
///     .fetch("zip-77433", || async { Err::<ZipMedian, _>("not called") })
///     .await;
/// assert!(second.cached);
/// # }
/// ```
pub struct ReadThroughCache<B: CacheBackend = InMemoryBackend> {
    backend: B,
    metrics: Box<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    config: CacheConfig,
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl<B: CacheBackend> ReadThroughCache<B> {
    /// Create a cache over the given store.
    pub fn new(backend: B) -> Self {
        ReadThroughCache {
            backend,
            metrics: Box::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
            config: CacheConfig::default(),
            gates: DashMap::new(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    /// TTL for a payload type: call override, then policy, then default.
    pub fn resolve_ttl<T: CachePayload>(&self, options: &FetchOptions) -> Duration {
        options
            .ttl_override
            .or_else(|| self.ttl_policy.get_ttl(T::category()))
            .unwrap_or(self.config.default_ttl)
    }

    /// Fetch `key`, running `producer` only when no fresh entry exists.
    ///
    /// Never fails: a producer error comes back as an unsuccessful
    /// [`AgentResponse`] and leaves the store untouched, so the next call
    /// retries.
    pub async fn fetch<T, F, Fut, E>(&self, key: &str, producer: F) -> AgentResponse<T>
    where
        T: CachePayload,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        self.fetch_with(key, FetchOptions::default(), producer).await
    }

    /// [`fetch`](Self::fetch) with per-call overrides.
    pub async fn fetch_with<T, F, Fut, E>(
        &self,
        key: &str,
        options: FetchOptions,
        producer: F,
    ) -> AgentResponse<T>
    where
        T: CachePayload,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let timer = Instant::now();
        let ttl = self.resolve_ttl::<T>(&options);

        if let Some(hit) = self.lookup_fresh::<T>(key).await {
            self.metrics.record_hit(key, timer.elapsed());
            return hit;
        }

        if !self.config.coalesce_misses {
            return self.refresh(key, ttl, producer, timer).await;
        }

        let gate = self.gates.entry(key.to_string()).or_insert_with(Default::default).clone();
        let guard = match gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.metrics.record_coalesced(key);
                gate.lock().await
            }
        };

        // Whoever held the gate may have stored the value already
        let response = match self.lookup_fresh::<T>(key).await {
            Some(hit) => {
                self.metrics.record_hit(key, timer.elapsed());
                hit
            }
            None => self.refresh(key, ttl, producer, timer).await,
        };

        drop(guard);
        drop(gate);
        self.gates.remove_if(key, |_, g| Arc::strong_count(g) == 1);

        response
    }

    /// Drop every entry. The next access to any key runs its producer.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be cleared
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear_all().await
    }

    /// Drop one entry.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    /// # Errors
    /// Returns `Err` if the store cannot be read
    pub async fn stats(&self) -> Result<CacheStats> {
        self.backend.stats().await
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn lookup_fresh<T: CachePayload>(&self, key: &str) -> Option<AgentResponse<T>> {
        let entry = match self.backend.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if !entry.is_fresh() {
            debug!("Entry {} is stale (age {:?}, ttl {:?})", key, entry.age(), entry.ttl);
            return None;
        }

        match T::deserialize_from_cache(&entry.bytes) {
            Ok(value) => Some(AgentResponse::hit(value, entry.stored_at, entry.ttl)),
            Err(e) => {
                warn!("Ignoring undecodable entry {}: {}", key, e);
                None
            }
        }
    }

    async fn refresh<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
        timer: Instant,
    ) -> AgentResponse<T>
    where
        T: CachePayload,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        self.metrics.record_miss(key, timer.elapsed());

        let value = match producer().await {
            Ok(value) => value,
            Err(e) => {
                let message = e.to_string();
                self.metrics.record_error(key, &message);
                return AgentResponse::failure(message);
            }
        };

        if let Err(e) = value.validate() {
            let message = e.to_string();
            self.metrics.record_error(key, &message);
            return AgentResponse::failure(message);
        }

        let bytes = match value.serialize_for_cache() {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = e.to_string();
                self.metrics.record_error(key, &message);
                return AgentResponse::failure(message);
            }
        };

        match self.backend.set(key, bytes, ttl).await {
            Ok(entry) => {
                self.metrics.record_set(key, timer.elapsed());
                AgentResponse::fresh(value, entry.stored_at, ttl)
            }
            Err(e) => {
                // The value is still good; only later callers lose the cache
                warn!("Cache write failed for {}: {}", key, e);
                AgentResponse::fresh(value, Utc::now(), ttl)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::observability::CounterMetrics;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Listing {
        zip: String,
        price: f64,
    }

    impl CachePayload for Listing {
        fn category() -> &'static str {
            "listing"
        }
    }

    fn listing(price: f64) -> Listing {
        Listing {
            zip: "77479".to_string(),
            price,
        }
    }

    async fn counted(calls: &AtomicUsize, price: f64) -> std::result::Result<Listing, Error> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(listing(price))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = ReadThroughCache::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);

        let first = cache.fetch("listing-1", || counted(&calls, 1.0)).await;
        assert!(first.success);
        assert!(!first.cached);
        assert_eq!(first.ttl, Some(DEFAULT_TTL));

        let second = cache.fetch("listing-1", || counted(&calls, 2.0)).await;
        assert!(second.cached);
        assert_eq!(second.data, first.data);
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_reinvokes_producer() {
        let cache = ReadThroughCache::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);
        let options = FetchOptions::default().with_ttl(Duration::from_secs(60));

        cache
            .fetch_with("listing-1", options.clone(), || counted(&calls, 1.0))
            .await;

        tokio::time::advance(Duration::from_secs(59)).await;
        let hit = cache
            .fetch_with("listing-1", options.clone(), || counted(&calls, 2.0))
            .await;
        assert!(hit.cached);

        tokio::time::advance(Duration::from_secs(1)).await;
        let refreshed = cache
            .fetch_with("listing-1", options, || counted(&calls, 3.0))
            .await;
        assert!(!refreshed.cached);
        assert_eq!(refreshed.data, Some(listing(3.0)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_store_untouched() {
        let backend = InMemoryBackend::new();
        let cache = ReadThroughCache::new(backend.clone());

        let failed = cache
            .fetch("listing-1", || async {
                Err::<Listing, _>(Error::SourceError("feed offline".to_string()))
            })
            .await;
        assert!(!failed.success);
        assert_eq!(failed.data, None);
        assert_eq!(failed.error.as_deref(), Some("Source error: feed offline"));
        assert!(backend.is_empty());

        let calls = AtomicUsize::new(0);
        let retried = cache.fetch("listing-1", || counted(&calls, 1.0)).await;
        assert!(retried.success);
        assert!(!retried.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_entry() {
        let backend = InMemoryBackend::new();
        let cache = ReadThroughCache::new(backend.clone());
        let options = FetchOptions::default().with_ttl(Duration::from_secs(10));
        let calls = AtomicUsize::new(0);

        cache
            .fetch_with("listing-1", options.clone(), || counted(&calls, 1.0))
            .await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let failed = cache
            .fetch_with("listing-1", options, || async {
                Err::<Listing, _>("timeout")
            })
            .await;
        assert!(!failed.success);

        let entry = backend.get("listing-1").await.unwrap().unwrap();
        assert!(!entry.is_fresh());
        assert_eq!(
            Listing::deserialize_from_cache(&entry.bytes).unwrap(),
            listing(1.0)
        );
    }

    #[tokio::test]
    async fn test_ttl_resolution_order() {
        let cache = ReadThroughCache::new(InMemoryBackend::new())
            .with_config(CacheConfig::default().with_default_ttl(Duration::from_secs(5)));
        assert_eq!(
            cache.resolve_ttl::<Listing>(&FetchOptions::default()),
            Duration::from_secs(5)
        );

        let cache = cache.with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(50)));
        assert_eq!(
            cache.resolve_ttl::<Listing>(&FetchOptions::default()),
            Duration::from_secs(50)
        );
        assert_eq!(
            cache.resolve_ttl::<Listing>(&FetchOptions::default().with_ttl(Duration::from_secs(500))),
            Duration::from_secs(500)
        );
    }

    #[tokio::test]
    async fn test_category_policy_falls_back_to_default_ttl() {
        let cache = ReadThroughCache::new(InMemoryBackend::new())
            .with_ttl_policy(TtlPolicy::market_defaults())
            .with_config(CacheConfig::default().with_default_ttl(Duration::from_secs(90)));

        // `Listing` has no entry in the market table
        assert_eq!(
            cache.resolve_ttl::<Listing>(&FetchOptions::default()),
            Duration::from_secs(90)
        );
    }

    #[tokio::test]
    async fn test_clear_forces_refresh() {
        let cache = ReadThroughCache::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);

        cache.fetch("a", || counted(&calls, 1.0)).await;
        cache.fetch("b", || counted(&calls, 1.0)).await;
        cache.clear().await.expect("Failed to clear");

        let again = cache.fetch("a", || counted(&calls, 1.0)).await;
        assert!(!again.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let cache = ReadThroughCache::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);

        cache.fetch("a", || counted(&calls, 1.0)).await;
        cache.fetch("b", || counted(&calls, 1.0)).await;
        cache.invalidate("a").await.unwrap();

        assert!(!cache.fetch("a", || counted(&calls, 1.0)).await.cached);
        assert!(cache.fetch("b", || counted(&calls, 1.0)).await.cached);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_refreshed() {
        let backend = InMemoryBackend::new();
        backend
            .set("listing-1", b"garbage".to_vec(), DEFAULT_TTL)
            .await
            .unwrap();

        let cache = ReadThroughCache::new(backend);
        let calls = AtomicUsize::new(0);
        let response = cache.fetch("listing-1", || counted(&calls, 9.0)).await;

        assert!(response.success);
        assert!(!response.cached);
        assert_eq!(response.data, Some(listing(9.0)));
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let metrics = Arc::new(CounterMetrics::new());
        let cache = Arc::new(
            ReadThroughCache::new(InMemoryBackend::new()).with_metrics(Box::new(metrics.clone())),
        );
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .fetch("listing-1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, Error>(listing(1.0))
                    })
                    .await
            }));
        }

        let mut cached = 0;
        for handle in handles {
            let response = handle.await.expect("Task failed");
            assert!(response.success);
            if response.cached {
                cached += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached, 7);
        assert_eq!(metrics.snapshot().sets, 1);
        assert!(cache.gates.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_race_without_coalescing() {
        let cache = Arc::new(
            ReadThroughCache::new(InMemoryBackend::new())
                .with_config(CacheConfig::default().with_coalescing(false)),
        );
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..4 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .fetch("listing-1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, Error>(listing(1.0))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert!(!handle.await.expect("Task failed").cached);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
