//! Metrics hooks and TTL policies for the read-through cache.
//!
//! # Metrics
//!
//! Implement [`CacheMetrics`] to feed hit/miss/refresh counts into your
//! monitoring system. [`NoOpMetrics`] is the default. [`CounterMetrics`]
//! keeps in-process atomic counters.
//!
//! # TTL Policies
//!
//! ```
//! use market_intel::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! let policy = TtlPolicy::market_defaults();
//! assert_eq!(policy.get_ttl("market-timing"), Some(Duration::from_secs(30 * 60)));
//! assert_eq!(policy.get_ttl("permits"), Some(Duration::from_secs(6 * 60 * 60)));
//! ```
//!
//! | Category | TTL |
//! |----------|-----|
//! | `market-timing` | 30 minutes |
//! | `investment-opportunities` | 2 hours |
//! | `permits` | 6 hours |
//! | anything else | the cache's `default_ttl` (1 hour) |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One hour, the fallback TTL for every category.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Fresh entry served without calling the producer.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Entry absent or stale; the producer is about to run.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Producer succeeded and its value was stored.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Caller waited on another in-flight fetch for the same key.
    fn record_coalesced(&self, key: &str) {
        debug!("Cache COALESCED: {}", key);
    }

    /// Producer failed.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_coalesced(&self, _key: &str) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Atomic counters for every cache event.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    coalesced: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CounterMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub coalesced: u64,
    pub errors: u64,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for CounterMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, _key: &str, _duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_set(&self, _key: &str, _duration: Duration) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    fn record_coalesced(&self, _key: &str) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, key: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Lets a shared counter be handed to the cache while the caller keeps a handle.
impl<M: CacheMetrics + ?Sized> CacheMetrics for std::sync::Arc<M> {
    fn record_hit(&self, key: &str, duration: Duration) {
        (**self).record_hit(key, duration)
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        (**self).record_miss(key, duration)
    }

    fn record_set(&self, key: &str, duration: Duration) {
        (**self).record_set(key, duration)
    }

    fn record_coalesced(&self, key: &str) {
        (**self).record_coalesced(key)
    }

    fn record_error(&self, key: &str, error: &str) {
        (**self).record_error(key, error)
    }
}

/// TTL (time-to-live) policy keyed by payload category.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// Defer to the cache's configured default TTL
    #[default]
    Default,

    /// Same duration for every category
    Fixed(Duration),

    /// Custom per-category policy; `None` defers to the cache default
    PerCategory(fn(&str) -> Option<Duration>),
}

impl TtlPolicy {
    /// TTLs used by the market data accessors.
    pub fn market_defaults() -> Self {
        TtlPolicy::PerCategory(market_category_ttl)
    }

    /// Get TTL for a category. `None` means "use the cache default".
    pub fn get_ttl(&self, category: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::PerCategory(f) => f(category),
        }
    }
}

/// Categories without an entry use the cache's `default_ttl`.
fn market_category_ttl(category: &str) -> Option<Duration> {
    match category {
        crate::key::keys::MARKET_TIMING => Some(Duration::from_secs(30 * 60)),
        crate::key::keys::INVESTMENT_OPPORTUNITIES => Some(Duration::from_secs(2 * 60 * 60)),
        crate::key::keys::PERMITS => Some(Duration::from_secs(6 * 60 * 60)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_hit("key", Duration::from_secs(1));
        metrics.record_miss("key", Duration::from_secs(2));
        metrics.record_error("key", "boom");
    }

    #[test]
    fn test_counter_metrics() {
        let metrics = CounterMetrics::new();
        metrics.record_hit("a", Duration::ZERO);
        metrics.record_hit("a", Duration::ZERO);
        metrics.record_miss("b", Duration::ZERO);
        metrics.record_set("b", Duration::ZERO);
        metrics.record_coalesced("b");
        metrics.record_error("c", "boom");

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                hits: 2,
                misses: 1,
                sets: 1,
                coalesced: 1,
                errors: 1,
            }
        );
    }

    #[test]
    fn test_ttl_policy_default() {
        assert_eq!(TtlPolicy::Default.get_ttl("any"), None);
    }

    #[test]
    fn test_ttl_policy_fixed() {
        let policy = TtlPolicy::Fixed(Duration::from_secs(300));
        assert_eq!(policy.get_ttl("any"), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_market_defaults() {
        let policy = TtlPolicy::market_defaults();
        assert_eq!(
            policy.get_ttl("investment-opportunities"),
            Some(Duration::from_secs(7200))
        );
        assert_eq!(policy.get_ttl("market-metrics"), None);
        assert_eq!(policy.get_ttl("neighborhood"), None);
        assert_eq!(policy.get_ttl("permits"), Some(Duration::from_secs(21600)));
    }
}
