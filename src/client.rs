//! Cached market intelligence accessors.
//!
//! Wraps a [`MarketDataSource`] and a [`ReadThroughCache`] in `Arc`s so the
//! client can be cloned into request handlers and spawned tasks.

use crate::backend::{CacheBackend, CacheStats, InMemoryBackend};
use crate::cache::{CacheConfig, ReadThroughCache};
use crate::error::{Error, Result};
use crate::key::{keys, CacheKeyBuilder};
use crate::models::*;
use crate::observability::{CacheMetrics, TtlPolicy};
use crate::response::AgentResponse;
use crate::source::{MarketDataSource, StaticMarketData};
use futures::future::join_all;
use std::sync::Arc;

/// Market data client with a shared read-through cache.
///
/// # Example
///
/// ```
/// use market_intel::MarketIntelClient;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = MarketIntelClient::with_static_data();
///
/// let timing = client.get_market_timing().await;
/// assert!(timing.success && !timing.cached);
///
/// let again = client.get_market_timing().await;
/// assert!(again.cached);
/// # }
/// ```
pub struct MarketIntelClient<D: MarketDataSource, B: CacheBackend = InMemoryBackend> {
    source: Arc<D>,
    cache: Arc<ReadThroughCache<B>>,
}

impl<D: MarketDataSource, B: CacheBackend> Clone for MarketIntelClient<D, B> {
    fn clone(&self) -> Self {
        MarketIntelClient {
            source: self.source.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl MarketIntelClient<StaticMarketData> {
    /// Client over the built-in data set with an in-memory store and the
    /// market TTL table.
    pub fn with_static_data() -> Self {
        Self::new(StaticMarketData::new(), InMemoryBackend::new())
    }
}

impl<D: MarketDataSource, B: CacheBackend> MarketIntelClient<D, B> {
    /// Create a client using [`TtlPolicy::market_defaults`].
    pub fn new(source: D, backend: B) -> Self {
        Self::from_parts(source, ReadThroughCache::new(backend))
    }

    /// Create a client around a configured cache.
    ///
    /// A cache still on [`TtlPolicy::Default`] gets the market TTL table;
    /// any other policy is kept as given.
    pub fn from_parts(source: D, cache: ReadThroughCache<B>) -> Self {
        let cache = if matches!(cache.ttl_policy(), TtlPolicy::Default) {
            cache.with_ttl_policy(TtlPolicy::market_defaults())
        } else {
            cache
        };
        MarketIntelClient {
            source: Arc::new(source),
            cache: Arc::new(cache),
        }
    }

    /// Create a client with custom metrics and cache configuration.
    pub fn with_metrics(
        source: D,
        backend: B,
        metrics: Box<dyn CacheMetrics>,
        config: CacheConfig,
    ) -> Self {
        let cache = ReadThroughCache::new(backend)
            .with_ttl_policy(TtlPolicy::market_defaults())
            .with_metrics(metrics)
            .with_config(config);
        Self::from_parts(source, cache)
    }

    /// Neighborhood profile keyed `neighborhood-{slug}`.
    ///
    /// Unknown slugs get the fallback profile. The embedded market metrics
    /// and permit activity come through their own cached accessors; when
    /// either fails the field is `None` and the profile is still returned.
    pub async fn get_neighborhood_data(&self, slug: &str) -> AgentResponse<NeighborhoodData> {
        let key = CacheKeyBuilder::build_with_prefix(keys::NEIGHBORHOOD, &slug);
        self.cache
            .fetch(&key, || async {
                let mut data = self.source.neighborhood(slug).await?;
                data.market_metrics = self.get_market_metrics().await.into_data();
                data.permit_data = self
                    .get_permit_data(&PermitFilters::location(data.name.clone()))
                    .await
                    .into_data();
                Ok::<_, Error>(data)
            })
            .await
    }

    pub async fn get_market_metrics(&self) -> AgentResponse<MarketMetrics> {
        self.cache
            .fetch(keys::MARKET_METRICS, || self.source.market_metrics())
            .await
    }

    /// Timing score and recommendation. Cached for 30 minutes.
    pub async fn get_market_timing(&self) -> AgentResponse<MarketTiming> {
        self.cache
            .fetch(keys::MARKET_TIMING, || self.source.market_timing())
            .await
    }

    /// Cached for 2 hours.
    pub async fn get_investment_opportunities(&self) -> AgentResponse<Vec<InvestmentOpportunity>> {
        self.cache
            .fetch(keys::INVESTMENT_OPPORTUNITIES, || {
                self.source.investment_opportunities()
            })
            .await
    }

    pub async fn get_property_analysis(&self, address: &str) -> AgentResponse<PropertyAnalysis> {
        let key = CacheKeyBuilder::build_with_prefix(keys::PROPERTY, &address);
        self.cache
            .fetch(&key, || self.source.property_analysis(address))
            .await
    }

    /// Permit activity keyed `permits-{location}-{type}`, absent filters
    /// reading `all`. Cached for 6 hours.
    pub async fn get_permit_data(&self, filters: &PermitFilters) -> AgentResponse<PermitActivity> {
        let key = CacheKeyBuilder::build_filtered(
            keys::PERMITS,
            &[filters.location.as_deref(), filters.permit_type.as_deref()],
        );
        self.cache
            .fetch(&key, || self.source.permit_activity(filters))
            .await
    }

    pub async fn get_weekly_market_report(&self) -> AgentResponse<MarketReport> {
        self.cache
            .fetch(keys::WEEKLY_MARKET_REPORT, || {
                self.source.weekly_market_report()
            })
            .await
    }

    /// Fetch several neighborhoods concurrently and merge the results.
    ///
    /// `success` only if every fetch succeeded, `cached` if any was served
    /// from the cache. Failed slugs are dropped from `data`.
    pub async fn compare_neighborhoods<S: AsRef<str>>(
        &self,
        slugs: &[S],
    ) -> AgentResponse<Vec<NeighborhoodData>> {
        let responses = join_all(
            slugs
                .iter()
                .map(|slug| self.get_neighborhood_data(slug.as_ref())),
        )
        .await;
        AgentResponse::merge(responses)
    }

    /// Drop every cached entry.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be cleared
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await
    }

    /// Drop one cached entry by key.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await
    }

    /// # Errors
    /// Returns `Err` if the store cannot be read
    pub async fn stats(&self) -> Result<CacheStats> {
        self.cache.stats().await
    }

    /// Get a reference to the underlying cache.
    pub fn cache(&self) -> &ReadThroughCache<B> {
        &self.cache
    }

    pub fn source(&self) -> &D {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Static data with call counting and a switchable outage.
    #[derive(Default)]
    struct CountingSource {
        inner: StaticMarketData,
        calls: AtomicUsize,
        offline: AtomicBool,
    }

    impl CountingSource {
        fn hit(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::SourceError("upstream offline".to_string()));
            }
            Ok(())
        }
    }

    impl MarketDataSource for CountingSource {
        async fn neighborhood(&self, slug: &str) -> Result<NeighborhoodData> {
            self.hit()?;
            self.inner.neighborhood(slug).await
        }

        async fn market_metrics(&self) -> Result<MarketMetrics> {
            self.hit()?;
            self.inner.market_metrics().await
        }

        async fn market_timing(&self) -> Result<MarketTiming> {
            self.hit()?;
            self.inner.market_timing().await
        }

        async fn investment_opportunities(&self) -> Result<Vec<InvestmentOpportunity>> {
            self.hit()?;
            self.inner.investment_opportunities().await
        }

        async fn property_analysis(&self, address: &str) -> Result<PropertyAnalysis> {
            self.hit()?;
            self.inner.property_analysis(address).await
        }

        async fn permit_activity(&self, filters: &PermitFilters) -> Result<PermitActivity> {
            self.hit()?;
            self.inner.permit_activity(filters).await
        }

        async fn weekly_market_report(&self) -> Result<MarketReport> {
            self.hit()?;
            self.inner.weekly_market_report().await
        }
    }

    fn client() -> MarketIntelClient<CountingSource> {
        MarketIntelClient::new(CountingSource::default(), InMemoryBackend::new())
    }

    #[tokio::test]
    async fn test_market_timing_served_from_cache() {
        let client = client();

        let first = client.get_market_timing().await;
        assert!(first.success);
        assert!(!first.cached);
        assert_eq!(first.ttl, Some(Duration::from_secs(1800)));

        let second = client.get_market_timing().await;
        assert!(second.cached);
        assert_eq!(second.data, first.data);
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_data_expires_after_six_hours() {
        let client = client();
        let filters = PermitFilters::location("Katy");

        let first = client.get_permit_data(&filters).await;
        assert_eq!(first.ttl, Some(Duration::from_secs(6 * 3600)));

        tokio::time::advance(Duration::from_secs(6 * 3600 + 1)).await;
        let second = client.get_permit_data(&filters).await;
        assert!(second.success);
        assert!(!second.cached);
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_opportunities_not_cached() {
        let client = client();
        client.source().offline.store(true, Ordering::SeqCst);

        let failed = client.get_investment_opportunities().await;
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert_eq!(failed.error.as_deref(), Some("Source error: upstream offline"));

        client.source().offline.store(false, Ordering::SeqCst);
        let recovered = client.get_investment_opportunities().await;
        assert!(recovered.success);
        assert!(!recovered.cached);
        assert_eq!(recovered.data.map(|d| d.len()), Some(2));
    }

    #[tokio::test]
    async fn test_clear_cache_after_priming() {
        let client = client();
        client.get_market_metrics().await;
        client.get_market_timing().await;
        client.get_weekly_market_report().await;

        client.clear_cache().await.expect("Failed to clear");

        assert!(!client.get_market_metrics().await.cached);
        assert!(!client.get_market_timing().await.cached);
        assert!(!client.get_weekly_market_report().await.cached);
    }

    #[tokio::test]
    async fn test_neighborhood_embeds_cached_metrics_and_permits() {
        let client = client();
        let response = client.get_neighborhood_data("pearland").await;
        let data = response.data.expect("Neighborhood not found");

        assert!(data.market_metrics.is_some());
        assert!(data.permit_data.is_some());

        // Both embedded lookups landed under their own keys
        assert!(client.get_market_metrics().await.cached);
        assert!(
            client
                .get_permit_data(&PermitFilters::location("Pearland"))
                .await
                .cached
        );
    }

    #[tokio::test]
    async fn test_permit_keys_fill_missing_filters() {
        let client = client();
        client.get_permit_data(&PermitFilters::default()).await;
        let entry = client.cache().backend().get("permits-all-all").await.unwrap();
        assert!(entry.is_some());
    }

    #[tokio::test]
    async fn test_compare_neighborhoods_flags() {
        let client = client();
        client.get_neighborhood_data("memorial").await;

        let compared = client.compare_neighborhoods(&["memorial", "spring"]).await;
        assert!(compared.success);
        assert!(compared.cached);
        assert_eq!(compared.ttl, None);
        let names: Vec<_> = compared
            .data
            .expect("No data")
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Memorial", "Spring"]);
    }

    #[tokio::test]
    async fn test_compare_neighborhoods_partial_failure() {
        let client = client();
        client.get_neighborhood_data("memorial").await;
        client.source().offline.store(true, Ordering::SeqCst);

        let compared = client.compare_neighborhoods(&["memorial", "spring"]).await;
        assert!(!compared.success);
        assert!(compared.cached);
        assert_eq!(compared.data.map(|d| d.len()), Some(1));
        assert!(compared.error.is_some());
    }

    #[tokio::test]
    async fn test_from_parts_applies_market_ttls() {
        let client = MarketIntelClient::from_parts(
            CountingSource::default(),
            ReadThroughCache::new(InMemoryBackend::new()),
        );
        assert_eq!(
            client.get_market_timing().await.ttl,
            Some(Duration::from_secs(30 * 60))
        );
        assert_eq!(
            client.get_investment_opportunities().await.ttl,
            Some(Duration::from_secs(2 * 3600))
        );
        assert_eq!(
            client.get_permit_data(&PermitFilters::default()).await.ttl,
            Some(Duration::from_secs(6 * 3600))
        );
        assert_eq!(
            client.get_market_metrics().await.ttl,
            Some(Duration::from_secs(3600))
        );

        let fixed = MarketIntelClient::from_parts(
            CountingSource::default(),
            ReadThroughCache::new(InMemoryBackend::new())
                .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(60))),
        );
        assert_eq!(
            fixed.get_market_timing().await.ttl,
            Some(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_client_clone_shares_cache() {
        let a = client();
        let b = a.clone();
        a.get_market_metrics().await;
        assert!(b.get_market_metrics().await.cached);
        assert!(Arc::ptr_eq(&a.cache, &b.cache));
    }

    #[tokio::test]
    async fn test_client_thread_safety() {
        let client = MarketIntelClient::with_static_data();
        let mut handles = vec![];

        for slug in ["cypress", "heights", "bellaire"] {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                client.get_neighborhood_data(slug).await
            }));
        }

        for handle in handles {
            assert!(handle.await.expect("Task failed").success);
        }
        assert!(client.stats().await.unwrap().total_entries >= 3);
    }
}
