//! # market-intel
//!
//! Cached market intelligence for Houston-area development, plus the batch
//! import that loads city open-data exports into a record store.
//!
//! ## Features
//!
//! - **Read-through cache:** every accessor goes through
//!   [`ReadThroughCache::fetch`], which serves fresh entries and refreshes
//!   stale ones from a producer
//! - **Per-category TTLs:** market timing 30 minutes, investment
//!   opportunities 2 hours, permits 6 hours, everything else 1 hour
//! - **Single-flight:** concurrent misses on one key run the producer once
//! - **Never throws:** producer failures come back as unsuccessful
//!   [`AgentResponse`]s and are never cached
//! - **Batch import:** lenient cell coercion, upsert by natural key and a
//!   per-row failure report
//!
//! ## Quick Start
//!
//! ```
//! use market_intel::{MarketIntelClient, PermitFilters};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Explicitly constructed; clone it to share
//! let client = MarketIntelClient::with_static_data();
//!
//! let cypress = client.get_neighborhood_data("cypress").await;
//! assert!(cypress.success);
//!
//! let permits = client
//!     .get_permit_data(&PermitFilters::location("Cypress"))
//!     .await;
//! assert!(permits.cached); // primed by the neighborhood lookup
//!
//! let compared = client.compare_neighborhoods(&["cypress", "pearland"]).await;
//! assert_eq!(compared.data.map(|d| d.len()), Some(2));
//! # }
//! ```
//!
//! ## Caching Your Own Data
//!
//! Anything implementing [`CachePayload`] can go through the cache:
//!
//! ```
//! use market_intel::{CachePayload, ReadThroughCache};
//! use market_intel::backend::InMemoryBackend;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct RentIndex {
//!     zip: String,
//!     index: f64,
//! }
//!
//! impl CachePayload for RentIndex {
//!     fn category() -> &'static str { "rent-index" }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = ReadThroughCache::new(InMemoryBackend::new());
//! let response = cache
//!     .fetch("rent-index-77006", || async {
//!         Ok::<_, market_intel::Error>(RentIndex { zip: "77006".into(), index: 1.04 })
//!     })
//!     .await;
//! assert!(response.success);
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod client;
pub mod entity;
pub mod error;
pub mod import;
pub mod key;
pub mod models;
pub mod observability;
pub mod response;
pub mod serialization;
pub mod source;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use cache::{CacheConfig, FetchOptions, ReadThroughCache};
pub use client::MarketIntelClient;
pub use entity::CachePayload;
pub use error::{Error, Result};
pub use models::PermitFilters;
pub use observability::{CacheMetrics, CounterMetrics, TtlPolicy};
pub use response::AgentResponse;
pub use source::{MarketDataSource, StaticMarketData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
