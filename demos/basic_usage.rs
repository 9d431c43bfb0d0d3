//! Basic walkthrough: cached accessors, partial failure and a small import.
//!
//! Run with: `cargo run --example basic_usage`

use market_intel::import::{DeveloperMapper, ImportJob, InMemoryRecordStore, Record};
use market_intel::{CounterMetrics, MarketIntelClient, PermitFilters, Result, StaticMarketData};
use market_intel::backend::InMemoryBackend;
use market_intel::CacheConfig;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Market Intel - Basic Example ===\n");

    // 1. Build a client with counters so hits and misses are visible
    println!("1. Creating client over the built-in data set...");
    let metrics = Arc::new(CounterMetrics::new());
    let client = MarketIntelClient::with_metrics(
        StaticMarketData::new(),
        InMemoryBackend::new(),
        Box::new(metrics.clone()),
        CacheConfig::default(),
    );
    println!("   ✓ Client ready\n");

    // 2. First lookup: miss, produced from the source
    println!("2. Neighborhood lookup (cypress):");
    let cypress = client.get_neighborhood_data("cypress").await;
    if let Some(n) = &cypress.data {
        println!(
            "   ✓ {} in {} county, median home ${:.0} (cached: {})\n",
            n.name, n.county, n.median_home_price, cypress.cached
        );
    }

    // 3. The embedded permit lookup primed its own key
    println!("3. Permits for Cypress:");
    let permits = client.get_permit_data(&PermitFilters::location("Cypress")).await;
    println!("   ✓ success: {}, cached: {}\n", permits.success, permits.cached);

    // 4. Second timing lookup is served from the cache
    println!("4. Market timing twice:");
    let first = client.get_market_timing().await;
    let second = client.get_market_timing().await;
    if let Some(timing) = &second.data {
        println!(
            "   ✓ score {} ({}), first cached: {}, second cached: {}\n",
            timing.score, timing.recommendation, first.cached, second.cached
        );
    }

    // 5. Compare several neighborhoods at once
    println!("5. Comparing neighborhoods:");
    let compared = client
        .compare_neighborhoods(&["cypress", "pearland", "memorial"])
        .await;
    for n in compared.data.unwrap_or_default() {
        println!("   - {}: growth {:.1}%", n.name, n.growth_rate);
    }
    println!();

    // 6. Cache counters and store stats
    println!("6. Cache state:");
    println!("   {:?}", metrics.snapshot());
    println!("   {:?}\n", client.stats().await?);

    // 7. Import a handful of developer rows
    println!("7. Importing developers:");
    let rows: Vec<Record> = vec![
        json!({ "Company": "Westin Homes", "Sector": "Builder", "Zip": "77433" }),
        json!({ "Company": "Unknown" }),
        json!({ "Company": "Perry Homes", "Sector": "Builder" }),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();

    let store = InMemoryRecordStore::new();
    let report = ImportJob::new("developers")
        .run(&rows, &DeveloperMapper, &store)
        .await;
    let summary = report.summary();
    println!(
        "   ✓ imported {}, failed {}",
        summary.imported, summary.failed
    );
    for error in &summary.errors {
        println!("   ✗ {}", error);
    }

    // 8. Clear everything
    println!("\n8. Clearing cache:");
    client.clear_cache().await?;
    println!("   ✓ {} entries left\n", client.stats().await?.total_entries);

    Ok(())
}
