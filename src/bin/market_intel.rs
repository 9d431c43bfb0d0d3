//! Command-line front end: run imports and inspect cached accessors.

use clap::{Parser, Subcommand, ValueEnum};
use market_intel::backend::InMemoryBackend;
use market_intel::import::{
    load_records, AreaMetricMapper, DeveloperMapper, ErrorPolicy, HoustonPDataImporter,
    ImportConfig, ImportJob, ImportReport, InMemoryRecordStore, PropertyDefaults,
};
use market_intel::{CacheConfig, CounterMetrics, MarketIntelClient, PermitFilters, StaticMarketData};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Houston market intelligence: cached data accessors and open-data import
#[derive(Parser, Debug)]
#[command(name = "market-intel")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the five Houston P-data property exports from a directory
    Import {
        /// Directory holding the .csv/.json exports
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Stop a file at its first failed row
        #[arg(long)]
        abort_on_error: bool,

        /// Print { imported, failed, errors } per file instead of full reports
        #[arg(long)]
        summary: bool,

        /// City used for rows without one
        #[arg(long, default_value = "Houston")]
        city: String,

        /// Zip code used for rows without one
        #[arg(long, default_value = "77001")]
        zip: String,
    },

    /// Import a single file of area metrics or developers
    ImportFile {
        #[arg(value_enum)]
        kind: FileKind,

        path: PathBuf,

        #[arg(long)]
        abort_on_error: bool,
    },

    /// Print an accessor's response envelope as JSON
    Fetch {
        #[arg(value_enum)]
        target: Target,

        /// Neighborhood slug (repeat for `compare`)
        #[arg(long = "slug")]
        slugs: Vec<String>,

        /// Property address
        #[arg(long)]
        address: Option<String>,

        /// Permit location filter
        #[arg(long)]
        location: Option<String>,

        /// Permit type filter
        #[arg(long = "type")]
        permit_type: Option<String>,

        /// Fetch twice to show the cached second response
        #[arg(long)]
        twice: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FileKind {
    AreaMetrics,
    Developers,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    Neighborhood,
    Compare,
    Metrics,
    Timing,
    Opportunities,
    Property,
    Permits,
    Report,
}

fn policy(abort_on_error: bool) -> ErrorPolicy {
    if abort_on_error {
        ErrorPolicy::AbortOnError
    } else {
        ErrorPolicy::ContinueOnError
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn fetch_once(
    client: &MarketIntelClient<StaticMarketData>,
    target: Target,
    slugs: &[String],
    address: Option<&str>,
    filters: &PermitFilters,
) -> Result<(), Box<dyn std::error::Error>> {
    let first_slug = slugs.first().map(String::as_str).unwrap_or("cypress");
    match target {
        Target::Neighborhood => print_json(&client.get_neighborhood_data(first_slug).await),
        Target::Compare => print_json(&client.compare_neighborhoods(slugs).await),
        Target::Metrics => print_json(&client.get_market_metrics().await),
        Target::Timing => print_json(&client.get_market_timing().await),
        Target::Opportunities => print_json(&client.get_investment_opportunities().await),
        Target::Property => {
            let address = address.ok_or("--address is required for property")?;
            print_json(&client.get_property_analysis(address).await)
        }
        Target::Permits => print_json(&client.get_permit_data(filters).await),
        Target::Report => print_json(&client.get_weekly_market_report().await),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Import {
            dir,
            abort_on_error,
            summary,
            city,
            zip,
        } => {
            let config = ImportConfig::new(dir)
                .with_error_policy(policy(abort_on_error))
                .with_defaults(PropertyDefaults {
                    city,
                    zip_code: zip,
                    ..PropertyDefaults::default()
                });
            let importer = HoustonPDataImporter::new(config, InMemoryRecordStore::new());
            let results = importer.import_all().await;

            if summary {
                let summaries: Vec<_> = results
                    .reports()
                    .iter()
                    .map(|r| (r.source.clone(), r.summary()))
                    .collect();
                print_json(&summaries)?;
            } else {
                print_json(&results)?;
            }
            log::info!("{} properties in store", importer.store().len());
        }

        Command::ImportFile {
            kind,
            path,
            abort_on_error,
        } => {
            let source = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("import")
                .to_string();
            let report: ImportReport = match load_records(&path) {
                Err(e) => ImportReport::file_error(source, format!("File error: {}", e)),
                Ok(records) => {
                    let job = ImportJob::new(source).with_policy(policy(abort_on_error));
                    match kind {
                        FileKind::AreaMetrics => {
                            let store = InMemoryRecordStore::new();
                            job.run(&records, &AreaMetricMapper::default(), &store).await
                        }
                        FileKind::Developers => {
                            let store = InMemoryRecordStore::new();
                            job.run(&records, &DeveloperMapper, &store).await
                        }
                    }
                }
            };
            print_json(&report)?;
        }

        Command::Fetch {
            target,
            slugs,
            address,
            location,
            permit_type,
            twice,
        } => {
            let metrics = Arc::new(CounterMetrics::new());
            let client = MarketIntelClient::with_metrics(
                StaticMarketData::new(),
                InMemoryBackend::new(),
                Box::new(metrics.clone()),
                CacheConfig::default(),
            );
            let filters = PermitFilters {
                location,
                permit_type,
            };

            fetch_once(&client, target, &slugs, address.as_deref(), &filters).await?;
            if twice {
                fetch_once(&client, target, &slugs, address.as_deref(), &filters).await?;
            }

            log::info!("Cache counters: {:?}", metrics.snapshot());
            log::info!("Cache stats: {:?}", client.stats().await?);
        }
    }

    Ok(())
}
