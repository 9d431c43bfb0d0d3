//! Batch import of spreadsheet exports into a record store.
//!
//! A run has four parts:
//!
//! 1. [`load_records`] reads a `.csv` or `.json` export into [`Record`]s.
//! 2. A [`RecordMapper`] coerces each row into a typed record, or skips it.
//! 3. A [`RecordStore`] upserts the record by its natural key.
//! 4. [`ImportJob`] drives the loop and returns an [`ImportReport`] listing
//!    every imported, failed and skipped row.
//!
//! [`HoustonPDataImporter`] wires the five City of Houston property exports
//! together.

pub mod coerce;
pub mod config;
pub mod houston;
pub mod job;
pub mod mapper;
pub mod reader;
pub mod record;
pub mod store;

/// One loosely typed row: column name to cell value.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use config::{ErrorPolicy, ImportConfig, PropertyDefaults};
pub use houston::{HoustonImportResults, HoustonPDataImporter};
pub use job::{FailedRow, ImportJob, ImportReport, ImportSummary, ImportedRow};
pub use mapper::{
    AreaMetricMapper, CipListingMapper, DeveloperMapper, LaganKnowledgeMapper, LaraLotsMapper,
    ParkingAreaMapper, RecordMapper, TaxRollMapper,
};
pub use reader::load_records;
pub use record::{
    AreaKey, AreaMetricRecord, DeveloperRecord, ImportRecord, PropertyKey, PropertyRecord,
};
pub use store::{InMemoryRecordStore, RecordStore, UpsertOutcome};
