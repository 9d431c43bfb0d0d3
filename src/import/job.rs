//! Batch import with partial-failure reporting.

use super::config::ErrorPolicy;
use super::mapper::RecordMapper;
use super::record::ImportRecord;
use super::store::{RecordStore, UpsertOutcome};
use super::Record;
use serde::Serialize;

/// Row that reached the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportedRow {
    /// 1-based position in the loaded file.
    pub row: usize,
    /// Natural key as text.
    pub key: String,
    pub outcome: UpsertOutcome,
}

/// Row that failed mapping or the store write.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedRow {
    /// 1-based position in the loaded file.
    pub row: usize,
    pub reason: String,
}

/// Condensed view of a report: `{ imported, failed, errors }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Outcome of one import job.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Source label (mapper label or file name).
    pub source: String,
    pub succeeded: Vec<ImportedRow>,
    pub failed: Vec<FailedRow>,
    /// Rows the mapper had nothing to import from.
    pub skipped: usize,
    /// The job stopped early under [`ErrorPolicy::AbortOnError`].
    pub aborted: bool,
    /// File-level problems; when present no rows were read.
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn new(source: impl Into<String>) -> Self {
        ImportReport {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Report for a file that could not be read at all.
    pub fn file_error(source: impl Into<String>, message: impl Into<String>) -> Self {
        ImportReport {
            source: source.into(),
            errors: vec![message.into()],
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.count_outcome(UpsertOutcome::Created)
    }

    pub fn updated(&self) -> usize {
        self.count_outcome(UpsertOutcome::Updated)
    }

    /// No file error and no failed rows.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.failed.is_empty()
    }

    /// File errors first, then one `"{source} row {n}: {reason}"` per
    /// failed row.
    pub fn summary(&self) -> ImportSummary {
        let errors = self
            .errors
            .iter()
            .cloned()
            .chain(
                self.failed
                    .iter()
                    .map(|f| format!("{} row {}: {}", self.source, f.row, f.reason)),
            )
            .collect();

        ImportSummary {
            imported: self.succeeded.len(),
            failed: self.failed.len(),
            errors,
        }
    }

    fn count_outcome(&self, outcome: UpsertOutcome) -> usize {
        self.succeeded.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Maps rows and upserts them one by one.
///
/// # Example
///
/// ```
/// use market_intel::import::{DeveloperMapper, ImportJob, InMemoryRecordStore, Record};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let rows: Vec<Record> = vec![
///     json!({ "Company": "Westin Homes", "Sector": "Builder" }),
///     json!({ "Sector": "Builder" }),
/// ]
/// .into_iter()
/// .filter_map(|v| v.as_object().cloned())
/// .collect();
///
/// let store = InMemoryRecordStore::new();
/// let report = ImportJob::new("developers").run(&rows, &DeveloperMapper, &store).await;
///
/// assert_eq!(report.summary().imported, 1);
/// assert_eq!(report.failed[0].row, 2);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ImportJob {
    source: String,
    policy: ErrorPolicy,
}

impl ImportJob {
    pub fn new(source: impl Into<String>) -> Self {
        ImportJob {
            source: source.into(),
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Import `records` through `mapper` into `store`.
    ///
    /// The mapper's header rows are passed over without being counted.
    /// Mapping and store failures both become [`FailedRow`]s.
    pub async fn run<M, S>(&self, records: &[Record], mapper: &M, store: &S) -> ImportReport
    where
        M: RecordMapper,
        S: RecordStore<M::Output>,
    {
        let mut report = ImportReport::new(self.source.clone());

        for (index, record) in records.iter().enumerate().skip(mapper.header_rows()) {
            let row = index + 1;

            let result = match mapper.map(record) {
                Ok(Some(mapped)) => {
                    let key = mapped.natural_key().to_string();
                    store.upsert(mapped).await.map(|outcome| Some((key, outcome)))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };

            match result {
                Ok(Some((key, outcome))) => report.succeeded.push(ImportedRow { row, key, outcome }),
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    let reason = format!("{}: {}", mapper.label(), e);
                    warn!("{} row {} failed: {}", self.source, row, reason);
                    report.failed.push(FailedRow { row, reason });

                    if self.policy == ErrorPolicy::AbortOnError {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            "{}: {} imported ({} created, {} updated), {} failed, {} skipped{}",
            report.source,
            report.succeeded.len(),
            report.created(),
            report.updated(),
            report.failed.len(),
            report.skipped,
            if report.aborted { ", aborted" } else { "" }
        );

        report
    }
}
