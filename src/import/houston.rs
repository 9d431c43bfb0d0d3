//! City of Houston open-data ("P-data") property import.
//!
//! Five exports feed the property table. Each is looked up in the base
//! directory by file stem, as `.csv` or `.json`.
//!
//! | Stem | Mapper |
//! |------|--------|
//! | `lara-lots-for-sale-2015` | [`LaraLotsMapper`] |
//! | `metadata-for-city-of-houston-tax-rolls` | [`TaxRollMapper`] |
//! | `open-data-summary-cip-listing-fy17-21-adopted-cip` | [`CipListingMapper`] |
//! | `residentialparkingareas` | [`ParkingAreaMapper`] |
//! | `laganknowledge-04062017` | [`LaganKnowledgeMapper`] |

use super::config::ImportConfig;
use super::job::{ImportJob, ImportReport};
use super::mapper::{
    CipListingMapper, LaganKnowledgeMapper, LaraLotsMapper, ParkingAreaMapper, RecordMapper,
    TaxRollMapper,
};
use super::reader::{load_records, SUPPORTED_EXTENSIONS};
use super::record::PropertyRecord;
use super::store::RecordStore;
use serde::Serialize;
use std::path::PathBuf;

pub const LARA_LOTS: &str = "lara-lots-for-sale-2015";
pub const TAX_ROLLS: &str = "metadata-for-city-of-houston-tax-rolls";
pub const CIP_LISTING: &str = "open-data-summary-cip-listing-fy17-21-adopted-cip";
pub const PARKING_AREAS: &str = "residentialparkingareas";
pub const LAGAN_KNOWLEDGE: &str = "laganknowledge-04062017";

/// Workbook extensions the city publishes; found but not readable.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// One report per source file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoustonImportResults {
    pub lara_properties: ImportReport,
    pub tax_rolls: ImportReport,
    pub cip_listing: ImportReport,
    pub parking_areas: ImportReport,
    pub lagan_knowledge: ImportReport,
}

impl HoustonImportResults {
    pub fn reports(&self) -> [&ImportReport; 5] {
        [
            &self.lara_properties,
            &self.tax_rolls,
            &self.cip_listing,
            &self.parking_areas,
            &self.lagan_knowledge,
        ]
    }

    pub fn total_imported(&self) -> usize {
        self.reports().iter().map(|r| r.succeeded.len()).sum()
    }
}

/// Runs the five property imports against one store.
pub struct HoustonPDataImporter<S: RecordStore<PropertyRecord>> {
    config: ImportConfig,
    store: S,
}

impl<S: RecordStore<PropertyRecord>> HoustonPDataImporter<S> {
    pub fn new(config: ImportConfig, store: S) -> Self {
        HoustonPDataImporter { config, store }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Import every source in turn. A missing or unreadable file only
    /// affects its own report.
    pub async fn import_all(&self) -> HoustonImportResults {
        info!("Starting Houston P-data import from {}", self.config.base_dir.display());
        let defaults = self.config.defaults.clone();

        let results = HoustonImportResults {
            lara_properties: self.import_lara_properties().await,
            tax_rolls: self
                .import_file(TAX_ROLLS, &TaxRollMapper { defaults: defaults.clone() })
                .await,
            cip_listing: self
                .import_file(CIP_LISTING, &CipListingMapper { defaults: defaults.clone() })
                .await,
            parking_areas: self
                .import_file(PARKING_AREAS, &ParkingAreaMapper { defaults: defaults.clone() })
                .await,
            lagan_knowledge: self
                .import_file(LAGAN_KNOWLEDGE, &LaganKnowledgeMapper { defaults })
                .await,
        };

        info!(
            "Houston P-data import completed: {} rows imported",
            results.total_imported()
        );
        results
    }

    pub async fn import_lara_properties(&self) -> ImportReport {
        let mapper = LaraLotsMapper {
            defaults: self.config.defaults.clone(),
        };
        self.import_file(LARA_LOTS, &mapper).await
    }

    /// Locate `stem`, load it and run `mapper` over its rows.
    pub async fn import_file<M>(&self, stem: &str, mapper: &M) -> ImportReport
    where
        M: RecordMapper<Output = PropertyRecord>,
    {
        let Some(path) = self.locate(stem, SUPPORTED_EXTENSIONS) else {
            return match self.locate(stem, WORKBOOK_EXTENSIONS) {
                Some(workbook) => {
                    warn!("{} is a workbook, export it to CSV to import", workbook.display());
                    ImportReport::file_error(
                        stem,
                        format!("File error: {} must be exported to CSV", workbook.display()),
                    )
                }
                None => {
                    warn!("No export found for {}", stem);
                    ImportReport::file_error(stem, "File not found")
                }
            };
        };

        debug!("Importing {} as {}", path.display(), mapper.label());
        let records = match load_records(&path) {
            Ok(records) => records,
            Err(e) => {
                error!("Error reading {}: {}", path.display(), e);
                return ImportReport::file_error(stem, format!("File error: {}", e));
            }
        };

        ImportJob::new(stem)
            .with_policy(self.config.error_policy)
            .run(&records, mapper, &self.store)
            .await
    }

    fn locate(&self, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
        extensions
            .iter()
            .map(|ext| self.config.base_dir.join(format!("{}.{}", stem, ext)))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::store::InMemoryRecordStore;
    use std::fs;

    #[tokio::test]
    async fn test_missing_files_reported_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let importer = HoustonPDataImporter::new(
            ImportConfig::new(dir.path()),
            InMemoryRecordStore::new(),
        );

        let results = importer.import_all().await;
        for report in results.reports() {
            let summary = report.summary();
            assert_eq!(summary.imported, 0);
            assert_eq!(summary.failed, 0);
            assert_eq!(summary.errors, vec!["File not found".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_workbook_only_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{}.xlsx", LARA_LOTS)), b"PK").unwrap();

        let importer = HoustonPDataImporter::new(
            ImportConfig::new(dir.path()),
            InMemoryRecordStore::new(),
        );
        let report = importer.import_lara_properties().await;
        assert!(report.errors[0].starts_with("File error:"));
        assert!(report.succeeded.is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_row_does_not_sink_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(format!("{}.csv", LARA_LOTS)),
            b"Address,Zipcode\n100 Main St,77002\n200 Pe\xf1a Ln,77002\n300 Oak St,77002\n",
        )
        .unwrap();

        let store = InMemoryRecordStore::new();
        let importer = HoustonPDataImporter::new(ImportConfig::new(dir.path()), store.clone());
        let report = importer.import_lara_properties().await;

        assert!(report.errors.is_empty());
        assert_eq!(report.succeeded.len(), 3);
        assert_eq!(report.succeeded[2].row, 3);
        assert!(store.snapshot().iter().any(|p| p.address == "300 Oak St"));
    }

    #[tokio::test]
    async fn test_cip_csv_with_title_row() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(format!("{}.csv", CIP_LISTING)),
            "CIP Summary,,,,,,,,,,,,,\n\
             ,CIP No,Project,,Location,Description,,Start,District,,,,Zip,Total\n\
             ,N-1,Drainage,,Brays Bayou,Channel work,,2018,D,,,,77025,\"1,200,000\"\n\
             ,N-2,Paving,,,No location,,2019,K,,,,77045,500\n",
        )
        .unwrap();

        let store = InMemoryRecordStore::new();
        let importer = HoustonPDataImporter::new(ImportConfig::new(dir.path()), store.clone());
        let report = importer
            .import_file(CIP_LISTING, &CipListingMapper::default())
            .await;

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].row, 2);
        assert_eq!(report.skipped, 1);
        let row = &store.snapshot()[0];
        assert_eq!(row.address, "Brays Bayou");
        assert_eq!(row.zip_code, "77025");
        assert_eq!(row.list_price, Some(1_200_000.0));
    }
}
