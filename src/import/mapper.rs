//! Field mappings from raw export rows to typed records.
//!
//! A mapper returns `Ok(Some(record))` for a row to upsert, `Ok(None)` for a
//! row that carries nothing importable (blank address, repeated header) and
//! `Err` for a row that should have been importable but is not.

use super::coerce::{excel_serial_to_date, first_float, first_int, first_string, safe_int, safe_string};
use super::config::PropertyDefaults;
use super::record::{AreaMetricRecord, DeveloperRecord, ImportRecord, PropertyRecord};
use super::Record;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde_json::Value;

/// Sq ft per acre.
const SQFT_PER_ACRE: f64 = 43560.0;

/// Trait for turning one export row into a record.
pub trait RecordMapper: Send + Sync {
    type Output: ImportRecord;

    /// Source label used in reports and logs.
    fn label(&self) -> &'static str;

    /// Leading data rows that repeat column titles and are never mapped.
    fn header_rows(&self) -> usize {
        0
    }

    /// # Errors
    /// Returns `Err` when the row is malformed
    fn map(&self, record: &Record) -> Result<Option<Self::Output>>;
}

/// `"{label}: {value}"` for every present value whose text avoids all
/// `placeholders`.
fn features(entries: &[(&str, Option<String>)], placeholders: &[&str]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
        .filter(|text| !placeholders.iter().any(|p| text.contains(p)))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn property(defaults: &PropertyDefaults, address: String, zip_code: Option<String>) -> PropertyRecord {
    PropertyRecord {
        address,
        city: defaults.city.clone(),
        state: defaults.state.clone(),
        zip_code: zip_code.unwrap_or_else(|| defaults.zip_code.clone()),
        ..PropertyRecord::default()
    }
}

/// Vacant city-owned lots (`lara-lots-for-sale-2015`).
#[derive(Clone, Debug, Default)]
pub struct LaraLotsMapper {
    pub defaults: PropertyDefaults,
}

impl LaraLotsMapper {
    fn usable_address(address: &str) -> bool {
        !address.is_empty() && address != "0" && !address.starts_with("0 ")
    }
}

impl RecordMapper for LaraLotsMapper {
    type Output = PropertyRecord;

    fn label(&self) -> &'static str {
        "LARA Property"
    }

    fn map(&self, r: &Record) -> Result<Option<PropertyRecord>> {
        let Some(address) = first_string(r, &["Address"]).filter(|a| Self::usable_address(a)) else {
            return Ok(None);
        };

        let hope_area = first_string(r, &["Hope Area"]);
        let land_sqft = first_float(r, &["Land SQFT"]).filter(|sqft| *sqft != 0.0);

        Ok(Some(PropertyRecord {
            county: Some(self.defaults.county.clone()),
            neighborhood: hope_area.clone(),
            property_type: first_string(r, &["Lot Use Description"]).unwrap_or_else(|| "land".to_string()),
            property_sub_type: Some("vacant-lot".to_string()),
            status: "available".to_string(),
            list_price: first_float(r, &["RFP Price"]),
            lot_size: land_sqft.map(|sqft| sqft / SQFT_PER_ACRE),
            features: features(
                &[
                    ("Hope Area", hope_area),
                    ("Subdivision", first_string(r, &["Subdivision"])),
                    ("Legal", first_string(r, &["Legal Description"])),
                    ("Dimensions", first_string(r, &["Dimensions"])),
                    ("Keymap", first_string(r, &["Keymap"])),
                    ("HCAD#", first_string(r, &["HCAD#"])),
                    ("COH#", first_int(r, &["COH#"]).map(|n| n.to_string())),
                ],
                &["N/A", "Unknown", "None"],
            ),
            amenities: strings(&["Government-owned", "Redevelopment opportunity"]),
            list_date: NaiveDate::from_ymd_opt(2015, 1, 1),
            ..property(&self.defaults, address, first_string(r, &["Zipcode"]))
        }))
    }
}

/// Appraisal roll (`metadata-for-city-of-houston-tax-rolls`). Column names
/// vary between roll years, so each field tries several.
#[derive(Clone, Debug, Default)]
pub struct TaxRollMapper {
    pub defaults: PropertyDefaults,
}

impl RecordMapper for TaxRollMapper {
    type Output = PropertyRecord;

    fn label(&self) -> &'static str {
        "Tax Roll"
    }

    fn map(&self, r: &Record) -> Result<Option<PropertyRecord>> {
        let Some(address) = first_string(r, &["PROPERTY_ADDRESS", "Address", "SITE_ADDR"]) else {
            return Ok(None);
        };

        let land_value = first_float(r, &["LAND_VALUE"]);
        let improvement_value = first_float(r, &["IMPROVEMENT_VALUE"]);
        let market_value = first_float(r, &["MARKET_VALUE"]).or(match (land_value, improvement_value) {
            (Some(land), Some(improvement)) => Some(land + improvement),
            _ => None,
        });

        let zip = first_string(r, &["ZIP_CODE", "Zip", "POSTAL_CODE"]);
        Ok(Some(PropertyRecord {
            property_type: first_string(r, &["PROPERTY_TYPE", "USE_CODE_DESC"])
                .unwrap_or_else(|| "Residential".to_string()),
            status: "Active".to_string(),
            tax_value: first_float(r, &["APPRAISED_VALUE", "TOTAL_APPRAISED_VALUE"]),
            market_value,
            land_value,
            improvement_value,
            lot_size: first_float(r, &["LOT_SIZE", "ACREAGE"]),
            building_size: first_float(r, &["LIVING_AREA", "BUILDING_SIZE"]),
            year_built: first_int(r, &["YEAR_BUILT", "EFFECTIVE_YEAR_BUILT"]),
            exemptions: first_string(r, &["EXEMPTIONS"]),
            tax_district: first_string(r, &["TAX_DISTRICT"]),
            owner_name: first_string(r, &["OWNER_NAME", "PROPERTY_OWNER"]),
            owner_address: first_string(r, &["OWNER_ADDRESS", "MAILING_ADDR"]),
            parcel_number: first_string(r, &["PARCEL_ID", "PARCEL_NUMBER"]),
            legal_description: first_string(r, &["LEGAL_DESC", "LEGAL_DESCRIPTION"]),
            data_source: Some("Houston Tax Rolls".to_string()),
            ..property(&self.defaults, address, zip)
        }))
    }
}

/// Capital improvement program summary
/// (`open-data-summary-cip-listing-fy17-21-adopted-cip`).
///
/// The sheet has a title row, so the export's real column names sit in the
/// first data row and the columns come through as `__EMPTY_n`.
#[derive(Clone, Debug, Default)]
pub struct CipListingMapper {
    pub defaults: PropertyDefaults,
}

impl RecordMapper for CipListingMapper {
    type Output = PropertyRecord;

    fn label(&self) -> &'static str {
        "CIP"
    }

    fn header_rows(&self) -> usize {
        1
    }

    fn map(&self, r: &Record) -> Result<Option<PropertyRecord>> {
        let Some(location) = first_string(r, &["__EMPTY_3"]).filter(|l| l != "Location") else {
            return Ok(None);
        };
        let description = first_string(r, &["__EMPTY_4"])
            .unwrap_or_else(|| "Houston CIP Project".to_string());

        Ok(Some(PropertyRecord {
            county: Some(self.defaults.county.clone()),
            property_type: "infrastructure".to_string(),
            property_sub_type: Some("cip-project".to_string()),
            status: "planned".to_string(),
            list_price: first_float(r, &["__EMPTY_12"]),
            features: features(
                &[
                    ("CIP No", first_string(r, &["__EMPTY"])),
                    ("Project", first_string(r, &["__EMPTY_1"])),
                    ("Start Year", first_string(r, &["__EMPTY_6"])),
                    ("Council District", first_string(r, &["__EMPTY_7"])),
                    ("Description", Some(description)),
                ],
                &["N/A"],
            ),
            amenities: strings(&["Government-owned", "Capital Improvement Project"]),
            list_date: NaiveDate::from_ymd_opt(2017, 1, 1),
            ..property(&self.defaults, location, first_string(r, &["__EMPTY_11"]))
        }))
    }
}

/// Approved residential permit-parking areas (`residentialparkingareas`).
#[derive(Clone, Debug, Default)]
pub struct ParkingAreaMapper {
    pub defaults: PropertyDefaults,
}

impl ParkingAreaMapper {
    /// Effective date from a serial day number, falling back to 2020-01-01.
    fn effective_date(value: Option<&Value>) -> Option<NaiveDate> {
        let serial = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        serial
            .and_then(excel_serial_to_date)
            .or_else(|| NaiveDate::from_ymd_opt(2020, 1, 1))
    }
}

impl RecordMapper for ParkingAreaMapper {
    type Output = PropertyRecord;

    fn label(&self) -> &'static str {
        "Parking"
    }

    fn map(&self, r: &Record) -> Result<Option<PropertyRecord>> {
        let (Some(block), Some(street)) = (first_string(r, &["Block"]), first_string(r, &["Street"])) else {
            return Ok(None);
        };

        Ok(Some(PropertyRecord {
            county: Some(self.defaults.county.clone()),
            property_type: "parking".to_string(),
            property_sub_type: Some("residential-parking".to_string()),
            status: "active".to_string(),
            features: features(
                &[
                    ("Time", first_string(r, &["Time"])),
                    ("Days", first_string(r, &["Days"])),
                    ("Council District", first_string(r, &["Council District"])),
                    ("Super Neighborhood", first_string(r, &["Super Neighborhood"])),
                ],
                &["N/A"],
            ),
            amenities: strings(&["Residential parking", "Time-restricted"]),
            list_date: Self::effective_date(r.get("Effective Date")),
            ..property(&self.defaults, format!("{} {}", block, street), first_string(r, &["Zip"]))
        }))
    }
}

/// Code enforcement and permit cases (`laganknowledge-04062017`).
#[derive(Clone, Debug, Default)]
pub struct LaganKnowledgeMapper {
    pub defaults: PropertyDefaults,
}

impl RecordMapper for LaganKnowledgeMapper {
    type Output = PropertyRecord;

    fn label(&self) -> &'static str {
        "Lagan"
    }

    fn map(&self, r: &Record) -> Result<Option<PropertyRecord>> {
        let Some(address) = first_string(r, &["ADDRESS", "PROPERTY_ADDRESS", "SITE_ADDRESS"]) else {
            return Ok(None);
        };

        Ok(Some(PropertyRecord {
            property_type: first_string(r, &["PROPERTY_TYPE", "USE_TYPE"])
                .unwrap_or_else(|| "Residential".to_string()),
            status: first_string(r, &["STATUS"]).unwrap_or_else(|| "Active".to_string()),
            description: first_string(r, &["DESCRIPTION", "CASE_DESCRIPTION"]),
            case_number: first_string(r, &["CASE_NUMBER", "CASE_ID"]),
            case_type: first_string(r, &["CASE_TYPE", "TYPE"]),
            parcel_number: first_string(r, &["PARCEL_ID", "PARCEL"]),
            department: first_string(r, &["DEPARTMENT", "RESPONSIBLE_DEPT"]),
            inspector: first_string(r, &["INSPECTOR", "ASSIGNED_TO"]),
            data_source: Some("Lagan Knowledge System".to_string()),
            // Snapshot date of the export
            list_date: NaiveDate::from_ymd_opt(2017, 4, 6),
            ..property(&self.defaults, address, first_string(r, &["ZIP_CODE", "Zip"]))
        }))
    }
}

/// Per-zip income statistics.
#[derive(Clone, Debug)]
pub struct AreaMetricMapper {
    /// Year used when the row has none.
    pub default_year: i32,
}

impl Default for AreaMetricMapper {
    fn default() -> Self {
        AreaMetricMapper { default_year: 2025 }
    }
}

impl RecordMapper for AreaMetricMapper {
    type Output = AreaMetricRecord;

    fn label(&self) -> &'static str {
        "Area Metrics"
    }

    fn map(&self, r: &Record) -> Result<Option<AreaMetricRecord>> {
        let zip_code = first_string(r, &["zipCode", "zip_code", "zip"])
            .ok_or_else(|| Error::ValidationError("missing zip code".to_string()))?;

        let median_household_income = first_float(r, &["median_household_income", "median_income"])
            .filter(|income| *income != 0.0)
            .ok_or_else(|| {
                Error::ValidationError(format!("{}: missing median household income", zip_code))
            })?;

        let report_year = match first_int(r, &["year", "report_year"]).filter(|year| *year != 0) {
            Some(year) => i32::try_from(year)
                .map_err(|_| Error::ValidationError(format!("{}: year {} out of range", zip_code, year)))?,
            None => self.default_year,
        };

        Ok(Some(AreaMetricRecord {
            neighborhood: first_string(r, &["neighborhood", "area"]),
            report_year,
            median_household_income,
            mean_household_income: first_float(r, &["mean_household_income", "mean_income"]),
            per_capita_income: first_float(r, &["per_capita_income", "per_capita"]),
            median_gross_rent: first_float(r, &["median_gross_rent", "median_rent"]),
            median_home_value: first_float(r, &["median_home_value", "home_value"]),
            zip_code,
        }))
    }
}

/// Builders, developers and major employers.
#[derive(Clone, Debug, Default)]
pub struct DeveloperMapper;

impl DeveloperMapper {
    /// Array of strings, or one string split on `;` or `,`.
    fn areas(value: Option<&Value>) -> Vec<String> {
        match value {
            Some(Value::Array(items)) => items.iter().filter_map(|v| safe_string(Some(v))).collect(),
            Some(v) => safe_string(Some(v))
                .map(|text| {
                    text.split([';', ','])
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

impl RecordMapper for DeveloperMapper {
    type Output = DeveloperRecord;

    fn label(&self) -> &'static str {
        "Developer"
    }

    fn map(&self, r: &Record) -> Result<Option<DeveloperRecord>> {
        let company_name = first_string(r, &["Company", "company", "name"])
            .filter(|name| name != "Unknown")
            .ok_or_else(|| Error::ValidationError("missing company name".to_string()))?;

        Ok(Some(DeveloperRecord {
            company_name,
            sector: first_string(r, &["Sector", "sector", "companyType"]).unwrap_or_else(|| "Other".to_string()),
            employee_count: safe_int(r.get("Employment_Size")).or_else(|| first_int(r, &["employeeCount"])),
            headquarters: first_string(r, &["headquarters", "Headquarters"])
                .unwrap_or_else(|| "Houston, TX".to_string()),
            primary_areas: Self::areas(r.get("primaryAreas").or_else(|| r.get("Primary_Areas"))),
        }))
    }
}
