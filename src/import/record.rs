//! Typed rows produced by the mappers, each with its natural key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A row that can be upserted by business identity.
pub trait ImportRecord: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    /// Identity used to decide between insert and update.
    fn natural_key(&self) -> Self::Key;
}

/// Property identity: address, city and zip code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub address: String,
    pub city: String,
    pub zip_code: String,
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} {}", self.address, self.city, self.zip_code)
    }
}

/// Property row built from any of the Houston open-data files.
///
/// Columns a given source does not carry stay `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub county: Option<String>,
    pub neighborhood: Option<String>,

    pub property_type: String,
    pub property_sub_type: Option<String>,
    pub status: String,

    pub list_price: Option<f64>,
    /// Acres
    pub lot_size: Option<f64>,
    pub building_size: Option<f64>,
    pub year_built: Option<i64>,

    pub tax_value: Option<f64>,
    pub market_value: Option<f64>,
    pub land_value: Option<f64>,
    pub improvement_value: Option<f64>,
    pub exemptions: Option<String>,
    pub tax_district: Option<String>,

    pub owner_name: Option<String>,
    pub owner_address: Option<String>,
    pub parcel_number: Option<String>,
    pub legal_description: Option<String>,

    pub description: Option<String>,
    pub case_number: Option<String>,
    pub case_type: Option<String>,
    pub department: Option<String>,
    pub inspector: Option<String>,

    pub features: Vec<String>,
    pub amenities: Vec<String>,
    pub list_date: Option<NaiveDate>,
    pub data_source: Option<String>,
}

impl ImportRecord for PropertyRecord {
    type Key = PropertyKey;

    fn natural_key(&self) -> PropertyKey {
        PropertyKey {
            address: self.address.clone(),
            city: self.city.clone(),
            zip_code: self.zip_code.clone(),
        }
    }
}

/// Area identity: zip code and report year.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaKey {
    pub zip_code: String,
    pub report_year: i32,
}

impl fmt::Display for AreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zip_code, self.report_year)
    }
}

/// Yearly income and housing figures for one zip code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaMetricRecord {
    pub zip_code: String,
    pub neighborhood: Option<String>,
    pub report_year: i32,
    pub median_household_income: f64,
    pub mean_household_income: Option<f64>,
    pub per_capita_income: Option<f64>,
    pub median_gross_rent: Option<f64>,
    pub median_home_value: Option<f64>,
}

impl ImportRecord for AreaMetricRecord {
    type Key = AreaKey;

    fn natural_key(&self) -> AreaKey {
        AreaKey {
            zip_code: self.zip_code.clone(),
            report_year: self.report_year,
        }
    }
}

/// Developer or employer, identified by company name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperRecord {
    pub company_name: String,
    pub sector: String,
    pub employee_count: Option<i64>,
    pub headquarters: String,
    pub primary_areas: Vec<String>,
}

impl ImportRecord for DeveloperRecord {
    type Key = String;

    fn natural_key(&self) -> String {
        self.company_name.clone()
    }
}
