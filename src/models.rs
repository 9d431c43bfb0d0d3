//! Market data payloads served by the accessors.
//!
//! All types serialize to camelCase JSON for API consumers and to postcard
//! for the cache, so every field stays concretely typed.

use crate::entity::CachePayload;
use crate::error::{Error, Result};
use crate::key::keys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetrics {
    pub average_price_per_sq_ft: f64,
    pub median_price: f64,
    pub year_over_year_change: f64,
    pub days_on_market: u32,
    pub active_listings: u32,
    pub new_listings: u32,
    pub sold_properties: u32,
    pub inventory_months: f64,
    pub list_to_sold_ratio: f64,
    pub timestamp: DateTime<Utc>,
}

impl CachePayload for MarketMetrics {
    fn category() -> &'static str {
        keys::MARKET_METRICS
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodData {
    pub name: String,
    pub slug: String,
    pub county: String,
    pub population: u32,
    pub median_income: f64,
    pub median_home_price: f64,
    pub price_per_sq_ft: f64,
    pub year_built: u16,
    pub school_rating: f64,
    pub crime_rate: f64,
    pub walk_score: u8,
    pub transit_score: u8,
    pub growth_rate: f64,
    pub demographics: Demographics,
    /// `None` when the embedded market metrics fetch failed.
    pub market_metrics: Option<MarketMetrics>,
    /// `None` when the embedded permit fetch failed.
    pub permit_data: Option<PermitActivity>,
    pub amenities: Vec<String>,
    pub top_employers: Vec<String>,
    pub upcoming_developments: Vec<Development>,
}

impl CachePayload for NeighborhoodData {
    fn category() -> &'static str {
        keys::NEIGHBORHOOD
    }
}

/// Percent shares per bucket, keyed by bucket label (`"18-34"`, `"50k-100k"`).
pub type Distribution = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub age_distribution: Distribution,
    pub household_income: Distribution,
    pub education: Distribution,
    pub household_size: f64,
    pub owner_occupied: f64,
    pub renter_occupied: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Development {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
    pub investment_value: f64,
    pub expected_completion: String,
    pub developer: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    Watch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingFactors {
    pub price_appreciation: u8,
    pub inventory: u8,
    pub demand_supply: u8,
    pub economic_indicators: u8,
    pub seasonality: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTiming {
    /// 0-100
    pub score: u8,
    pub recommendation: Recommendation,
    pub factors: TimingFactors,
    pub insights: Vec<String>,
    pub risk_level: RiskLevel,
}

impl CachePayload for MarketTiming {
    fn category() -> &'static str {
        keys::MARKET_TIMING
    }

    fn validate(&self) -> Result<()> {
        if self.score > 100 {
            return Err(Error::ValidationError(format!(
                "timing score {} outside 0-100",
                self.score
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentOpportunity {
    pub id: String,
    pub title: String,
    pub location: String,
    pub neighborhood: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    /// Acres
    pub size: f64,
    #[serde(rename = "projectedROI")]
    pub projected_roi: f64,
    pub highlights: Vec<String>,
    pub risks: Vec<String>,
    pub timeline: String,
    pub minimum_investment: f64,
    #[serde(rename = "targetIRR")]
    pub target_irr: f64,
    pub exit_strategy: String,
    pub images: Vec<String>,
}

impl CachePayload for InvestmentOpportunity {
    fn category() -> &'static str {
        keys::INVESTMENT_OPPORTUNITIES
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAnalysis {
    pub address: String,
    pub parcel_id: String,
    pub zoning: String,
    pub current_use: String,
    pub highest_best_use: String,
    pub land_value: f64,
    pub improvement_value: f64,
    pub total_value: f64,
    pub tax_assessment: f64,
    pub annual_taxes: f64,
    pub lot_size: f64,
    pub buildable_area: f64,
    pub development_potential: DevelopmentPotential,
    pub comparables: Vec<Comparable>,
}

impl CachePayload for PropertyAnalysis {
    fn category() -> &'static str {
        keys::PROPERTY
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentialScenario {
    pub units: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub estimated_value: f64,
    pub construction_cost: f64,
    #[serde(rename = "netROI")]
    pub net_roi: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommercialScenario {
    pub sqft: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub estimated_value: f64,
    pub construction_cost: f64,
    #[serde(rename = "netROI")]
    pub net_roi: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedUseScenario {
    pub residential_units: u32,
    pub commercial_sqft: u32,
    pub estimated_value: f64,
    pub construction_cost: f64,
    #[serde(rename = "netROI")]
    pub net_roi: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentPotential {
    pub residential: ResidentialScenario,
    pub commercial: CommercialScenario,
    pub mixed_use: MixedUseScenario,
    pub recommendation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    pub address: String,
    /// Miles
    pub distance: f64,
    pub sold_date: String,
    pub sold_price: f64,
    pub price_per_sq_ft: f64,
    pub lot_size: f64,
    /// 0 for vacant land
    pub year_built: u16,
    pub property_type: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorActivity {
    pub count: u32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitProject {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub sqft: u32,
    pub status: String,
    pub developer: String,
    pub expected_completion: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPermits {
    /// `YYYY-MM`
    pub month: String,
    pub count: u32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitActivity {
    pub total_permits: u32,
    pub total_value: f64,
    pub residential: SectorActivity,
    pub commercial: SectorActivity,
    pub industrial: SectorActivity,
    pub mixed_use: SectorActivity,
    pub top_projects: Vec<PermitProject>,
    pub monthly_trend: Vec<MonthlyPermits>,
}

impl CachePayload for PermitActivity {
    fn category() -> &'static str {
        keys::PERMITS
    }
}

/// Optional filters for permit activity. Absent fields mean "all".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermitFilters {
    pub location: Option<String>,
    pub permit_type: Option<String>,
}

impl PermitFilters {
    pub fn location(location: impl Into<String>) -> Self {
        PermitFilters {
            location: Some(location.into()),
            permit_type: None,
        }
    }

    pub fn with_type(mut self, permit_type: impl Into<String>) -> Self {
        self.permit_type = Some(permit_type.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKeyMetrics {
    pub total_permit_value: f64,
    pub permit_count: u32,
    #[serde(rename = "avgROI")]
    pub avg_roi: f64,
    pub top_neighborhoods: Vec<String>,
    pub growth_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
    pub highlights: Vec<String>,
    pub data: BTreeMap<String, f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Area,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    /// Series name to data points.
    pub data: BTreeMap<String, Vec<f64>>,
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    /// `wmr-YYYY-MM-DD`
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub quarter: String,
    pub year: i32,
    pub summary: String,
    pub key_metrics: ReportKeyMetrics,
    pub sections: Vec<ReportSection>,
    pub charts: Vec<ChartData>,
}

impl CachePayload for MarketReport {
    fn category() -> &'static str {
        keys::WEEKLY_MARKET_REPORT
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Hold => write!(f, "HOLD"),
            Recommendation::Sell => write!(f, "SELL"),
            Recommendation::Watch => write!(f, "WATCH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(score: u8) -> MarketTiming {
        MarketTiming {
            score,
            recommendation: Recommendation::Buy,
            factors: TimingFactors {
                price_appreciation: 82,
                inventory: 65,
                demand_supply: 88,
                economic_indicators: 75,
                seasonality: 80,
            },
            insights: vec![],
            risk_level: RiskLevel::Medium,
        }
    }

    #[test]
    fn test_timing_json_uses_source_casing() {
        let json = serde_json::to_value(timing(78)).unwrap();
        assert_eq!(json["recommendation"], "BUY");
        assert_eq!(json["riskLevel"], "MEDIUM");
        assert_eq!(json["factors"]["demandSupply"], 88);
    }

    #[test]
    fn test_timing_score_validation() {
        assert!(timing(100).validate().is_ok());
        assert!(timing(101).validate().is_err());
    }

    #[test]
    fn test_permit_filters_builder() {
        let filters = PermitFilters::location("Katy").with_type("Commercial");
        assert_eq!(filters.location.as_deref(), Some("Katy"));
        assert_eq!(filters.permit_type.as_deref(), Some("Commercial"));
    }

    #[test]
    fn test_opportunity_json_field_names() {
        let opp = InvestmentOpportunity {
            id: "opp-9".to_string(),
            title: "t".to_string(),
            location: "l".to_string(),
            neighborhood: "Katy".to_string(),
            kind: "Land".to_string(),
            price: 1.0,
            size: 2.0,
            projected_roi: 3.0,
            highlights: vec![],
            risks: vec![],
            timeline: "12 months".to_string(),
            minimum_investment: 4.0,
            target_irr: 5.0,
            exit_strategy: "Sale".to_string(),
            images: vec![],
        };
        let json = serde_json::to_value(&opp).unwrap();
        assert_eq!(json["projectedROI"], 3.0);
        assert_eq!(json["targetIRR"], 5.0);
        assert_eq!(json["type"], "Land");
    }
}
