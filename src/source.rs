//! Market data sources.
//!
//! The `MarketDataSource` trait is the seam between the cached accessors and
//! wherever the numbers come from. [`StaticMarketData`] serves a fixed
//! Houston-area snapshot and is what the client uses out of the box; a live
//! upstream plugs in behind the same trait.
//!
//! # Error Handling
//!
//! Return `Err` for upstream outages, timeouts or malformed responses. The
//! cache turns the error into an unsuccessful response and stores nothing.

use crate::error::Result;
use crate::models::*;
use chrono::Utc;
use std::collections::BTreeMap;

/// Producer of uncached market data.
///
/// Every method is called at most once per cache miss. Implementations do
/// not need their own caching.
#[allow(async_fn_in_trait)]
pub trait MarketDataSource: Send + Sync {
    /// Profile for a neighborhood slug.
    ///
    /// `market_metrics` and `permit_data` are left `None`; the client fills
    /// them from its own cached accessors.
    ///
    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn neighborhood(&self, slug: &str) -> Result<NeighborhoodData>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn market_metrics(&self) -> Result<MarketMetrics>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn market_timing(&self) -> Result<MarketTiming>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn investment_opportunities(&self) -> Result<Vec<InvestmentOpportunity>>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn property_analysis(&self, address: &str) -> Result<PropertyAnalysis>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn permit_activity(&self, filters: &PermitFilters) -> Result<PermitActivity>;

    /// # Errors
    /// Returns `Err` if the source is unavailable
    async fn weekly_market_report(&self) -> Result<MarketReport>;
}

/// Neighborhood figures that differ between profiles.
struct Profile {
    slug: &'static str,
    name: &'static str,
    population: u32,
    median_income: f64,
    median_home_price: f64,
    price_per_sq_ft: f64,
    school_rating: f64,
    growth_rate: f64,
}

const FALLBACK_SLUG: &str = "cypress";

#[rustfmt::skip]
const PROFILES: &[Profile] = &[
    Profile { slug: "cypress", name: "Cypress", population: 194_000, median_income: 89_500.0, median_home_price: 385_000.0, price_per_sq_ft: 165.0, school_rating: 8.5, growth_rate: 3.2 },
    Profile { slug: "pearland", name: "Pearland", population: 125_000, median_income: 95_200.0, median_home_price: 425_000.0, price_per_sq_ft: 175.0, school_rating: 8.7, growth_rate: 2.8 },
    Profile { slug: "memorial", name: "Memorial", population: 78_000, median_income: 142_000.0, median_home_price: 875_000.0, price_per_sq_ft: 285.0, school_rating: 9.2, growth_rate: 1.5 },
    Profile { slug: "spring", name: "Spring", population: 168_000, median_income: 78_400.0, median_home_price: 325_000.0, price_per_sq_ft: 155.0, school_rating: 8.0, growth_rate: 2.9 },
    Profile { slug: "conroe", name: "Conroe", population: 94_000, median_income: 72_300.0, median_home_price: 295_000.0, price_per_sq_ft: 145.0, school_rating: 7.8, growth_rate: 4.1 },
    Profile { slug: "richmond", name: "Richmond", population: 87_000, median_income: 81_200.0, median_home_price: 345_000.0, price_per_sq_ft: 158.0, school_rating: 8.3, growth_rate: 3.5 },
    Profile { slug: "friendswood", name: "Friendswood", population: 41_000, median_income: 108_000.0, median_home_price: 485_000.0, price_per_sq_ft: 195.0, school_rating: 9.0, growth_rate: 1.8 },
    Profile { slug: "league-city", name: "League City", population: 112_000, median_income: 97_500.0, median_home_price: 395_000.0, price_per_sq_ft: 172.0, school_rating: 8.6, growth_rate: 2.7 },
    Profile { slug: "clear-lake", name: "Clear Lake", population: 65_000, median_income: 92_000.0, median_home_price: 415_000.0, price_per_sq_ft: 180.0, school_rating: 8.4, growth_rate: 2.2 },
    Profile { slug: "bellaire", name: "Bellaire", population: 19_000, median_income: 165_000.0, median_home_price: 985_000.0, price_per_sq_ft: 325.0, school_rating: 9.5, growth_rate: 1.2 },
    Profile { slug: "river-oaks", name: "River Oaks", population: 15_000, median_income: 285_000.0, median_home_price: 2_850_000.0, price_per_sq_ft: 485.0, school_rating: 9.3, growth_rate: 0.8 },
    Profile { slug: "heights", name: "The Heights", population: 42_000, median_income: 115_000.0, median_home_price: 685_000.0, price_per_sq_ft: 265.0, school_rating: 8.8, growth_rate: 2.1 },
    Profile { slug: "montrose", name: "Montrose", population: 38_000, median_income: 98_000.0, median_home_price: 595_000.0, price_per_sq_ft: 245.0, school_rating: 8.5, growth_rate: 1.9 },
    Profile { slug: "energy-corridor", name: "Energy Corridor", population: 72_000, median_income: 112_000.0, median_home_price: 525_000.0, price_per_sq_ft: 215.0, school_rating: 8.7, growth_rate: 2.5 },
    Profile { slug: "champions", name: "Champions", population: 58_000, median_income: 94_500.0, median_home_price: 385_000.0, price_per_sq_ft: 168.0, school_rating: 8.2, growth_rate: 2.3 },
];

/// Fixed Houston-area data set.
///
/// Unknown neighborhood slugs get the Cypress profile under the requested
/// slug. Timestamps, the report id and parcel ids are generated per call.
#[derive(Clone, Debug, Default)]
pub struct StaticMarketData;

impl StaticMarketData {
    pub fn new() -> Self {
        StaticMarketData
    }

    /// Slugs with a dedicated profile.
    pub fn known_slugs() -> impl Iterator<Item = &'static str> {
        PROFILES.iter().map(|p| p.slug)
    }

    fn profile(slug: &str) -> &'static Profile {
        PROFILES
            .iter()
            .find(|p| p.slug == slug)
            .or_else(|| PROFILES.iter().find(|p| p.slug == FALLBACK_SLUG))
            .unwrap_or(&PROFILES[0])
    }
}

fn distribution(buckets: &[(&str, f64)]) -> Distribution {
    buckets
        .iter()
        .map(|(label, share)| (label.to_string(), *share))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn demographics() -> Demographics {
    Demographics {
        age_distribution: distribution(&[
            ("under18", 24.0),
            ("18-34", 22.0),
            ("35-54", 28.0),
            ("55-64", 14.0),
            ("over65", 12.0),
        ]),
        household_income: distribution(&[
            ("under50k", 18.0),
            ("50k-100k", 32.0),
            ("100k-150k", 25.0),
            ("150k-200k", 15.0),
            ("over200k", 10.0),
        ]),
        education: distribution(&[
            ("highSchool", 85.0),
            ("bachelors", 42.0),
            ("masters", 18.0),
            ("doctorate", 3.0),
        ]),
        household_size: 2.8,
        owner_occupied: 68.0,
        renter_occupied: 32.0,
    }
}

fn parcel_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("HC-2025-{}", &suffix[..9])
}

impl MarketDataSource for StaticMarketData {
    async fn neighborhood(&self, slug: &str) -> Result<NeighborhoodData> {
        let p = Self::profile(slug);
        Ok(NeighborhoodData {
            name: p.name.to_string(),
            slug: slug.to_string(),
            county: "Harris".to_string(),
            population: p.population,
            median_income: p.median_income,
            median_home_price: p.median_home_price,
            price_per_sq_ft: p.price_per_sq_ft,
            year_built: 1985,
            school_rating: p.school_rating,
            crime_rate: 32.5,
            walk_score: 45,
            transit_score: 28,
            growth_rate: p.growth_rate,
            demographics: demographics(),
            market_metrics: None,
            permit_data: None,
            amenities: strings(&[
                "Top-rated schools",
                "Shopping centers",
                "Parks and recreation",
                "Medical facilities",
                "Restaurants and dining",
                "Entertainment venues",
            ]),
            top_employers: strings(&[
                "Energy companies",
                "Healthcare systems",
                "School districts",
                "Retail chains",
                "Technology firms",
            ]),
            upcoming_developments: vec![Development {
                name: format!("{} Town Center Expansion", p.name),
                kind: "Mixed-Use".to_string(),
                size: "250,000 sq ft".to_string(),
                investment_value: 125_000_000.0,
                expected_completion: "2026 Q2".to_string(),
                developer: "Houston Development Partners".to_string(),
                description: "New retail, dining, and residential complex".to_string(),
            }],
        })
    }

    async fn market_metrics(&self) -> Result<MarketMetrics> {
        Ok(MarketMetrics {
            average_price_per_sq_ft: 185.0,
            median_price: 425_000.0,
            year_over_year_change: 5.2,
            days_on_market: 42,
            active_listings: 3421,
            new_listings: 892,
            sold_properties: 756,
            inventory_months: 2.8,
            list_to_sold_ratio: 0.98,
            timestamp: Utc::now(),
        })
    }

    async fn market_timing(&self) -> Result<MarketTiming> {
        Ok(MarketTiming {
            score: 78,
            recommendation: Recommendation::Buy,
            factors: TimingFactors {
                price_appreciation: 82,
                inventory: 65,
                demand_supply: 88,
                economic_indicators: 75,
                seasonality: 80,
            },
            insights: strings(&[
                "Strong buyer demand continues to outpace inventory",
                "Interest rates expected to stabilize in Q2 2025",
                "Corporate relocations driving population growth",
                "New construction permits up 15% YoY",
            ]),
            risk_level: RiskLevel::Medium,
        })
    }

    async fn investment_opportunities(&self) -> Result<Vec<InvestmentOpportunity>> {
        Ok(vec![
            InvestmentOpportunity {
                id: "opp-001".to_string(),
                title: "Cypress Mixed-Use Development Site".to_string(),
                location: "15234 Northwest Freeway".to_string(),
                neighborhood: "Cypress".to_string(),
                kind: "Mixed-Use Development".to_string(),
                price: 4_500_000.0,
                size: 12.5,
                projected_roi: 24.5,
                highlights: strings(&[
                    "Prime location on major thoroughfare",
                    "Zoned for mixed-use development",
                    "Adjacent to planned transit station",
                    "Growing population within 3-mile radius",
                ]),
                risks: strings(&[
                    "Requires rezoning approval",
                    "Environmental assessment pending",
                    "Construction timeline 24-36 months",
                ]),
                timeline: "36 months".to_string(),
                minimum_investment: 500_000.0,
                target_irr: 22.0,
                exit_strategy: "Sale to REIT or hold for income".to_string(),
                images: strings(&["/images/cypress-site.jpg"]),
            },
            InvestmentOpportunity {
                id: "opp-002".to_string(),
                title: "Pearland Residential Development".to_string(),
                location: "8956 Broadway Street".to_string(),
                neighborhood: "Pearland".to_string(),
                kind: "Residential Subdivision".to_string(),
                price: 8_200_000.0,
                size: 45.0,
                projected_roi: 28.3,
                highlights: strings(&[
                    "150 single-family lots potential",
                    "Excellent school district",
                    "All utilities at site",
                    "Ready for immediate development",
                ]),
                risks: strings(&[
                    "Competitive builder market",
                    "Rising construction costs",
                    "Interest rate sensitivity",
                ]),
                timeline: "48 months".to_string(),
                minimum_investment: 1_000_000.0,
                target_irr: 25.0,
                exit_strategy: "Lot sales to builders".to_string(),
                images: strings(&["/images/pearland-site.jpg"]),
            },
        ])
    }

    async fn property_analysis(&self, address: &str) -> Result<PropertyAnalysis> {
        Ok(PropertyAnalysis {
            address: address.to_string(),
            parcel_id: parcel_id(),
            zoning: "C-2 Commercial".to_string(),
            current_use: "Vacant Land".to_string(),
            highest_best_use: "Mixed-Use Development".to_string(),
            land_value: 2_850_000.0,
            improvement_value: 0.0,
            total_value: 2_850_000.0,
            tax_assessment: 2_565_000.0,
            annual_taxes: 68_742.0,
            lot_size: 5.2,
            buildable_area: 4.8,
            development_potential: DevelopmentPotential {
                residential: ResidentialScenario {
                    units: 120,
                    kind: "Mid-rise Apartments".to_string(),
                    estimated_value: 28_500_000.0,
                    construction_cost: 18_000_000.0,
                    net_roi: 35.8,
                },
                commercial: CommercialScenario {
                    sqft: 45_000,
                    kind: "Retail/Office".to_string(),
                    estimated_value: 15_750_000.0,
                    construction_cost: 9_000_000.0,
                    net_roi: 28.5,
                },
                mixed_use: MixedUseScenario {
                    residential_units: 80,
                    commercial_sqft: 25_000,
                    estimated_value: 32_000_000.0,
                    construction_cost: 19_500_000.0,
                    net_roi: 38.2,
                },
                recommendation:
                    "Mixed-use development offers highest ROI with diversified income streams"
                        .to_string(),
            },
            comparables: vec![Comparable {
                address: "1234 Main Street".to_string(),
                distance: 0.3,
                sold_date: "2025-06-15".to_string(),
                sold_price: 2_400_000.0,
                price_per_sq_ft: 112.0,
                lot_size: 4.8,
                year_built: 0,
                property_type: "Vacant Land".to_string(),
            }],
        })
    }

    async fn permit_activity(&self, filters: &PermitFilters) -> Result<PermitActivity> {
        debug!(
            "Static permit activity for location={:?} type={:?}",
            filters.location, filters.permit_type
        );
        Ok(PermitActivity {
            total_permits: 487,
            total_value: 378_000_000.0,
            residential: SectorActivity {
                count: 245,
                value: 142_000_000.0,
            },
            commercial: SectorActivity {
                count: 89,
                value: 125_000_000.0,
            },
            industrial: SectorActivity {
                count: 45,
                value: 87_000_000.0,
            },
            mixed_use: SectorActivity {
                count: 28,
                value: 24_000_000.0,
            },
            top_projects: vec![
                PermitProject {
                    address: "12500 Northwest Freeway".to_string(),
                    kind: "Mixed-Use".to_string(),
                    value: 45_000_000.0,
                    sqft: 285_000,
                    status: "Approved".to_string(),
                    developer: "Westside Development Group".to_string(),
                    expected_completion: "2026 Q3".to_string(),
                },
                PermitProject {
                    address: "8900 Westheimer Road".to_string(),
                    kind: "Commercial".to_string(),
                    value: 32_000_000.0,
                    sqft: 125_000,
                    status: "Under Review".to_string(),
                    developer: "Houston Retail Partners".to_string(),
                    expected_completion: "2026 Q1".to_string(),
                },
            ],
            monthly_trend: vec![
                MonthlyPermits {
                    month: "2025-04".to_string(),
                    count: 156,
                    value: 124_000_000.0,
                },
                MonthlyPermits {
                    month: "2025-05".to_string(),
                    count: 168,
                    value: 132_000_000.0,
                },
                MonthlyPermits {
                    month: "2025-06".to_string(),
                    count: 163,
                    value: 122_000_000.0,
                },
            ],
        })
    }

    async fn weekly_market_report(&self) -> Result<MarketReport> {
        let now = Utc::now();
        Ok(MarketReport {
            id: format!("wmr-{}", now.format("%Y-%m-%d")),
            title: "Houston Development Market Weekly Report".to_string(),
            date: now,
            quarter: "Q2".to_string(),
            year: 2025,
            summary: "Houston's development market continues strong momentum with $2.3B in new permits this quarter.".to_string(),
            key_metrics: ReportKeyMetrics {
                total_permit_value: 378_000_000.0,
                permit_count: 487,
                avg_roi: 24.5,
                top_neighborhoods: strings(&["Cypress", "Pearland", "Memorial"]),
                growth_rate: 5.2,
            },
            sections: vec![ReportSection {
                title: "Market Overview".to_string(),
                content: "Development activity remains robust across all sectors...".to_string(),
                highlights: strings(&[
                    "15% YoY permit growth",
                    "Industrial sector leading gains",
                    "Residential demand steady",
                ]),
                data: BTreeMap::new(),
            }],
            charts: vec![],
        })
    }
}
