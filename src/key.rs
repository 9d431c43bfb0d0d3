//! Cache key construction for market data categories.
//!
//! Keys are `-` joined: a fixed prefix naming the category, then zero or more
//! parameters. `neighborhood-cypress`, `permits-all-all`,
//! `property-15234 Northwest Freeway`.

/// Separator between key parts.
pub const KEY_SEPARATOR: &str = "-";

/// Placeholder used when an optional key parameter is absent.
pub const ANY: &str = "all";

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Key for a category with a single parameter.
    pub fn build_with_prefix(prefix: &str, id: &dyn std::fmt::Display) -> String {
        format!("{}{}{}", prefix, KEY_SEPARATOR, id)
    }

    /// Key from several parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(KEY_SEPARATOR)
    }

    /// Key where missing parameters collapse to [`ANY`].
    pub fn build_filtered(prefix: &str, params: &[Option<&str>]) -> String {
        let mut parts = Vec::with_capacity(params.len() + 1);
        parts.push(prefix);
        parts.extend(params.iter().map(|p| match p {
            Some(v) if !v.is_empty() => *v,
            _ => ANY,
        }));
        Self::build_composite(&parts)
    }
}

/// Fixed keys and prefixes used by [`MarketIntelClient`](crate::client::MarketIntelClient).
pub mod keys {
    pub const NEIGHBORHOOD: &str = "neighborhood";
    pub const MARKET_METRICS: &str = "market-metrics";
    pub const MARKET_TIMING: &str = "market-timing";
    pub const INVESTMENT_OPPORTUNITIES: &str = "investment-opportunities";
    pub const PROPERTY: &str = "property";
    pub const PERMITS: &str = "permits";
    pub const WEEKLY_MARKET_REPORT: &str = "weekly-market-report";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_prefix() {
        let key = CacheKeyBuilder::build_with_prefix(keys::NEIGHBORHOOD, &"league-city");
        assert_eq!(key, "neighborhood-league-city");
    }

    #[test]
    fn test_build_composite() {
        let key = CacheKeyBuilder::build_composite(&["permits", "Katy", "Commercial"]);
        assert_eq!(key, "permits-Katy-Commercial");
    }

    #[test]
    fn test_build_filtered_fills_missing() {
        assert_eq!(
            CacheKeyBuilder::build_filtered(keys::PERMITS, &[Some("Cypress"), None]),
            "permits-Cypress-all"
        );
        assert_eq!(
            CacheKeyBuilder::build_filtered(keys::PERMITS, &[None, Some("")]),
            "permits-all-all"
        );
    }
}
