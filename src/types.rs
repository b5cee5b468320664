// =============================================================================
// Shared types used across the CoinPulse analytics service
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One market row from the provider's cross-sectional listing
/// (CoinGecko `/coins/markets`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// A single asset's point observation inside a cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// All assets' observations at one instant — the unit the movers engine
/// compares.  Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub taken_at: DateTime<Utc>,
    pub points: HashMap<String, PricePoint>,
}

impl MarketSnapshot {
    pub fn new(taken_at: DateTime<Utc>, points: HashMap<String, PricePoint>) -> Self {
        Self { taken_at, points }
    }

    /// Build a cross-section from provider listing rows, skipping rows
    /// without a price.
    pub fn from_listings(taken_at: DateTime<Utc>, listings: &[CoinListing]) -> Self {
        let points = listings
            .iter()
            .filter_map(|row| {
                let price = row.current_price?;
                Some((
                    row.id.clone(),
                    PricePoint {
                        price,
                        market_cap: row.market_cap,
                        volume: row.total_volume,
                    },
                ))
            })
            .collect();
        Self { taken_at, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn price_of(&self, asset_id: &str) -> Option<f64> {
        self.points.get(asset_id).map(|p| p.price)
    }
}

/// Global market metrics (CoinGecko `/global`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub total_market_cap_usd: f64,
    pub market_cap_change_pct_24h: f64,
    pub active_cryptocurrencies: u64,
    pub markets: u64,
    pub btc_dominance: f64,
}

/// One trending entry (CoinGecko `/search/trending`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing(id: &str, price: Option<f64>) -> CoinListing {
        CoinListing {
            id: id.to_string(),
            symbol: id[..3.min(id.len())].to_string(),
            name: id.to_string(),
            image: None,
            current_price: price,
            market_cap: Some(1_000_000.0),
            total_volume: Some(50_000.0),
            price_change_percentage_24h: Some(1.5),
        }
    }

    #[test]
    fn snapshot_from_listings_skips_priceless_rows() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let snap = MarketSnapshot::from_listings(
            ts,
            &[listing("bitcoin", Some(42_000.0)), listing("ghost", None)],
        );
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.price_of("bitcoin"), Some(42_000.0));
        assert_eq!(snap.price_of("ghost"), None);
    }

    #[test]
    fn listing_deserialises_with_missing_optionals() {
        let json = r#"{ "id": "bitcoin", "symbol": "btc", "name": "Bitcoin" }"#;
        let row: CoinListing = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, "bitcoin");
        assert!(row.current_price.is_none());
    }
}
