// =============================================================================
// CoinGecko REST API Client
// =============================================================================
//
// Thin typed wrapper over the free CoinGecko v3 API.  No API key, no signing;
// all endpoints are public GETs.  The client never caches — TTL caching is a
// separate collaborator (`cache::TtlCache`) owned by the application state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::analytics::series::{Observation, TimeSeries};
use crate::types::{CoinListing, GlobalMetrics, TrendingCoin};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko v3 client.
#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinGeckoClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different base URL (used by tests and proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    // -------------------------------------------------------------------------
    // Market cross-section
    // -------------------------------------------------------------------------

    /// GET /coins/markets — top coins by market cap, one row per coin.
    #[instrument(skip(self), name = "coingecko::fetch_markets")]
    pub async fn fetch_markets(
        &self,
        vs_currency: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CoinListing>> {
        let url = format!("{}/coins/markets", self.base_url);
        let listings: Vec<CoinListing> = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", vs_currency),
                ("order", "market_cap_desc"),
                ("per_page", &per_page.to_string()),
                ("page", &page.to_string()),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await
            .context("GET /coins/markets request failed")?
            .error_for_status()
            .context("GET /coins/markets returned an error status")?
            .json()
            .await
            .context("failed to decode /coins/markets response")?;

        debug!(rows = listings.len(), "fetched market cross-section");
        Ok(listings)
    }

    // -------------------------------------------------------------------------
    // Per-coin history
    // -------------------------------------------------------------------------

    /// GET /coins/{id}/market_chart — daily price/market-cap/volume history,
    /// assembled into a validated [`TimeSeries`].
    #[instrument(skip(self), name = "coingecko::fetch_market_chart")]
    pub async fn fetch_market_chart(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<TimeSeries> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);
        let chart: MarketChartResponse = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", vs_currency),
                ("days", &days.to_string()),
                ("interval", "daily"),
            ])
            .send()
            .await
            .with_context(|| format!("GET market_chart for '{coin_id}' failed"))?
            .error_for_status()
            .with_context(|| format!("market_chart for '{coin_id}' returned an error status"))?
            .json()
            .await
            .with_context(|| format!("failed to decode market_chart for '{coin_id}'"))?;

        let series = chart
            .into_time_series(coin_id)
            .with_context(|| format!("malformed market_chart data for '{coin_id}'"))?;
        debug!(coin_id = %coin_id, points = series.len(), "fetched market chart");
        Ok(series)
    }

    // -------------------------------------------------------------------------
    // Global metrics & trending
    // -------------------------------------------------------------------------

    /// GET /global — aggregate market metrics.
    #[instrument(skip(self), name = "coingecko::fetch_global")]
    pub async fn fetch_global(&self) -> Result<GlobalMetrics> {
        let url = format!("{}/global", self.base_url);
        let resp: GlobalResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /global request failed")?
            .error_for_status()
            .context("GET /global returned an error status")?
            .json()
            .await
            .context("failed to decode /global response")?;

        Ok(resp.data.into_metrics())
    }

    /// GET /search/trending — coins trending in CoinGecko searches.
    #[instrument(skip(self), name = "coingecko::fetch_trending")]
    pub async fn fetch_trending(&self) -> Result<Vec<TrendingCoin>> {
        let url = format!("{}/search/trending", self.base_url);
        let resp: TrendingResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /search/trending request failed")?
            .error_for_status()
            .context("GET /search/trending returned an error status")?
            .json()
            .await
            .context("failed to decode /search/trending response")?;

        Ok(resp.coins.into_iter().map(|c| c.item).collect())
    }
}

// =============================================================================
// Wire models
// =============================================================================

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(i64, f64)>,
    #[serde(default)]
    market_caps: Vec<(i64, f64)>,
    #[serde(default)]
    total_volumes: Vec<(i64, f64)>,
}

impl MarketChartResponse {
    /// Zip the three parallel arrays into observations.  The arrays share
    /// their timestamps; market cap and volume are matched positionally and
    /// simply absent when the API returns fewer entries.
    fn into_time_series(self, coin_id: &str) -> Result<TimeSeries> {
        let mut observations = Vec::with_capacity(self.prices.len());
        for (i, &(ts_ms, price)) in self.prices.iter().enumerate() {
            let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(ts_ms)
                .with_context(|| format!("timestamp {ts_ms} out of range"))?;
            let mut obs = Observation::new(timestamp, price);
            obs.market_cap = self.market_caps.get(i).map(|&(_, v)| v);
            obs.volume = self.total_volumes.get(i).map(|&(_, v)| v);
            observations.push(obs);
        }
        TimeSeries::new(coin_id, observations).map_err(anyhow::Error::from)
    }
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: std::collections::HashMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: f64,
    #[serde(default)]
    active_cryptocurrencies: u64,
    #[serde(default)]
    markets: u64,
    #[serde(default)]
    market_cap_percentage: std::collections::HashMap<String, f64>,
}

impl GlobalData {
    fn into_metrics(self) -> GlobalMetrics {
        GlobalMetrics {
            total_market_cap_usd: self.total_market_cap.get("usd").copied().unwrap_or(0.0),
            market_cap_change_pct_24h: self.market_cap_change_percentage_24h_usd,
            active_cryptocurrencies: self.active_cryptocurrencies,
            markets: self.markets,
            btc_dominance: self.market_cap_percentage.get("btc").copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingEntry {
    item: TrendingCoin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_chart_decodes_and_zips() {
        let json = r#"{
            "prices": [[1700000000000, 37000.5], [1700086400000, 37500.0]],
            "market_caps": [[1700000000000, 7.2e11], [1700086400000, 7.3e11]],
            "total_volumes": [[1700000000000, 1.5e10], [1700086400000, 1.6e10]]
        }"#;
        let chart: MarketChartResponse = serde_json::from_str(json).unwrap();
        let series = chart.into_time_series("bitcoin").unwrap();

        assert_eq!(series.asset_id(), "bitcoin");
        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), vec![37000.5, 37500.0]);
        assert_eq!(series.observations()[0].market_cap, Some(7.2e11));
        assert_eq!(series.observations()[1].volume, Some(1.6e10));
    }

    #[test]
    fn market_chart_tolerates_missing_columns() {
        let json = r#"{ "prices": [[1700000000000, 100.0]] }"#;
        let chart: MarketChartResponse = serde_json::from_str(json).unwrap();
        let series = chart.into_time_series("bitcoin").unwrap();
        assert_eq!(series.observations()[0].market_cap, None);
        assert_eq!(series.observations()[0].volume, None);
    }

    #[test]
    fn market_chart_rejects_nonpositive_price() {
        let json = r#"{ "prices": [[1700000000000, 0.0]] }"#;
        let chart: MarketChartResponse = serde_json::from_str(json).unwrap();
        assert!(chart.into_time_series("bitcoin").is_err());
    }

    #[test]
    fn global_decodes_nested_maps() {
        let json = r#"{
            "data": {
                "total_market_cap": { "usd": 1.7e12, "eur": 1.6e12 },
                "market_cap_change_percentage_24h_usd": -1.25,
                "active_cryptocurrencies": 10500,
                "markets": 900,
                "market_cap_percentage": { "btc": 51.3, "eth": 17.2 }
            }
        }"#;
        let resp: GlobalResponse = serde_json::from_str(json).unwrap();
        let metrics = resp.data.into_metrics();
        assert!((metrics.total_market_cap_usd - 1.7e12).abs() < 1.0);
        assert!((metrics.market_cap_change_pct_24h + 1.25).abs() < 1e-10);
        assert_eq!(metrics.active_cryptocurrencies, 10500);
        assert!((metrics.btc_dominance - 51.3).abs() < 1e-10);
    }

    #[test]
    fn trending_unwraps_item_envelope() {
        let json = r#"{
            "coins": [
                { "item": { "id": "pepe", "name": "Pepe", "symbol": "PEPE",
                            "market_cap_rank": 40, "score": 0.0 } }
            ]
        }"#;
        let resp: TrendingResponse = serde_json::from_str(json).unwrap();
        let coins: Vec<TrendingCoin> = resp.coins.into_iter().map(|c| c.item).collect();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].id, "pepe");
        assert_eq!(coins[0].market_cap_rank, Some(40));
    }
}
