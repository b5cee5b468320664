// =============================================================================
// Central Application State — CoinPulse analytics service
// =============================================================================
//
// The single source of truth for the service: runtime config, snapshot
// history, the per-coin chart cache, and the most recent global/trending
// fetches.  The analytics engines never touch this — they receive immutable
// inputs extracted from it by the API handlers and refresh loop.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analytics::series::TimeSeries;
use crate::cache::TtlCache;
use crate::config::RuntimeConfig;
use crate::snapshots::SnapshotHistory;
use crate::types::{CoinListing, GlobalMetrics, TrendingCoin};

/// TTL for cached per-coin market charts, matching the slow-endpoint cadence.
pub const CHART_CACHE_TTL: Duration = Duration::from_secs(300);

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RwLock<RuntimeConfig>,

    // ── Market data ─────────────────────────────────────────────────────
    /// Cross-section history feeding the movers engine.
    pub history: SnapshotHistory,
    /// Latest raw listing rows (symbol/name/image and 24h fields).
    pub latest_listings: RwLock<Vec<CoinListing>>,
    /// Per-coin chart cache, keyed by `"{coin_id}:{vs_currency}:{days}"`.
    pub chart_cache: TtlCache<String, TimeSeries>,

    // ── Slow-cadence fetches ────────────────────────────────────────────
    pub global_metrics: RwLock<Option<GlobalMetrics>>,
    pub trending: RwLock<Vec<TrendingCoin>>,

    // ── Error log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started.  Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.  The
    /// returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        let snapshot_capacity = config.snapshot_capacity;
        Self {
            state_version: AtomicU64::new(0),
            runtime_config: RwLock::new(config),
            history: SnapshotHistory::new(snapshot_capacity),
            latest_listings: RwLock::new(Vec::new()),
            chart_cache: TtlCache::new(CHART_CACHE_TTL),
            global_metrics: RwLock::new(None),
            trending: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn increment_version(&self) {
        self.state_version.fetch_add(1, Ordering::Relaxed);
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::Relaxed)
    }

    /// Append an error to the bounded dashboard error log.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        });
        let overflow = errors.len().saturating_sub(MAX_RECENT_ERRORS);
        if overflow > 0 {
            errors.drain(..overflow);
        }
    }

    /// Lookup table from lowercase ticker symbol to latest price, for the
    /// portfolio endpoint.
    pub fn symbol_prices(&self) -> std::collections::HashMap<String, f64> {
        self.latest_listings
            .read()
            .iter()
            .filter_map(|row| {
                Some((row.symbol.to_lowercase(), row.current_price?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_counter_increments() {
        let state = AppState::new(RuntimeConfig::default());
        assert_eq!(state.current_state_version(), 0);
        state.increment_version();
        state.increment_version();
        assert_eq!(state.current_state_version(), 2);
    }

    #[test]
    fn error_log_is_bounded() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..60 {
            state.record_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), 50);
        assert_eq!(errors.last().unwrap().message, "error 59");
        assert_eq!(errors.first().unwrap().message, "error 10");
    }

    #[test]
    fn symbol_prices_lowercases_and_skips_priceless() {
        let state = AppState::new(RuntimeConfig::default());
        {
            let mut listings = state.latest_listings.write();
            listings.push(CoinListing {
                id: "bitcoin".into(),
                symbol: "BTC".into(),
                name: "Bitcoin".into(),
                image: None,
                current_price: Some(42_000.0),
                market_cap: None,
                total_volume: None,
                price_change_percentage_24h: None,
            });
            listings.push(CoinListing {
                id: "ghost".into(),
                symbol: "GST".into(),
                name: "Ghost".into(),
                image: None,
                current_price: None,
                market_cap: None,
                total_volume: None,
                price_change_percentage_24h: None,
            });
        }
        let prices = state.symbol_prices();
        assert_eq!(prices.get("btc"), Some(&42_000.0));
        assert!(!prices.contains_key("gst"));
    }
}
