// =============================================================================
// Runtime Configuration — hot-reloadable analytics settings with atomic save
// =============================================================================
//
// Every caller-tunable parameter of the service lives here: fetch sizing,
// refresh cadence, indicator windows, and alerting thresholds.  The values
// mirror the conventional defaults (RSI 14, MACD 12/26/9, 5-point rolling
// window, 10% alert threshold, top-5 movers).
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry serde defaults so that adding new fields never
// breaks loading an older config file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_hist_days() -> u32 {
    30
}

fn default_rolling_window() -> usize {
    5
}

fn default_rsi_window() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_alert_threshold_pct() -> f64 {
    10.0
}

fn default_top_k() -> usize {
    5
}

fn default_snapshot_capacity() -> usize {
    48
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the CoinPulse service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Provider ------------------------------------------------------------

    /// Quote currency for all market requests.
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,

    /// How many coins to fetch per cross-section (top N by market cap).
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Seconds between market cross-section refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Days of per-coin history for charts and indicators.
    #[serde(default = "default_hist_days")]
    pub hist_days: u32,

    /// Optional directory of pre-recorded CSV snapshots loaded at startup.
    #[serde(default)]
    pub snapshot_dir: Option<String>,

    /// Maximum snapshots retained in history.
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,

    // --- Indicator windows ---------------------------------------------------

    /// Window for the rolling mean / volatility chart.
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// RSI smoothing window.
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    /// MACD fast EMA span.
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    /// MACD slow EMA span.
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    /// MACD signal-line EMA span.
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    // --- Movers & alerting ---------------------------------------------------

    /// Percentage change beyond which a coin appears in the alert list.
    #[serde(default = "default_alert_threshold_pct")]
    pub alert_threshold_pct: f64,

    /// Number of gainers/losers reported by the movers endpoint.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            vs_currency: default_vs_currency(),
            per_page: default_per_page(),
            refresh_interval_secs: default_refresh_interval_secs(),
            hist_days: default_hist_days(),
            snapshot_dir: None,
            snapshot_capacity: default_snapshot_capacity(),
            rolling_window: default_rolling_window(),
            rsi_window: default_rsi_window(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            alert_threshold_pct: default_alert_threshold_pct(),
            top_k: default_top_k(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            vs_currency = %config.vs_currency,
            per_page = config.per_page,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_conventional_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.vs_currency, "usd");
        assert_eq!(cfg.per_page, 100);
        assert_eq!(cfg.refresh_interval_secs, 60);
        assert_eq!(cfg.rolling_window, 5);
        assert_eq!(cfg.rsi_window, 14);
        assert_eq!(cfg.macd_fast, 12);
        assert_eq!(cfg.macd_slow, 26);
        assert_eq!(cfg.macd_signal, 9);
        assert!((cfg.alert_threshold_pct - 10.0).abs() < f64::EPSILON);
        assert_eq!(cfg.top_k, 5);
        assert!(cfg.snapshot_dir.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.rsi_window, 14);
        assert_eq!(cfg.vs_currency, "usd");
        assert_eq!(cfg.snapshot_capacity, 48);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "vs_currency": "eur", "alert_threshold_pct": 5.0 }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.vs_currency, "eur");
        assert!((cfg.alert_threshold_pct - 5.0).abs() < f64::EPSILON);
        assert_eq!(cfg.macd_slow, 26);
        assert_eq!(cfg.top_k, 5);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = RuntimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.vs_currency, cfg2.vs_currency);
        assert_eq!(cfg.rsi_window, cfg2.rsi_window);
        assert_eq!(cfg.snapshot_capacity, cfg2.snapshot_capacity);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "coinpulse-config-test-{}.json",
            std::process::id()
        ));
        let mut cfg = RuntimeConfig::default();
        cfg.vs_currency = "eur".to_string();
        cfg.top_k = 7;

        cfg.save(&path).unwrap();
        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.vs_currency, "eur");
        assert_eq!(loaded.top_k, 7);

        std::fs::remove_file(&path).ok();
    }
}
