// =============================================================================
// CoinPulse — Main Entry Point
// =============================================================================
//
// Startup order: config, shared state, optional CSV snapshot preload, the
// market refresh loops, then the REST API.  All analytics happen on demand in
// the API handlers; the loops only keep the snapshot history and the
// slow-cadence global/trending data warm.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod api;
mod app_state;
mod cache;
mod config;
mod portfolio;
mod provider;
mod snapshots;
mod types;

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::rest::ApiContext;
use crate::app_state::AppState;
use crate::config::RuntimeConfig;
use crate::provider::coingecko::CoinGeckoClient;
use crate::provider::csv_snapshots::load_snapshot_dir;
use crate::types::MarketSnapshot;

/// Cadence for the slow endpoints (global metrics, trending).
const SLOW_REFRESH_SECS: u64 = 300;

const CONFIG_PATH: &str = "coinpulse_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        CoinPulse Analytics — Starting Up                ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Env overrides.
    if let Ok(currency) = std::env::var("COINPULSE_VS_CURRENCY") {
        config.vs_currency = currency.trim().to_lowercase();
    }
    if let Ok(dir) = std::env::var("COINPULSE_SNAPSHOT_DIR") {
        if !dir.trim().is_empty() {
            config.snapshot_dir = Some(dir.trim().to_string());
        }
    }

    info!(
        vs_currency = %config.vs_currency,
        per_page = config.per_page,
        refresh_interval_secs = config.refresh_interval_secs,
        "Configured market refresh"
    );

    // ── 2. Build shared state & provider ─────────────────────────────────
    let snapshot_dir = config.snapshot_dir.clone();
    let state = Arc::new(AppState::new(config));
    let provider = Arc::new(CoinGeckoClient::new());

    // ── 3. Optional CSV snapshot preload ─────────────────────────────────
    if let Some(dir) = snapshot_dir {
        match load_snapshot_dir(&dir) {
            Ok(snapshots) => {
                let count = snapshots.len();
                for snapshot in snapshots {
                    state.history.push(snapshot);
                }
                info!(dir = %dir, count, "Preloaded CSV snapshots into history");
            }
            Err(e) => {
                warn!(dir = %dir, error = %e, "Failed to preload CSV snapshots");
                state.record_error(format!("CSV snapshot preload: {e:#}"));
            }
        }
    }

    // ── 4. Market refresh loop ───────────────────────────────────────────
    let refresh_state = state.clone();
    let refresh_provider = provider.clone();
    tokio::spawn(async move {
        loop {
            let (vs_currency, per_page, interval_secs) = {
                let config = refresh_state.runtime_config.read();
                (
                    config.vs_currency.clone(),
                    config.per_page,
                    config.refresh_interval_secs,
                )
            };

            match refresh_provider.fetch_markets(&vs_currency, per_page, 1).await {
                Ok(listings) => {
                    let snapshot = MarketSnapshot::from_listings(Utc::now(), &listings);
                    info!(
                        assets = snapshot.len(),
                        depth = refresh_state.history.len() + 1,
                        "market cross-section refreshed"
                    );
                    refresh_state.history.push(snapshot);
                    *refresh_state.latest_listings.write() = listings;
                    refresh_state.increment_version();
                }
                Err(e) => {
                    error!(error = %e, "market refresh failed — retrying next cycle");
                    refresh_state.record_error(format!("market refresh: {e:#}"));
                }
            }

            refresh_state.chart_cache.purge_expired();
            tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs.max(1))).await;
        }
    });

    // ── 5. Slow refresh loop (global metrics + trending) ─────────────────
    let slow_state = state.clone();
    let slow_provider = provider.clone();
    tokio::spawn(async move {
        loop {
            match slow_provider.fetch_global().await {
                Ok(metrics) => {
                    *slow_state.global_metrics.write() = Some(metrics);
                    slow_state.increment_version();
                }
                Err(e) => {
                    warn!(error = %e, "global metrics fetch failed");
                    slow_state.record_error(format!("global metrics: {e:#}"));
                }
            }

            // Trending is decorative — failure only logs.
            match slow_provider.fetch_trending().await {
                Ok(trending) => {
                    *slow_state.trending.write() = trending;
                }
                Err(e) => {
                    warn!(error = %e, "trending fetch failed");
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(SLOW_REFRESH_SECS)).await;
        }
    });

    // ── 6. REST API server ───────────────────────────────────────────────
    let bind_addr =
        std::env::var("COINPULSE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let app = api::rest::router(ApiContext {
        state: state.clone(),
        provider,
    });
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");
    server.abort();

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("CoinPulse shut down complete.");
    Ok(())
}
