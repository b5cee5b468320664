// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  The dashboard frontend polls these;
// there is no authentication — the service only exposes public market data
// and stateless computations over it.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analytics::correlation::returns_correlation;
use crate::analytics::macd::macd_series;
use crate::analytics::movers::movers;
use crate::analytics::rolling::rolling_stats;
use crate::analytics::rsi::{classify_rsi, rsi_series};
use crate::analytics::series::TimeSeries;
use crate::app_state::AppState;
use crate::portfolio::{value_portfolio, Holding};
use crate::provider::coingecko::CoinGeckoClient;

/// Everything a handler needs: shared state plus the provider client.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
    pub provider: Arc<CoinGeckoClient>,
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/overview", get(overview))
        .route("/api/v1/markets", get(markets))
        .route("/api/v1/indicators/:coin_id", get(indicators))
        .route("/api/v1/movers", get(movers_report))
        .route("/api/v1/portfolio", post(portfolio))
        .route("/api/v1/correlation", post(correlation))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config", post(set_config))
        .layer(cors)
        .with_state(ctx)
}

/// Uniform error body: `{ "error": "..." }` with an appropriate status.
fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    snapshot_depth: usize,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: ctx.state.current_state_version(),
        snapshot_depth: ctx.state.history.len(),
        uptime_secs: ctx.state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Overview — global metrics, top coin, trending
// =============================================================================

async fn overview(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let global = ctx.state.global_metrics.read().clone();
    let trending = ctx.state.trending.read().clone();
    let listings = ctx.state.latest_listings.read();
    let top_coin = listings.first().cloned();
    let snapshot_taken_at = ctx.state.history.latest().map(|s| s.taken_at);

    Json(serde_json::json!({
        "global": global,
        "top_coin": top_coin,
        "trending": trending,
        "asset_count": listings.len(),
        "snapshot_taken_at": snapshot_taken_at,
    }))
}

// =============================================================================
// Markets — latest cross-section rows
// =============================================================================

async fn markets(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let listings = ctx.state.latest_listings.read().clone();
    Json(listings)
}

// =============================================================================
// Indicators — per-coin history + rolling stats / RSI / MACD
// =============================================================================

#[derive(Deserialize)]
struct IndicatorsQuery {
    /// Days of history; defaults to the configured `hist_days`.
    days: Option<u32>,
}

async fn indicators(
    State(ctx): State<ApiContext>,
    Path(coin_id): Path<String>,
    Query(query): Query<IndicatorsQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let (vs_currency, days, rolling_window, rsi_window, fast, slow, signal) = {
        let config = ctx.state.runtime_config.read();
        (
            config.vs_currency.clone(),
            query.days.unwrap_or(config.hist_days),
            config.rolling_window,
            config.rsi_window,
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
        )
    };

    let series = fetch_chart_cached(&ctx, &coin_id, &vs_currency, days)
        .await
        .map_err(|e| {
            ctx.state.record_error(format!("chart fetch for '{coin_id}': {e:#}"));
            error_response(StatusCode::BAD_GATEWAY, format!("{e:#}"))
        })?;

    let rolling = rolling_stats(&series, rolling_window)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let rsi = rsi_series(&series, rsi_window)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let macd = macd_series(&series, fast, slow, signal)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let rsi_state = rsi.iter().rev().flatten().next().map(|&v| classify_rsi(v));

    Ok(Json(serde_json::json!({
        "coin_id": series.asset_id(),
        "timestamps": series.timestamps(),
        "price": series.prices(),
        "rolling_mean": rolling.mean,
        "volatility": rolling.volatility,
        "rsi": rsi,
        "rsi_state": rsi_state,
        "macd": macd.macd,
        "macd_signal": macd.signal,
        "macd_hist": macd.histogram,
    })))
}

/// Chart fetch via the TTL cache: serve a fresh cached series or fetch and
/// store one.
async fn fetch_chart_cached(
    ctx: &ApiContext,
    coin_id: &str,
    vs_currency: &str,
    days: u32,
) -> anyhow::Result<TimeSeries> {
    let cache_key = format!("{coin_id}:{vs_currency}:{days}");
    if let Some(series) = ctx.state.chart_cache.get(&cache_key) {
        return Ok(series);
    }
    let series = ctx
        .provider
        .fetch_market_chart(coin_id, vs_currency, days)
        .await?;
    ctx.state.chart_cache.insert(cache_key, series.clone());
    Ok(series)
}

// =============================================================================
// Movers — period-over-period ranking and alerts
// =============================================================================

async fn movers_report(
    State(ctx): State<ApiContext>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let Some((previous, latest)) = ctx.state.history.latest_pair() else {
        // Not an empty report: "no data yet" must be distinguishable from
        // "no movement".
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "insufficient snapshot history: need two refreshes before movers can be computed",
        ));
    };

    let (threshold, top_k) = {
        let config = ctx.state.runtime_config.read();
        (config.alert_threshold_pct, config.top_k)
    };

    let report = movers(&previous, &latest, threshold, top_k)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    Ok(Json(serde_json::json!({
        "previous_taken_at": previous.taken_at,
        "latest_taken_at": latest.taken_at,
        "threshold_pct": threshold,
        "gainers": report.gainers,
        "losers": report.losers,
        "alerts": report.alerts,
        "undefined": report.undefined,
    })))
}

// =============================================================================
// Portfolio — holdings in, valuation out
// =============================================================================

async fn portfolio(
    State(ctx): State<ApiContext>,
    Json(holdings): Json<Vec<Holding>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let prices = ctx.state.symbol_prices();
    if prices.is_empty() {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "no market data yet — try again after the first refresh",
        ));
    }

    let valuation = value_portfolio(&holdings, &prices);
    Ok(Json(serde_json::to_value(valuation).unwrap_or_default()))
}

// =============================================================================
// Correlation — cross-coin daily returns
// =============================================================================

#[derive(Deserialize)]
struct CorrelationRequest {
    ids: Vec<String>,
    #[serde(default)]
    days: Option<u32>,
}

async fn correlation(
    State(ctx): State<ApiContext>,
    Json(req): Json<CorrelationRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if req.ids.len() < 2 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "correlation needs at least two coin ids",
        ));
    }

    let (vs_currency, days) = {
        let config = ctx.state.runtime_config.read();
        (config.vs_currency.clone(), req.days.unwrap_or(config.hist_days))
    };

    // One failing coin drops out with a warning; the matrix is computed over
    // the rest.
    let mut series_list: Vec<(String, Vec<f64>)> = Vec::with_capacity(req.ids.len());
    let mut skipped: Vec<String> = Vec::new();
    for coin_id in &req.ids {
        match fetch_chart_cached(&ctx, coin_id, &vs_currency, days).await {
            Ok(series) => series_list.push((coin_id.clone(), series.prices())),
            Err(e) => {
                warn!(coin_id = %coin_id, error = %e, "skipping coin in correlation request");
                ctx.state.record_error(format!("correlation fetch for '{coin_id}': {e:#}"));
                skipped.push(coin_id.clone());
            }
        }
    }

    if series_list.len() < 2 {
        return Err(error_response(
            StatusCode::BAD_GATEWAY,
            "fewer than two coins could be fetched",
        ));
    }

    let matrix = returns_correlation(&series_list)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    Ok(Json(serde_json::json!({
        "ids": matrix.ids,
        "matrix": matrix.matrix,
        "skipped": skipped,
    })))
}

// =============================================================================
// Config — read and update runtime parameters
// =============================================================================

async fn get_config(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let config = ctx.state.runtime_config.read().clone();
    Json(config)
}

#[derive(Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    per_page: Option<u32>,
    #[serde(default)]
    refresh_interval_secs: Option<u64>,
    #[serde(default)]
    hist_days: Option<u32>,
    #[serde(default)]
    rolling_window: Option<usize>,
    #[serde(default)]
    rsi_window: Option<usize>,
    #[serde(default)]
    alert_threshold_pct: Option<f64>,
    #[serde(default)]
    top_k: Option<usize>,
}

async fn set_config(
    State(ctx): State<ApiContext>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if let Some(t) = update.alert_threshold_pct {
        if !t.is_finite() || t <= 0.0 {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("alert_threshold_pct must be positive, got {t}"),
            ));
        }
    }
    for (name, value) in [
        ("rolling_window", update.rolling_window),
        ("rsi_window", update.rsi_window),
        ("top_k", update.top_k),
    ] {
        if value == Some(0) {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("{name} must be at least 1"),
            ));
        }
    }

    let mut changes = Vec::new();
    let config_clone = {
        let mut config = ctx.state.runtime_config.write();

        macro_rules! apply_field {
            ($field:ident) => {
                if let Some(val) = update.$field {
                    if config.$field != val {
                        changes.push(format!(
                            "{}: {} -> {}",
                            stringify!($field),
                            config.$field,
                            val
                        ));
                        config.$field = val;
                    }
                }
            };
        }

        apply_field!(per_page);
        apply_field!(refresh_interval_secs);
        apply_field!(hist_days);
        apply_field!(rolling_window);
        apply_field!(rsi_window);
        apply_field!(alert_threshold_pct);
        apply_field!(top_k);

        config.clone()
    };

    if !changes.is_empty() {
        info!(changes = ?changes, "runtime config updated via API");

        // Save to disk (best-effort).
        if let Err(e) = config_clone.save("coinpulse_config.json") {
            warn!(error = %e, "failed to save config to disk");
        }
        ctx.state.increment_version();
    }

    Ok(Json(serde_json::json!({
        "config": config_clone,
        "changes": changes,
    })))
}
