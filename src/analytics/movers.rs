// =============================================================================
// Movers & Alerts — snapshot-to-snapshot percentage-change ranking
// =============================================================================
//
// Compares the two most recent market cross-sections: inner-join on asset id,
// compute period-over-period percentage change, rank, and flag everything
// whose absolute change exceeds the caller's threshold (strict `>`).
//
// Assets present in only one snapshot are silently excluded — a listing
// appearing or disappearing between refreshes is normal, not an error.  An
// asset whose previous price is exactly 0 has no defined change; it is kept
// out of both ranking and alerting rather than producing infinity.
//
// The caller is responsible for having two distinct snapshots at hand (see
// `SnapshotHistory::latest_pair`); the engine itself only verifies that both
// cross-sections are non-empty and actually overlap.

use serde::Serialize;

use crate::analytics::AnalyticsError;
use crate::types::MarketSnapshot;

/// Percentage change of one asset between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PctChange {
    pub asset_id: String,
    pub pct_change: f64,
}

/// Ranked movers plus the threshold-filtered alert set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoversReport {
    /// Largest `top_k` percentage changes, best first.
    pub gainers: Vec<PctChange>,
    /// Smallest `top_k` percentage changes, worst first.
    pub losers: Vec<PctChange>,
    /// Every joined asset with `|pct_change| > threshold`, largest magnitude
    /// first.  Never capped.
    pub alerts: Vec<PctChange>,
    /// Joined assets whose previous price was 0 — change undefined.
    pub undefined: Vec<String>,
}

/// Rank movers between `previous` and `latest` and build the alert set.
///
/// # Errors
/// - [`AnalyticsError::InvalidThreshold`] unless `threshold` is finite and
///   positive.
/// - [`AnalyticsError::EmptySnapshot`] when either cross-section is empty.
/// - [`AnalyticsError::NoOverlap`] when the snapshots share no asset ids.
pub fn movers(
    previous: &MarketSnapshot,
    latest: &MarketSnapshot,
    threshold: f64,
    top_k: usize,
) -> Result<MoversReport, AnalyticsError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(AnalyticsError::InvalidThreshold { threshold });
    }
    if previous.is_empty() {
        return Err(AnalyticsError::EmptySnapshot { which: "previous" });
    }
    if latest.is_empty() {
        return Err(AnalyticsError::EmptySnapshot { which: "latest" });
    }

    let mut changes: Vec<PctChange> = Vec::new();
    let mut undefined: Vec<String> = Vec::new();
    let mut joined = 0usize;

    for (asset_id, new_point) in &latest.points {
        let Some(old_point) = previous.points.get(asset_id) else {
            continue; // Present in only one snapshot.
        };
        joined += 1;

        if old_point.price == 0.0 {
            undefined.push(asset_id.clone());
            continue;
        }

        changes.push(PctChange {
            asset_id: asset_id.clone(),
            pct_change: (new_point.price - old_point.price) / old_point.price * 100.0,
        });
    }

    if joined == 0 {
        return Err(AnalyticsError::NoOverlap);
    }

    // Descending by change; ties keep a stable id order for determinism.
    changes.sort_unstable_by(|a, b| {
        b.pct_change
            .partial_cmp(&a.pct_change)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });
    undefined.sort_unstable();

    let gainers: Vec<PctChange> = changes.iter().take(top_k).cloned().collect();
    let losers: Vec<PctChange> = changes.iter().rev().take(top_k).cloned().collect();

    let mut alerts: Vec<PctChange> = changes
        .iter()
        .filter(|c| c.pct_change.abs() > threshold)
        .cloned()
        .collect();
    alerts.sort_unstable_by(|a, b| {
        b.pct_change
            .abs()
            .partial_cmp(&a.pct_change.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });

    Ok(MoversReport {
        gainers,
        losers,
        alerts,
        undefined,
    })
}
