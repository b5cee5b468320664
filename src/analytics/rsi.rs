// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// Step 1 — Split consecutive price deltas into gains and losses.
// Step 2 — Smooth each side with an exponential moving average using
//            alpha = 1 / window
//          seeded from the first delta itself: avg[0] = value[0].  There is
//          no simple-average warm-up period, so the first defined RSI appears
//          at index 1.
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The RS division is guarded: with no losses RSI saturates at 100, and a
// perfectly flat window (no gains *and* no losses) resolves to RSI_NEUTRAL
// instead of 0/0.
//
// Thresholds: RSI > 70 => overbought, RSI < 30 => oversold.  That reading is
// the consumer's business; the engine only produces the series.

use crate::analytics::series::TimeSeries;
use crate::analytics::AnalyticsError;

/// RSI reported when a series shows no movement at all (`avg_gain` and
/// `avg_loss` both zero).  The natural recurrence would be 0/0; "no clear
/// trend" maps to the middle of the scale.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Compute the RSI series for `series`, parallel to its timestamps.
///
/// Index 0 has no prior price, hence no delta and no RSI — it is `None`.
/// Every defined value lies in `[0, 100]`.
///
/// # Errors
/// - [`AnalyticsError::InvalidWindow`] when `window == 0`.
/// - [`AnalyticsError::InsufficientHistory`] when the series is empty.
pub fn rsi_series(series: &TimeSeries, window: usize) -> Result<Vec<Option<f64>>, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidWindow { window });
    }
    if series.is_empty() {
        return Err(AnalyticsError::InsufficientHistory {
            asset_id: series.asset_id().to_string(),
        });
    }

    let prices = series.prices();
    let alpha = 1.0 / window as f64;

    let mut out = Vec::with_capacity(prices.len());
    out.push(None); // No delta at index 0.

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, pair) in prices.windows(2).enumerate() {
        let delta = pair[1] - pair[0];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        if i == 0 {
            // Seed the recurrence with the first delta.
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        }

        out.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }

    Ok(out)
}

/// Label an RSI value with the conventional 70/30 reading.
pub fn classify_rsi(value: f64) -> &'static str {
    if value > 70.0 {
        "overbought"
    } else if value < 30.0 {
        "oversold"
    } else {
        "neutral"
    }
}

/// Convert smoothed averages into an RSI value in `[0, 100]`.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        RSI_NEUTRAL
    } else if avg_loss == 0.0 {
        100.0 // Only gains in memory.
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}
