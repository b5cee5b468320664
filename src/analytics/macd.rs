// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD is the spread between a fast and a slow EMA of price; the signal line
// is an EMA of the MACD itself; the histogram is their difference.
//
//   alpha      = 2 / (span + 1)
//   ema[0]     = value[0]
//   ema[i]     = value[i] * alpha + ema[i-1] * (1 - alpha)
//
// Because every EMA is seeded with the first value, all three outputs are
// defined from index 0 onward.  This is deliberately different from RSI and
// the rolling statistics, which have a leading undefined region — the output
// type here uses plain `f64`, not `Option`, to make the contract visible.
//
// MACD/signal crossovers are the conventional trend-shift reading; that
// interpretation is left to the consumer.

use crate::analytics::series::TimeSeries;
use crate::analytics::AnalyticsError;

/// Output of [`macd_series`], each column parallel to the input timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD, signal line, and histogram for `series`.
///
/// # Errors
/// - [`AnalyticsError::InvalidWindow`] when any span is 0.
/// - [`AnalyticsError::InvalidSpans`] unless `fast < slow`.
/// - [`AnalyticsError::InsufficientHistory`] when the series is empty.
pub fn macd_series(
    series: &TimeSeries,
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, AnalyticsError> {
    for span in [fast, slow, signal] {
        if span == 0 {
            return Err(AnalyticsError::InvalidWindow { window: span });
        }
    }
    if fast >= slow {
        return Err(AnalyticsError::InvalidSpans { fast, slow });
    }
    if series.is_empty() {
        return Err(AnalyticsError::InsufficientHistory {
            asset_id: series.asset_id().to_string(),
        });
    }

    let prices = series.prices();
    let ema_fast = ema_span(&prices, fast);
    let ema_slow = ema_span(&prices, slow);

    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_span(&macd, signal);
    let histogram: Vec<f64> = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    })
}

/// Span-parameterised EMA seeded with the first value, so the output has the
/// same length as the input.
fn ema_span(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);
    for &v in &values[1..] {
        prev = v * alpha + prev * (1.0 - alpha);
        out.push(prev);
    }
    out
}
