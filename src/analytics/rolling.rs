// =============================================================================
// Rolling Statistics — trailing mean and volatility
// =============================================================================
//
// Trailing, inclusive window: the point at index `i` is the last element of
// its own window `[i-w+1, i]`.  Volatility is the *sample* standard deviation
// (Bessel's correction, `w - 1` divisor), so a window of 1 has no defined
// volatility at all — the guard is explicit, not an accident of division.

use crate::analytics::series::TimeSeries;
use crate::analytics::AnalyticsError;

/// Output of [`rolling_stats`], parallel to the input series' timestamps.
///
/// Indices whose window has not yet filled are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingStats {
    pub mean: Vec<Option<f64>>,
    pub volatility: Vec<Option<f64>>,
}

/// Compute trailing mean and sample standard deviation over a fixed window.
///
/// # Errors
/// - [`AnalyticsError::InvalidWindow`] when `window == 0`.
/// - [`AnalyticsError::InsufficientHistory`] when the series is empty.
pub fn rolling_stats(series: &TimeSeries, window: usize) -> Result<RollingStats, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidWindow { window });
    }
    if series.is_empty() {
        return Err(AnalyticsError::InsufficientHistory {
            asset_id: series.asset_id().to_string(),
        });
    }

    let prices = series.prices();
    let n = prices.len();
    let mut mean = vec![None; n];
    let mut volatility = vec![None; n];

    for i in 0..n {
        if i + 1 < window {
            continue; // Window not yet full — leading undefined region.
        }

        let slice = &prices[i + 1 - window..=i];
        let m = slice.iter().sum::<f64>() / window as f64;
        mean[i] = Some(m);

        if window >= 2 {
            let sq_dev: f64 = slice.iter().map(|x| (x - m).powi(2)).sum();
            volatility[i] = Some((sq_dev / (window - 1) as f64).sqrt());
        }
        // window == 1: volatility stays None (sample std undefined).
    }

    Ok(RollingStats { mean, volatility })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::series::tests::series_of;

    #[test]
    fn mean_last_index_hand_computed() {
        // prices [1,2,3,4,5], w=3 => last rolling mean = (3+4+5)/3 = 4.
        let series = series_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let stats = rolling_stats(&series, 3).unwrap();
        assert_eq!(stats.mean.len(), 5);
        assert!((stats.mean[4].unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn leading_region_is_undefined() {
        let series = series_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let stats = rolling_stats(&series, 3).unwrap();
        assert_eq!(stats.mean[0], None);
        assert_eq!(stats.mean[1], None);
        assert!(stats.mean[2].is_some());
        assert_eq!(stats.volatility[1], None);
        assert!(stats.volatility[2].is_some());
    }

    #[test]
    fn volatility_uses_bessel_correction() {
        // Window [1,2,3]: mean 2, squared deviations 1+0+1 = 2,
        // sample variance 2/(3-1) = 1, std = 1.
        let series = series_of(&[1.0, 2.0, 3.0]);
        let stats = rolling_stats(&series, 3).unwrap();
        assert!((stats.volatility[2].unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn window_of_one_has_no_volatility() {
        let series = series_of(&[5.0, 6.0, 7.0]);
        let stats = rolling_stats(&series, 1).unwrap();
        // Mean of a 1-window is the price itself, defined everywhere.
        assert_eq!(stats.mean, vec![Some(5.0), Some(6.0), Some(7.0)]);
        assert_eq!(stats.volatility, vec![None, None, None]);
    }

    #[test]
    fn flat_window_has_zero_volatility() {
        let series = series_of(&[4.0, 4.0, 4.0, 4.0]);
        let stats = rolling_stats(&series, 3).unwrap();
        assert!(stats.volatility[3].unwrap().abs() < 1e-10);
    }

    #[test]
    fn window_zero_is_rejected() {
        let series = series_of(&[1.0, 2.0]);
        assert_eq!(
            rolling_stats(&series, 0),
            Err(AnalyticsError::InvalidWindow { window: 0 })
        );
    }

    #[test]
    fn empty_series_is_rejected() {
        let series = TimeSeries::from_prices("btc", Vec::new()).unwrap();
        assert!(matches!(
            rolling_stats(&series, 3),
            Err(AnalyticsError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn window_longer_than_series_yields_all_undefined() {
        let series = series_of(&[1.0, 2.0]);
        let stats = rolling_stats(&series, 5).unwrap();
        assert!(stats.mean.iter().all(Option::is_none));
        assert!(stats.volatility.iter().all(Option::is_none));
    }

    #[test]
    fn idempotent_on_same_input() {
        let series = series_of(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let first = rolling_stats(&series, 4).unwrap();
        let second = rolling_stats(&series, 4).unwrap();
        assert_eq!(first, second);
    }
}
