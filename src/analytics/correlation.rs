// =============================================================================
// Returns Correlation — pairwise Pearson over daily percent changes
// =============================================================================
//
// Feeds the cross-coin comparison view: each price series is converted to
// percent returns, then every pair is correlated over the indices where both
// returns are defined.  Series are aligned from the most recent observation
// backwards and truncated to the shortest length.
//
// A pair with fewer than two common returns, or with a zero-variance side,
// has no meaningful correlation — the cell is `None`, never NaN.

use serde::Serialize;

use crate::analytics::AnalyticsError;

/// Symmetric correlation matrix; `matrix[i][j]` pairs `ids[i]` with `ids[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub ids: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
}

/// Correlate daily percent returns across the given price series.
///
/// # Errors
/// [`AnalyticsError::InsufficientHistory`] when any series has fewer than two
/// observations (no return can be formed).
pub fn returns_correlation(
    series_list: &[(String, Vec<f64>)],
) -> Result<CorrelationMatrix, AnalyticsError> {
    for (id, prices) in series_list {
        if prices.len() < 2 {
            return Err(AnalyticsError::InsufficientHistory {
                asset_id: id.clone(),
            });
        }
    }

    let min_len = series_list
        .iter()
        .map(|(_, p)| p.len())
        .min()
        .unwrap_or(0);

    // Align on the most recent `min_len` observations, then take returns.
    let returns: Vec<Vec<Option<f64>>> = series_list
        .iter()
        .map(|(_, prices)| pct_returns(&prices[prices.len() - min_len..]))
        .collect();

    let n = series_list.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        matrix[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&returns[i], &returns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        ids: series_list.iter().map(|(id, _)| id.clone()).collect(),
        matrix,
    })
}

/// Percent returns; a zero base makes that return undefined.
fn pct_returns(prices: &[f64]) -> Vec<Option<f64>> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] == 0.0 {
                None
            } else {
                Some((w[1] - w[0]) / w[0] * 100.0)
            }
        })
        .collect()
}

/// Pearson correlation over indices where both sides are defined.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((((*x)?), ((*y)?))))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None; // Constant returns on one side — correlation undefined.
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(id: &str, prices: &[f64]) -> (String, Vec<f64>) {
        (id.to_string(), prices.to_vec())
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let out = returns_correlation(&[
            named("a", &[1.0, 2.0, 3.0, 2.0, 4.0]),
            named("b", &[10.0, 20.0, 30.0, 20.0, 40.0]),
        ])
        .unwrap();
        assert!((out.matrix[0][1].unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn inverse_series_correlate_negatively() {
        // Returns of b are the negation of returns of a in sign at each step.
        let out = returns_correlation(&[
            named("a", &[100.0, 110.0, 100.0, 110.0]),
            named("b", &[100.0, 90.0, 100.0, 90.0]),
        ])
        .unwrap();
        assert!(out.matrix[0][1].unwrap() < -0.99);
    }

    #[test]
    fn diagonal_is_one_and_matrix_symmetric() {
        let out = returns_correlation(&[
            named("a", &[1.0, 2.0, 1.5]),
            named("b", &[3.0, 2.0, 2.5]),
        ])
        .unwrap();
        assert_eq!(out.matrix[0][0], Some(1.0));
        assert_eq!(out.matrix[1][1], Some(1.0));
        assert_eq!(out.matrix[0][1], out.matrix[1][0]);
    }

    #[test]
    fn flat_series_has_undefined_correlation() {
        let out = returns_correlation(&[
            named("flat", &[5.0, 5.0, 5.0, 5.0]),
            named("moving", &[1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(out.matrix[0][1], None);
    }

    #[test]
    fn unequal_lengths_align_on_recent_overlap() {
        let out = returns_correlation(&[
            named("long", &[9.0, 9.0, 1.0, 2.0, 3.0]),
            named("short", &[1.0, 2.0, 3.0]),
        ])
        .unwrap();
        // Only the last 3 prices of "long" are used; those match "short".
        assert!((out.matrix[0][1].unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn too_short_series_is_rejected() {
        let err = returns_correlation(&[named("a", &[1.0])]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientHistory { .. }));
    }
}
