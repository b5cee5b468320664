// =============================================================================
// Portfolio Valuation — manual holdings P&L
// =============================================================================
//
// Pure valuation: user-entered (symbol, quantity, purchase price) triples
// joined against current prices.  Holdings without a current price are
// reported as skipped, not errored, so one unknown symbol never sinks the
// whole portfolio.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One user-entered holding.
#[derive(Debug, Clone, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
}

/// Valuation of a single holding at current prices.
#[derive(Debug, Clone, Serialize)]
pub struct PositionValuation {
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub cost_basis: f64,
    /// `None` when the cost basis is 0 (nothing paid, P&L% undefined).
    pub pnl_pct: Option<f64>,
    /// Share of total portfolio value; `None` when the total is 0.
    pub allocation_pct: Option<f64>,
}

/// Whole-portfolio valuation.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub positions: Vec<PositionValuation>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_pnl_pct: Option<f64>,
    /// Symbols with no current price available.
    pub skipped: Vec<String>,
}

/// Value `holdings` against `current_prices` (symbol -> latest price).
pub fn value_portfolio(
    holdings: &[Holding],
    current_prices: &HashMap<String, f64>,
) -> PortfolioValuation {
    let mut positions = Vec::with_capacity(holdings.len());
    let mut skipped = Vec::new();
    let mut total_value = 0.0;
    let mut total_cost = 0.0;

    for h in holdings {
        let Some(&current_price) = current_prices.get(&h.symbol) else {
            skipped.push(h.symbol.clone());
            continue;
        };

        let current_value = h.quantity * current_price;
        let cost_basis = h.quantity * h.purchase_price;
        let pnl_pct = if cost_basis == 0.0 {
            None
        } else {
            Some((current_value - cost_basis) / cost_basis * 100.0)
        };

        total_value += current_value;
        total_cost += cost_basis;

        positions.push(PositionValuation {
            symbol: h.symbol.clone(),
            quantity: h.quantity,
            purchase_price: h.purchase_price,
            current_price,
            current_value,
            cost_basis,
            pnl_pct,
            allocation_pct: None, // Filled in once the total is known.
        });
    }

    for pos in &mut positions {
        pos.allocation_pct = if total_value == 0.0 {
            None
        } else {
            Some(pos.current_value / total_value * 100.0)
        };
    }

    let total_pnl_pct = if total_cost == 0.0 {
        None
    } else {
        Some((total_value - total_cost) / total_cost * 100.0)
    };

    PortfolioValuation {
        positions,
        total_value,
        total_cost,
        total_pnl_pct,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|&(s, p)| (s.to_string(), p))
            .collect()
    }

    fn holding(symbol: &str, quantity: f64, purchase_price: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            quantity,
            purchase_price,
        }
    }

    #[test]
    fn pnl_hand_computed() {
        let valuation = value_portfolio(
            &[holding("btc", 2.0, 100.0)],
            &prices(&[("btc", 150.0)]),
        );
        let pos = &valuation.positions[0];
        assert!((pos.current_value - 300.0).abs() < 1e-10);
        assert!((pos.cost_basis - 200.0).abs() < 1e-10);
        assert!((pos.pnl_pct.unwrap() - 50.0).abs() < 1e-10);
        assert!((valuation.total_pnl_pct.unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn allocation_sums_to_hundred() {
        let valuation = value_portfolio(
            &[holding("btc", 1.0, 100.0), holding("eth", 10.0, 10.0)],
            &prices(&[("btc", 300.0), ("eth", 10.0)]),
        );
        let total: f64 = valuation
            .positions
            .iter()
            .map(|p| p.allocation_pct.unwrap())
            .sum();
        assert!((total - 100.0).abs() < 1e-10);
        assert!((valuation.positions[0].allocation_pct.unwrap() - 75.0).abs() < 1e-10);
    }

    #[test]
    fn unknown_symbol_is_skipped_not_fatal() {
        let valuation = value_portfolio(
            &[holding("btc", 1.0, 100.0), holding("doesnotexist", 5.0, 1.0)],
            &prices(&[("btc", 120.0)]),
        );
        assert_eq!(valuation.positions.len(), 1);
        assert_eq!(valuation.skipped, vec!["doesnotexist".to_string()]);
    }

    #[test]
    fn zero_cost_basis_has_undefined_pnl() {
        let valuation = value_portfolio(
            &[holding("air", 10.0, 0.0)],
            &prices(&[("air", 2.0)]),
        );
        assert_eq!(valuation.positions[0].pnl_pct, None);
        assert_eq!(valuation.total_pnl_pct, None);
        assert!((valuation.total_value - 20.0).abs() < 1e-10);
    }

    #[test]
    fn empty_portfolio_valuates_to_zero() {
        let valuation = value_portfolio(&[], &prices(&[]));
        assert!(valuation.positions.is_empty());
        assert_eq!(valuation.total_value, 0.0);
        assert_eq!(valuation.total_pnl_pct, None);
    }
}
