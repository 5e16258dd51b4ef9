//! Historical replay parameters, fill pricing and summary.

use chrono::NaiveDate;

use super::portfolio::Portfolio;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub slippage_bps: f64,
}

/// Buys pay up, sells give up: price * (1 ± bps / 10_000).
pub fn apply_slippage(market_price: f64, quantity: i64, slippage_bps: f64) -> f64 {
    let adj = slippage_bps / 10_000.0;
    if quantity > 0 {
        market_price * (1.0 + adj)
    } else {
        market_price * (1.0 - adj)
    }
}

/// Whole shares for a signed dollar amount, rounded toward zero.
pub fn shares_for_notional(notional: f64, price: f64) -> i64 {
    if price <= 0.0 || !price.is_finite() {
        return 0;
    }
    (notional / price).trunc() as i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub sessions: usize,
    pub fills: usize,
    pub realized_pnl: f64,
    pub initial_capital: f64,
    pub final_equity: f64,
}

impl BacktestSummary {
    pub fn from_portfolio(portfolio: &Portfolio, sessions: usize) -> Self {
        let final_equity = portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(portfolio.cash);
        Self {
            sessions,
            fills: portfolio.fills.len(),
            realized_pnl: portfolio.realized_pnl(),
            initial_capital: portfolio.initial_capital,
            final_equity,
        }
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_capital == 0.0 {
            return 0.0;
        }
        self.final_equity / self.initial_capital - 1.0
    }
}
