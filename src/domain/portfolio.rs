//! Cash, positions, fills and equity for a replayed account.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub asset_id: String,
    pub quantity: i64,
    pub price: f64,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            fills: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Book a signed fill. Buying spends cash, selling (short or not) adds it.
    pub fn apply_fill(&mut self, date: NaiveDate, asset_id: &str, quantity: i64, price: f64) {
        let position = self
            .positions
            .entry(asset_id.to_string())
            .or_insert_with(|| Position::flat(asset_id));
        let realized_pnl = position.apply_fill(quantity, price);
        if position.is_flat() {
            self.positions.remove(asset_id);
        }

        self.cash -= quantity as f64 * price;
        self.fills.push(Fill {
            date,
            asset_id: asset_id.to_string(),
            quantity,
            price,
            realized_pnl,
        });
    }

    /// Non-zero quantities keyed by asset.
    pub fn quantities(&self) -> HashMap<String, i64> {
        self.positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| (p.asset_id.clone(), p.quantity))
            .collect()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.fills.iter().map(|f| f.realized_pnl).sum()
    }

    /// Cash plus signed position values. Positions without a price are
    /// carried at cost.
    pub fn total_equity(&self, price_map: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = price_map.get(&pos.asset_id).copied().unwrap_or(pos.avg_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }
}
