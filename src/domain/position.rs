//! Signed position with average-cost accounting.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub asset_id: String,
    pub quantity: i64,
    pub avg_price: f64,
}

impl Position {
    pub fn flat(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            quantity: 0,
            avg_price: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    /// Signed value at `price`: negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.avg_price)
    }

    /// Apply a signed fill and return the P&L it realizes. Adding to a
    /// position re-averages the cost; reducing realizes against it; a
    /// fill that crosses zero opens the remainder at the fill price.
    pub fn apply_fill(&mut self, quantity: i64, price: f64) -> f64 {
        if quantity == 0 {
            return 0.0;
        }

        if self.quantity == 0 || self.quantity.signum() == quantity.signum() {
            let new_qty = self.quantity + quantity;
            self.avg_price = (self.quantity as f64 * self.avg_price + quantity as f64 * price)
                / new_qty as f64;
            self.quantity = new_qty;
            return 0.0;
        }

        let closing = quantity.abs().min(self.quantity.abs());
        let realized = closing as f64 * (price - self.avg_price) * self.quantity.signum() as f64;
        let remaining = self.quantity + quantity;

        if remaining == 0 {
            self.avg_price = 0.0;
        } else if remaining.signum() != self.quantity.signum() {
            self.avg_price = price;
        }
        self.quantity = remaining;
        realized
    }
}
