//! Order director: translates desired exposure into order intents.
//!
//! Pure translation. No fill tracking, no retries; the platform owns
//! execution results.

use log::{info, warn};
use std::collections::HashMap;
use std::fmt;

use crate::domain::gap::ShortList;
use crate::ports::order_port::OrderPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStyle {
    Market,
}

/// Signed size of an order. Negative sells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderAmount {
    /// Dollar value to trade; the platform converts it to shares.
    Notional(f64),
    /// Share count.
    Quantity(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub asset_id: String,
    pub amount: OrderAmount,
    pub style: ExecutionStyle,
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.amount {
            OrderAmount::Notional(value) => write!(f, "{} ${:.2} MKT", self.asset_id, value),
            OrderAmount::Quantity(qty) => write!(f, "{} {} sh MKT", self.asset_id, qty),
        }
    }
}

/// One short order per listed asset, sized at `-notional_per_name` dollars.
pub fn open_shorts(short_list: ShortList, notional_per_name: f64) -> Vec<OrderRequest> {
    let target = -notional_per_name.abs();
    short_list
        .into_asset_ids()
        .into_iter()
        .map(|asset_id| OrderRequest {
            asset_id,
            amount: OrderAmount::Notional(target),
            style: ExecutionStyle::Market,
        })
        .collect()
}

/// One order per non-zero position for the exact inverse quantity,
/// ordered by asset id.
pub fn flatten(positions: &HashMap<String, i64>) -> Vec<OrderRequest> {
    let mut held: Vec<(&String, i64)> = positions
        .iter()
        .filter(|(_, qty)| **qty != 0)
        .map(|(id, qty)| (id, *qty))
        .collect();
    held.sort_by(|a, b| a.0.cmp(b.0));

    held.into_iter()
        .map(|(asset_id, qty)| OrderRequest {
            asset_id: asset_id.clone(),
            amount: OrderAmount::Quantity(-qty),
            style: ExecutionStyle::Market,
        })
        .collect()
}

/// Submit every request; a rejection is logged and the rest still go out.
/// Returns how many were accepted.
pub fn submit_all(orders: &[OrderRequest], order_port: &dyn OrderPort) -> usize {
    let mut accepted = 0;
    for order in orders {
        match order_port.submit(order) {
            Ok(order_id) => {
                info!("submitted {} ({})", order, order_id);
                accepted += 1;
            }
            Err(e) => warn!("order {} not accepted: {}", order, e),
        }
    }
    accepted
}
