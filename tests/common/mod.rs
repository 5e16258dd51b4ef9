#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use sellgap::domain::error::SellgapError;
pub use sellgap::domain::ohlcv::{OhlcvBar, PriceField};
use sellgap::domain::order::OrderRequest;
use sellgap::domain::strategy::Platform;
use sellgap::domain::universe::{Asset, SecurityType};
use sellgap::ports::data_port::DataPort;
use sellgap::ports::ledger_port::LedgerPort;
use sellgap::ports::order_port::OrderPort;
use sellgap::ports::quote_port::QuotePort;
use sellgap::ports::realtime_port::RealtimePort;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub struct MockDataPort {
    pub assets: Vec<Asset>,
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            assets: Vec::new(),
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_stock(self, asset_id: &str, bars: Vec<OhlcvBar>) -> Self {
        self.with_asset(asset_id, SecurityType::CommonStock, bars)
    }

    pub fn with_asset(mut self, asset_id: &str, security_type: SecurityType, bars: Vec<OhlcvBar>) -> Self {
        self.assets.push(Asset::new(asset_id, security_type));
        self.data.insert(asset_id.to_string(), bars);
        self
    }

    pub fn with_error(mut self, asset_id: &str, reason: &str) -> Self {
        self.assets
            .push(Asset::new(asset_id, SecurityType::CommonStock));
        self.errors.insert(asset_id.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn list_assets(&self) -> Result<Vec<Asset>, SellgapError> {
        Ok(self.assets.clone())
    }

    fn fetch_ohlcv(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SellgapError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = self.errors.get(asset_id) {
            return Err(SellgapError::data(reason.clone()));
        }
        Ok(self
            .data
            .get(asset_id)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockQuotePort {
    pub prices: HashMap<String, f64>,
    pub fail: bool,
    pub calls: Cell<usize>,
    pub requested: RefCell<Vec<(Vec<String>, PriceField)>>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset_id: &str, price: f64) -> Self {
        self.prices.insert(asset_id.to_string(), price);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl QuotePort for MockQuotePort {
    fn current(
        &self,
        asset_ids: &[String],
        field: PriceField,
    ) -> Result<HashMap<String, f64>, SellgapError> {
        self.calls.set(self.calls.get() + 1);
        self.requested.borrow_mut().push((asset_ids.to_vec(), field));
        if self.fail {
            return Err(SellgapError::data("quote feed down"));
        }
        Ok(asset_ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), *p)))
            .collect())
    }
}

#[derive(Default)]
pub struct MockLedger {
    pub positions: HashMap<String, i64>,
    pub fail: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(mut self, asset_id: &str, quantity: i64) -> Self {
        self.positions.insert(asset_id.to_string(), quantity);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl LedgerPort for MockLedger {
    fn positions(&self) -> Result<HashMap<String, i64>, SellgapError> {
        if self.fail {
            return Err(SellgapError::data("ledger unavailable"));
        }
        Ok(self.positions.clone())
    }
}

#[derive(Default)]
pub struct RecordingOrderPort {
    pub submitted: RefCell<Vec<OrderRequest>>,
    pub reject: HashSet<String>,
}

impl RecordingOrderPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, asset_id: &str) -> Self {
        self.reject.insert(asset_id.to_string());
        self
    }

    pub fn count(&self) -> usize {
        self.submitted.borrow().len()
    }
}

impl OrderPort for RecordingOrderPort {
    fn submit(&self, request: &OrderRequest) -> Result<String, SellgapError> {
        self.submitted.borrow_mut().push(request.clone());
        if self.reject.contains(&request.asset_id) {
            return Err(SellgapError::OrderRejected {
                asset: request.asset_id.clone(),
                reason: "not borrowable".into(),
            });
        }
        Ok(format!("O{}", self.count()))
    }
}

#[derive(Default)]
pub struct MockRealtime {
    pub fail: bool,
    pub collected: RefCell<Vec<(Vec<String>, NaiveTime)>>,
    pub switched: Cell<bool>,
}

impl MockRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl RealtimePort for MockRealtime {
    fn collect_market_data(&self, asset_ids: &[String], until: NaiveTime) -> Result<(), SellgapError> {
        self.collected.borrow_mut().push((asset_ids.to_vec(), until));
        if self.fail {
            return Err(SellgapError::Subscription {
                reason: "entitlement missing".into(),
            });
        }
        Ok(())
    }

    fn switch_to_aggregate_feed(&self) -> Result<(), SellgapError> {
        self.switched.set(true);
        Ok(())
    }
}

pub fn platform<'a>(
    data: &'a MockDataPort,
    quotes: &'a MockQuotePort,
    ledger: &'a MockLedger,
    orders: &'a RecordingOrderPort,
) -> Platform<'a> {
    Platform {
        data,
        quotes,
        ledger,
        orders,
        realtime: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// First date of every generated series.
pub fn history_start() -> NaiveDate {
    date(2024, 1, 1)
}

/// One bar per calendar day from `history_start()`, close rising by
/// `step` each day. Low is close - 1, high close + 1, open close - 0.5.
pub fn generate_bars(
    asset_id: &str,
    count: usize,
    start_price: f64,
    step: f64,
    volume: i64,
) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            OhlcvBar {
                asset_id: asset_id.to_string(),
                date: history_start() + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            }
        })
        .collect()
}

/// The day right after `count` generated bars.
pub fn day_after(count: usize) -> NaiveDate {
    history_start() + chrono::Duration::days(count as i64)
}
