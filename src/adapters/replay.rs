//! Historical replay venue.
//!
//! Stands in for the execution platform when replaying daily bars: it
//! serves the current session's prices as quotes, keeps the position
//! ledger and fills market orders at the marked price plus slippage.
//! `run_replay` walks the sessions and fires each day's triggers in time
//! order.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeMap, HashMap};

use crate::domain::backtest::{apply_slippage, shares_for_notional, BacktestConfig, BacktestSummary};
use crate::domain::error::SellgapError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use crate::domain::order::{OrderAmount, OrderRequest};
use crate::domain::portfolio::Portfolio;
use crate::domain::strategy::{Platform, SellGapStrategy};
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::order_port::OrderPort;
use crate::ports::quote_port::QuotePort;

/// Which price of the session the venue currently trades at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Open,
    Close,
}

impl Mark {
    fn price(&self, bar: &OhlcvBar) -> f64 {
        match self {
            Mark::Open => bar.open,
            Mark::Close => bar.close,
        }
    }

    /// Fields already known at this point of the session.
    fn reveals(&self, field: PriceField) -> bool {
        match self {
            Mark::Open => field == PriceField::Open,
            Mark::Close => true,
        }
    }
}

pub struct ReplayVenue {
    bars: BTreeMap<NaiveDate, HashMap<String, OhlcvBar>>,
    slippage_bps: f64,
    portfolio: RefCell<Portfolio>,
    last_close: RefCell<HashMap<String, f64>>,
    session: Cell<Option<NaiveDate>>,
    mark: Cell<Mark>,
    next_order_id: Cell<u64>,
}

impl ReplayVenue {
    pub fn new(bars: Vec<OhlcvBar>, config: &BacktestConfig) -> Self {
        let mut by_date: BTreeMap<NaiveDate, HashMap<String, OhlcvBar>> = BTreeMap::new();
        for bar in bars {
            if bar.date < config.start_date || bar.date > config.end_date {
                continue;
            }
            by_date
                .entry(bar.date)
                .or_default()
                .insert(bar.asset_id.clone(), bar);
        }

        Self {
            bars: by_date,
            slippage_bps: config.slippage_bps,
            portfolio: RefCell::new(Portfolio::new(config.initial_capital)),
            last_close: RefCell::new(HashMap::new()),
            session: Cell::new(None),
            mark: Cell::new(Mark::Open),
            next_order_id: Cell::new(1),
        }
    }

    /// Load the replay window for `asset_ids`. Assets whose bars cannot be
    /// read are skipped with a warning.
    pub fn load(
        data_port: &dyn DataPort,
        asset_ids: &[String],
        config: &BacktestConfig,
    ) -> Result<Self, SellgapError> {
        let mut bars = Vec::new();
        for id in asset_ids {
            match data_port.fetch_ohlcv(id, config.start_date, config.end_date) {
                Ok(asset_bars) => bars.extend(asset_bars),
                Err(e) => warn!("replay: skipping {} ({})", id, e),
            }
        }

        let venue = Self::new(bars, config);
        if venue.bars.is_empty() {
            return Err(SellgapError::data(format!(
                "no bars between {} and {}",
                config.start_date, config.end_date
            )));
        }
        Ok(venue)
    }

    /// Trading days in the window, ascending.
    pub fn sessions(&self) -> Vec<NaiveDate> {
        self.bars.keys().copied().collect()
    }

    pub fn begin_session(&self, date: NaiveDate) {
        self.session.set(Some(date));
        self.mark.set(Mark::Open);
    }

    pub fn set_mark(&self, mark: Mark) {
        self.mark.set(mark);
    }

    /// Mark open positions to the session close and record equity.
    pub fn end_session(&self) {
        let Some(date) = self.session.take() else {
            return;
        };

        let mut last_close = self.last_close.borrow_mut();
        if let Some(day) = self.bars.get(&date) {
            for (id, bar) in day {
                last_close.insert(id.clone(), bar.close);
            }
        }

        let mut portfolio = self.portfolio.borrow_mut();
        let equity = portfolio.total_equity(&last_close);
        portfolio.record_equity(date, equity);
        debug!("{}: equity {:.2}", date, equity);
    }

    pub fn portfolio(&self) -> Ref<'_, Portfolio> {
        self.portfolio.borrow()
    }

    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary::from_portfolio(&self.portfolio.borrow(), self.bars.len())
    }

    fn current_bars(&self) -> Result<(NaiveDate, &HashMap<String, OhlcvBar>), SellgapError> {
        let date = self
            .session
            .get()
            .ok_or_else(|| SellgapError::data("no replay session in progress"))?;
        let day = self
            .bars
            .get(&date)
            .ok_or_else(|| SellgapError::data(format!("{} is not a replay session", date)))?;
        Ok((date, day))
    }
}

impl QuotePort for ReplayVenue {
    fn current(
        &self,
        asset_ids: &[String],
        field: PriceField,
    ) -> Result<HashMap<String, f64>, SellgapError> {
        let (date, day) = self.current_bars()?;
        let mark = self.mark.get();
        if !mark.reveals(field) {
            return Err(SellgapError::data(format!(
                "{:?} not yet known at the {:?} of {}",
                field, mark, date
            )));
        }

        Ok(asset_ids
            .iter()
            .filter_map(|id| day.get(id).map(|bar| (id.clone(), field.of(bar))))
            .collect())
    }
}

impl LedgerPort for ReplayVenue {
    fn positions(&self) -> Result<HashMap<String, i64>, SellgapError> {
        Ok(self.portfolio.borrow().quantities())
    }
}

impl OrderPort for ReplayVenue {
    fn submit(&self, request: &OrderRequest) -> Result<String, SellgapError> {
        let rejected = |reason: &str| SellgapError::OrderRejected {
            asset: request.asset_id.clone(),
            reason: reason.to_string(),
        };

        let (date, day) = self.current_bars()?;
        let bar = day
            .get(&request.asset_id)
            .ok_or_else(|| rejected("no price this session"))?;
        let price = self.mark.get().price(bar);

        let quantity = match request.amount {
            OrderAmount::Notional(value) => shares_for_notional(value, price),
            OrderAmount::Quantity(qty) => qty,
        };
        if quantity == 0 {
            return Err(rejected("order rounds to zero shares"));
        }

        let fill_price = apply_slippage(price, quantity, self.slippage_bps);
        self.portfolio
            .borrow_mut()
            .apply_fill(date, &request.asset_id, quantity, fill_price);

        let id = self.next_order_id.get();
        self.next_order_id.set(id + 1);
        debug!(
            "{}: filled {} {} @ {:.4}",
            date, request.asset_id, quantity, fill_price
        );
        Ok(format!("R{:06}", id))
    }
}

/// Replay every session in the venue through the strategy's daily
/// schedule.
pub fn run_replay(
    strategy: &mut SellGapStrategy,
    data_port: &dyn DataPort,
    venue: &ReplayVenue,
) -> BacktestSummary {
    let schedule = strategy.config().schedule();
    let platform = Platform {
        data: data_port,
        quotes: venue,
        ledger: venue,
        orders: venue,
        realtime: None,
    };

    let sessions = venue.sessions();
    for &date in &sessions {
        venue.begin_session(date);
        let session = strategy.config().session(date);
        for trigger in schedule.resolve(&session) {
            let mark = if trigger.event.is_close_anchored() {
                Mark::Close
            } else {
                Mark::Open
            };
            venue.set_mark(mark);
            debug!("{} {}", trigger.at, trigger.callback);
            strategy.dispatch(trigger.callback, date, &platform);
        }
        venue.end_session();
    }

    let summary = venue.summary();
    info!(
        "replayed {} sessions, {} fills, realized {:.2}",
        summary.sessions, summary.fills, summary.realized_pnl
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::ExecutionStyle;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn bar(asset_id: &str, d: u32, open: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            asset_id: asset_id.to_string(),
            date: date(d),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1_000,
        }
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            start_date: date(3),
            end_date: date(7),
            initial_capital: 100_000.0,
            slippage_bps: 0.0,
        }
    }

    fn order(asset_id: &str, amount: OrderAmount) -> OrderRequest {
        OrderRequest {
            asset_id: asset_id.to_string(),
            amount,
            style: ExecutionStyle::Market,
        }
    }

    #[test]
    fn sessions_are_dates_inside_window() {
        let venue = ReplayVenue::new(
            vec![
                bar("XYZ", 4, 10.0, 11.0),
                bar("XYZ", 3, 10.0, 11.0),
                bar("ABC", 4, 20.0, 21.0),
                bar("XYZ", 10, 10.0, 11.0),
            ],
            &config(),
        );
        assert_eq!(venue.sessions(), vec![date(3), date(4)]);
    }

    #[test]
    fn open_mark_hides_the_close() {
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 10.0, 11.0)], &config());
        venue.begin_session(date(3));
        let ids = vec!["XYZ".to_string(), "GONE".to_string()];

        let opens = venue.current(&ids, PriceField::Open).unwrap();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens["XYZ"], 10.0);
        assert!(venue.current(&ids, PriceField::Close).is_err());

        venue.set_mark(Mark::Close);
        assert_eq!(venue.current(&ids, PriceField::Close).unwrap()["XYZ"], 11.0);
    }

    #[test]
    fn quotes_need_a_session() {
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 10.0, 11.0)], &config());
        assert!(venue.current(&["XYZ".to_string()], PriceField::Open).is_err());
    }

    #[test]
    fn notional_short_then_flatten_at_close() {
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 47.0, 45.0)], &config());
        venue.begin_session(date(3));

        venue
            .submit(&order("XYZ", OrderAmount::Notional(-50_000.0)))
            .unwrap();
        assert_eq!(venue.positions().unwrap()["XYZ"], -1063);

        venue.set_mark(Mark::Close);
        venue
            .submit(&order("XYZ", OrderAmount::Quantity(1063)))
            .unwrap();
        assert!(venue.positions().unwrap().is_empty());
        venue.end_session();

        let summary = venue.summary();
        assert_eq!(summary.fills, 2);
        assert_relative_eq!(summary.realized_pnl, 1063.0 * 2.0, epsilon = 1e-6);
        assert_relative_eq!(summary.final_equity, 100_000.0 + 2126.0, epsilon = 1e-6);
    }

    #[test]
    fn slippage_worsens_fill() {
        let mut cfg = config();
        cfg.slippage_bps = 10.0;
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 100.0, 100.0)], &cfg);
        venue.begin_session(date(3));
        venue.submit(&order("XYZ", OrderAmount::Quantity(-10))).unwrap();

        let portfolio = venue.portfolio();
        assert_relative_eq!(portfolio.fills[0].price, 99.9, epsilon = 1e-9);
    }

    #[test]
    fn rejects_unpriced_and_zero_share_orders() {
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 100.0, 100.0)], &config());
        venue.begin_session(date(3));

        let err = venue
            .submit(&order("ABC", OrderAmount::Notional(-50_000.0)))
            .unwrap_err();
        assert!(matches!(err, SellgapError::OrderRejected { .. }));

        let err = venue
            .submit(&order("XYZ", OrderAmount::Notional(-50.0)))
            .unwrap_err();
        assert!(matches!(err, SellgapError::OrderRejected { .. }));
        assert!(venue.portfolio().fills.is_empty());
    }

    #[test]
    fn order_ids_increase() {
        let venue = ReplayVenue::new(vec![bar("XYZ", 3, 10.0, 10.0)], &config());
        venue.begin_session(date(3));
        let a = venue.submit(&order("XYZ", OrderAmount::Quantity(1))).unwrap();
        let b = venue.submit(&order("XYZ", OrderAmount::Quantity(1))).unwrap();
        assert_eq!(a, "R000001");
        assert_eq!(b, "R000002");
    }

    #[test]
    fn equity_carries_positions_at_last_close() {
        let venue = ReplayVenue::new(
            vec![bar("XYZ", 3, 50.0, 40.0), bar("ABC", 4, 10.0, 10.0)],
            &config(),
        );
        venue.begin_session(date(3));
        venue.submit(&order("XYZ", OrderAmount::Quantity(-100))).unwrap();
        venue.end_session();

        // XYZ has no bar on the 4th; it stays marked at 40.
        venue.begin_session(date(4));
        venue.end_session();

        let portfolio = venue.portfolio();
        let curve = &portfolio.equity_curve;
        assert_eq!(curve.len(), 2);
        assert_relative_eq!(curve[0].equity, 101_000.0);
        assert_relative_eq!(curve[1].equity, 101_000.0);
    }
}
