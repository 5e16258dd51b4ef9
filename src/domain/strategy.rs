//! Daily sell-gap strategy: the state machine driving one trading day.
//!
//! ```text
//! PreOpen --before_trading_start--> SnapshotTaken(candidates)
//!         --find_down_gaps-------> GapsDetected(candidates, short_list)
//!         --short_down_gaps------> Positioned
//!         --close_positions------> Flat
//! ```
//!
//! All day-scoped data lives inside `DayState`, so a candidate table or
//! short-list can never leak into the next session: any callback for a
//! new date first resets the machine to `PreOpen`. Callbacks arriving out
//! of order are logged and ignored, except `close_positions`, which always
//! unwinds whatever the ledger holds.

use chrono::{NaiveDate, NaiveTime};
use log::{info, warn};
use std::fmt;

use crate::domain::factor::{compute_factors, CandidateTable, FactorParams, ScreenParams};
use crate::domain::gap::{detect_gaps, ShortList, DEFAULT_MAX_SHORTS};
use crate::domain::order::{flatten, open_shorts, submit_all};
use crate::domain::schedule::{Callback, DailySchedule, ScheduleRule, Session};
use crate::domain::universe::Universe;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::order_port::OrderPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::realtime_port::RealtimePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Backtest,
    Live,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "backtest" => Some(Environment::Backtest),
            "live" | "trade" => Some(Environment::Live),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub environment: Environment,
    /// Dollar size of each short, as a positive number.
    pub target_value_per_position: f64,
    pub max_short_list: usize,
    /// Restricts the universe when set.
    pub assets: Option<Vec<String>>,
    pub factors: FactorParams,
    pub screen: ScreenParams,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    pub detect_offset_minutes: i64,
    pub short_offset_minutes: i64,
    pub close_offset_minutes: i64,
    /// Live only: end of real-time collection.
    pub collect_until: NaiveTime,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            environment: Environment::Backtest,
            target_value_per_position: 50_000.0,
            max_short_list: DEFAULT_MAX_SHORTS,
            assets: None,
            factors: FactorParams::default(),
            screen: ScreenParams::default(),
            market_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            market_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            detect_offset_minutes: 1,
            short_offset_minutes: 10,
            close_offset_minutes: 5,
            collect_until: NaiveTime::from_hms_opt(9, 32, 0).unwrap_or_default(),
        }
    }
}

impl StrategyConfig {
    pub fn schedule(&self) -> DailySchedule {
        DailySchedule::new()
            .add(ScheduleRule::before_open(Callback::BeforeTradingStart))
            .add(ScheduleRule::market_open(
                Callback::FindDownGaps,
                self.detect_offset_minutes,
            ))
            .add(ScheduleRule::market_open(
                Callback::ShortDownGaps,
                self.short_offset_minutes,
            ))
            .add(ScheduleRule::market_close(
                Callback::ClosePositions,
                self.close_offset_minutes,
            ))
    }

    pub fn session(&self, date: NaiveDate) -> Session {
        Session {
            date,
            open: self.market_open,
            close: self.market_close,
        }
    }
}

/// The platform collaborators a callback may touch.
pub struct Platform<'a> {
    pub data: &'a dyn DataPort,
    pub quotes: &'a dyn QuotePort,
    pub ledger: &'a dyn LedgerPort,
    pub orders: &'a dyn OrderPort,
    /// Present only when wired to a live venue.
    pub realtime: Option<&'a dyn RealtimePort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreOpen,
    SnapshotTaken,
    GapsDetected,
    Positioned,
    Flat,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::PreOpen => "PRE_OPEN",
            Phase::SnapshotTaken => "SNAPSHOT_TAKEN",
            Phase::GapsDetected => "GAPS_DETECTED",
            Phase::Positioned => "POSITIONED",
            Phase::Flat => "FLAT",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
enum DayState {
    PreOpen,
    SnapshotTaken(CandidateTable),
    GapsDetected {
        candidates: CandidateTable,
        short_list: ShortList,
    },
    Positioned,
    Flat,
}

impl DayState {
    fn phase(&self) -> Phase {
        match self {
            DayState::PreOpen => Phase::PreOpen,
            DayState::SnapshotTaken(_) => Phase::SnapshotTaken,
            DayState::GapsDetected { .. } => Phase::GapsDetected,
            DayState::Positioned => Phase::Positioned,
            DayState::Flat => Phase::Flat,
        }
    }
}

pub struct SellGapStrategy {
    config: StrategyConfig,
    day: Option<NaiveDate>,
    state: DayState,
}

impl SellGapStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            day: None,
            state: DayState::PreOpen,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn candidates(&self) -> Option<&CandidateTable> {
        match &self.state {
            DayState::SnapshotTaken(candidates) | DayState::GapsDetected { candidates, .. } => {
                Some(candidates)
            }
            _ => None,
        }
    }

    pub fn short_list(&self) -> Option<&ShortList> {
        match &self.state {
            DayState::GapsDetected { short_list, .. } => Some(short_list),
            _ => None,
        }
    }

    fn begin_day(&mut self, date: NaiveDate) {
        if self.day != Some(date) {
            if let Some(previous) = self.day {
                info!("{}: new session, dropping {} state from {}", date, self.phase(), previous);
            }
            self.day = Some(date);
            self.state = DayState::PreOpen;
        }
    }

    pub fn dispatch(&mut self, callback: Callback, date: NaiveDate, platform: &Platform<'_>) {
        match callback {
            Callback::BeforeTradingStart => self.before_trading_start(date, platform),
            Callback::FindDownGaps => self.find_down_gaps(date, platform),
            Callback::ShortDownGaps => {
                self.short_down_gaps(date, platform);
            }
            Callback::ClosePositions => {
                self.close_positions(date, platform);
            }
        }
    }

    /// Snapshot the day's candidates and, when live, start real-time
    /// collection for exactly that set.
    pub fn before_trading_start(&mut self, date: NaiveDate, platform: &Platform<'_>) {
        self.begin_day(date);
        if self.phase() != Phase::PreOpen {
            warn!("{}: candidates already computed, ignoring before_trading_start", date);
            return;
        }

        let universe = match platform.data.list_assets() {
            Ok(assets) => {
                let universe = Universe::new(assets);
                match &self.config.assets {
                    Some(ids) => universe.restrict_to(ids),
                    None => universe,
                }
            }
            Err(e) => {
                warn!("{}: universe unavailable ({}), no candidates today", date, e);
                Universe::default()
            }
        };

        let candidates = compute_factors(
            &universe,
            platform.data,
            date,
            &self.config.factors,
            &self.config.screen,
        );

        if self.config.environment == Environment::Live && !candidates.is_empty() {
            self.start_realtime_collection(&candidates, platform);
        }

        self.state = DayState::SnapshotTaken(candidates);
    }

    fn start_realtime_collection(&self, candidates: &CandidateTable, platform: &Platform<'_>) {
        let Some(realtime) = platform.realtime else {
            warn!("live environment without a real-time feed, using default quotes");
            return;
        };

        let ids = candidates.asset_ids();
        if let Err(e) = realtime.collect_market_data(&ids, self.config.collect_until) {
            warn!("{} (continuing on default quotes)", e);
            return;
        }
        match realtime.switch_to_aggregate_feed() {
            Ok(()) => info!(
                "collecting real-time data for {} assets until {}",
                ids.len(),
                self.config.collect_until
            ),
            Err(e) => warn!("{} (continuing on default quotes)", e),
        }
    }

    pub fn find_down_gaps(&mut self, date: NaiveDate, platform: &Platform<'_>) {
        self.begin_day(date);
        match std::mem::replace(&mut self.state, DayState::PreOpen) {
            DayState::SnapshotTaken(candidates) => {
                let short_list =
                    match detect_gaps(&candidates, platform.quotes, self.config.max_short_list) {
                        Ok(list) => list,
                        Err(e) => {
                            warn!("{}: opens unavailable ({}), nothing to short", date, e);
                            ShortList::empty(date)
                        }
                    };
                self.state = DayState::GapsDetected {
                    candidates,
                    short_list,
                };
            }
            other => {
                warn!("{}: find_down_gaps called in {}, ignored", date, other.phase());
                self.state = other;
            }
        }
    }

    /// Returns the number of short orders the platform accepted.
    pub fn short_down_gaps(&mut self, date: NaiveDate, platform: &Platform<'_>) -> usize {
        self.begin_day(date);
        match std::mem::replace(&mut self.state, DayState::PreOpen) {
            DayState::GapsDetected { short_list, .. } => {
                let orders = open_shorts(short_list, self.config.target_value_per_position);
                let accepted = submit_all(&orders, platform.orders);
                info!("{}: {} of {} short orders accepted", date, accepted, orders.len());
                self.state = DayState::Positioned;
                accepted
            }
            other => {
                warn!("{}: short_down_gaps called in {}, ignored", date, other.phase());
                self.state = other;
                0
            }
        }
    }

    /// Returns the number of closing orders the platform accepted.
    pub fn close_positions(&mut self, date: NaiveDate, platform: &Platform<'_>) -> usize {
        self.begin_day(date);
        let positions = match platform.ledger.positions() {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: ledger unavailable ({}), cannot flatten", date, e);
                return 0;
            }
        };

        let orders = flatten(&positions);
        let accepted = submit_all(&orders, platform.orders);
        info!("{}: {} of {} closing orders accepted", date, accepted, orders.len());
        self.state = DayState::Flat;
        accepted
    }
}
