//! Daily factor engine.
//!
//! Two pure stages, each testable on synthetic bars:
//! 1. `FactorTable::from_histories` turns per-asset daily history into one
//!    `AssetFactors` row per asset with enough history, including the
//!    cross-sectional liquidity percentile.
//! 2. `screen` keeps the rows passing the screen predicate and emits the
//!    day's `CandidateTable`.
//!
//! `compute_factors` wires both stages to a `DataPort`. The engine only
//! ever sees bars dated strictly before the trading day, so `prior_low`
//! is the low of the most recent completed session.

use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::domain::error::SellgapError;
use crate::domain::indicator::dollar_volume::calculate_avg_dollar_volume;
use crate::domain::indicator::ewm_stddev::calculate_ewm_stddev;
use crate::domain::indicator::percentile::percentile_ranks;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::{Asset, SecurityType, Universe};
use crate::ports::data_port::DataPort;

/// Window lengths for the rolling statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorParams {
    pub mavg_window: usize,
    pub dollar_volume_window: usize,
    pub volatility_window: usize,
    pub decay_rate: f64,
}

impl Default for FactorParams {
    fn default() -> Self {
        FactorParams {
            mavg_window: 20,
            dollar_volume_window: 30,
            volatility_window: 63,
            decay_rate: 0.99,
        }
    }
}

impl FactorParams {
    /// Bars an asset needs before every factor is defined.
    pub fn required_bars(&self) -> usize {
        self.mavg_window
            .max(self.dollar_volume_window)
            .max(self.volatility_window)
            .max(1)
    }

    /// Calendar days of history to request so that `required_bars`
    /// sessions are covered across weekends and holidays.
    pub fn lookback_days(&self) -> i64 {
        (self.required_bars() as i64) * 2 + 14
    }
}

/// Thresholds for the screen predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenParams {
    pub security_type: SecurityType,
    pub min_liquidity_percentile: f64,
    pub max_liquidity_percentile: f64,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for ScreenParams {
    fn default() -> Self {
        ScreenParams {
            security_type: SecurityType::CommonStock,
            min_liquidity_percentile: 90.0,
            max_liquidity_percentile: 100.0,
            min_price: 10.0,
            max_price: 2000.0,
        }
    }
}

/// Stage-one output: every statistic for one asset, before screening.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFactors {
    pub asset_id: String,
    pub security_type: SecurityType,
    pub moving_average: f64,
    pub prior_low: f64,
    pub volatility: f64,
    pub last_close: f64,
    pub avg_dollar_volume: f64,
    pub liquidity_percentile: f64,
}

impl AssetFactors {
    /// Compute everything except the liquidity percentile, which needs the
    /// whole cross-section. `bars` must be oldest first and end before today.
    pub fn from_bars(
        asset: &Asset,
        bars: &[OhlcvBar],
        params: &FactorParams,
    ) -> Result<Self, SellgapError> {
        let minimum = params.required_bars();
        if bars.len() < minimum {
            return Err(SellgapError::InsufficientData {
                asset: asset.id.clone(),
                bars: bars.len(),
                minimum,
            });
        }

        let insufficient = || SellgapError::InsufficientData {
            asset: asset.id.clone(),
            bars: bars.len(),
            minimum,
        };

        let moving_average = calculate_sma(bars, params.mavg_window)
            .latest()
            .ok_or_else(insufficient)?;
        let volatility = calculate_ewm_stddev(bars, params.volatility_window, params.decay_rate)
            .latest()
            .ok_or_else(insufficient)?;
        let avg_dollar_volume = calculate_avg_dollar_volume(bars, params.dollar_volume_window)
            .latest()
            .ok_or_else(insufficient)?;
        let last = bars.last().ok_or_else(insufficient)?;

        Ok(AssetFactors {
            asset_id: asset.id.clone(),
            security_type: asset.security_type.clone(),
            moving_average,
            prior_low: last.low,
            volatility,
            last_close: last.close,
            avg_dollar_volume,
            liquidity_percentile: 0.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    pub date: NaiveDate,
    pub rows: Vec<AssetFactors>,
}

impl FactorTable {
    /// Stage one. The liquidity percentile is ranked across every asset
    /// with a full dollar-volume window, including assets too young for the
    /// other factors. Assets missing any factor are then dropped and logged.
    /// Rows come out sorted by asset id.
    pub fn from_histories(
        date: NaiveDate,
        histories: &[(Asset, Vec<OhlcvBar>)],
        params: &FactorParams,
    ) -> Self {
        let priors: Vec<(&Asset, Vec<OhlcvBar>)> = histories
            .iter()
            .map(|(asset, bars)| {
                let prior = bars.iter().filter(|b| b.date < date).cloned().collect();
                (asset, prior)
            })
            .collect();

        let dollar_volumes: Vec<(String, f64)> = priors
            .iter()
            .filter_map(|(asset, bars)| {
                calculate_avg_dollar_volume(bars, params.dollar_volume_window)
                    .latest()
                    .map(|adv| (asset.id.clone(), adv))
            })
            .collect();
        let ranks = percentile_ranks(&dollar_volumes);

        let mut rows: Vec<AssetFactors> = priors
            .iter()
            .filter_map(|(asset, bars)| match AssetFactors::from_bars(asset, bars, params) {
                Ok(mut row) => {
                    row.liquidity_percentile =
                        ranks.get(&row.asset_id).copied().unwrap_or(f64::NAN);
                    Some(row)
                }
                Err(e) => {
                    debug!("{}: no factors ({})", asset.id, e);
                    None
                }
            })
            .collect();

        rows.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        FactorTable { date, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One screened asset. Immutable for the day it was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRow {
    pub asset_id: String,
    pub moving_average: f64,
    pub prior_low: f64,
    pub volatility: f64,
    pub last_close: f64,
}

/// The screened rows for exactly one trading day, keyed by asset id.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTable {
    date: NaiveDate,
    rows: BTreeMap<String, FactorRow>,
}

impl CandidateTable {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_rows(date: NaiveDate, rows: impl IntoIterator<Item = FactorRow>) -> Self {
        Self {
            date,
            rows: rows.into_iter().map(|r| (r.asset_id.clone(), r)).collect(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, asset_id: &str) -> Option<&FactorRow> {
        self.rows.get(asset_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &FactorRow> {
        self.rows.values()
    }

    /// Asset ids in ascending order.
    pub fn asset_ids(&self) -> Vec<String> {
        self.rows.keys().cloned().collect()
    }
}

/// The screen predicate for one row.
pub fn passes_screen(row: &AssetFactors, params: &ScreenParams) -> bool {
    let is_type = row.security_type == params.security_type;
    let is_liquid = row.liquidity_percentile >= params.min_liquidity_percentile
        && row.liquidity_percentile <= params.max_liquidity_percentile;
    let is_above_mavg = row.last_close > row.moving_average;
    let is_not_too_cheap = row.last_close > params.min_price;
    let is_not_too_expensive = row.last_close < params.max_price;

    is_type
        && is_liquid
        && is_above_mavg
        && is_not_too_cheap
        && is_not_too_expensive
        && row.volatility.is_finite()
}

/// Stage two.
pub fn screen(table: &FactorTable, params: &ScreenParams) -> CandidateTable {
    CandidateTable::from_rows(
        table.date,
        table
            .rows
            .iter()
            .filter(|row| passes_screen(row, params))
            .map(|row| FactorRow {
                asset_id: row.asset_id.clone(),
                moving_average: row.moving_average,
                prior_low: row.prior_low,
                volatility: row.volatility,
                last_close: row.last_close,
            }),
    )
}

/// Fetch history for the whole universe and run both stages. A failed
/// fetch drops that asset only.
pub fn compute_factors(
    universe: &Universe,
    data_port: &dyn DataPort,
    today: NaiveDate,
    factor_params: &FactorParams,
    screen_params: &ScreenParams,
) -> CandidateTable {
    let Some(end_date) = today.pred_opt() else {
        return CandidateTable::empty(today);
    };
    let start_date = today - Duration::days(factor_params.lookback_days());

    let mut histories = Vec::with_capacity(universe.count());
    for asset in &universe.assets {
        match data_port.fetch_ohlcv(&asset.id, start_date, end_date) {
            Ok(bars) if bars.is_empty() => debug!("{}: no history before {}", asset.id, today),
            Ok(bars) => histories.push((asset.clone(), bars)),
            Err(e) => warn!("skipping {} ({})", asset.id, e),
        }
    }

    let table = FactorTable::from_histories(today, &histories, factor_params);
    let candidates = screen(&table, screen_params);
    info!(
        "{}: {} assets in universe, {} with factors, {} candidates",
        today,
        universe.count(),
        table.len(),
        candidates.len()
    );
    candidates
}
