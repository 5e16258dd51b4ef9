//! Down-gap detection and ranking.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashMap;

use crate::domain::error::SellgapError;
use crate::domain::factor::{CandidateTable, FactorRow};
use crate::domain::ohlcv::PriceField;
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_MAX_SHORTS: usize = 10;

/// Ranked assets to short for one day. Not `Clone`: the short callback
/// takes it by value, so a day's list can only be traded once.
#[derive(Debug, PartialEq)]
pub struct ShortList {
    date: NaiveDate,
    asset_ids: Vec<String>,
}

impl ShortList {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            asset_ids: Vec::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }

    pub fn len(&self) -> usize {
        self.asset_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asset_ids.is_empty()
    }

    pub fn into_asset_ids(self) -> Vec<String> {
        self.asset_ids
    }
}

/// Opened below (prior low - volatility) and below the moving average.
pub fn gap_signal(row: &FactorRow, open: f64) -> bool {
    let gapped_down = open < row.prior_low - row.volatility;
    let below_mavg = open < row.moving_average;
    gapped_down && below_mavg
}

/// Rank gap-eligible candidates by volatility, highest first, ties by
/// ascending asset id, and keep at most `max_names`. Candidates with no
/// usable open are skipped.
pub fn rank_gaps(
    candidates: &CandidateTable,
    opens: &HashMap<String, f64>,
    max_names: usize,
) -> ShortList {
    let mut eligible: Vec<&FactorRow> = Vec::new();

    for row in candidates.rows() {
        let open = match opens.get(&row.asset_id) {
            Some(&open) if open.is_finite() => open,
            _ => {
                warn!("{}: no open price, excluded from gap detection", row.asset_id);
                continue;
            }
        };
        if gap_signal(row, open) {
            debug!(
                "{}: gapped down (open {:.2}, prior low {:.2}, vol {:.4}, mavg {:.2})",
                row.asset_id, open, row.prior_low, row.volatility, row.moving_average
            );
            eligible.push(row);
        }
    }

    eligible.sort_by(|a, b| {
        b.volatility
            .total_cmp(&a.volatility)
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });

    ShortList {
        date: candidates.date(),
        asset_ids: eligible
            .into_iter()
            .take(max_names)
            .map(|row| row.asset_id.clone())
            .collect(),
    }
}

/// Read today's opens for the candidate set and rank the gappers. An
/// empty candidate table returns at once without touching the quote port.
pub fn detect_gaps(
    candidates: &CandidateTable,
    quotes: &dyn QuotePort,
    max_names: usize,
) -> Result<ShortList, SellgapError> {
    if candidates.is_empty() {
        return Ok(ShortList::empty(candidates.date()));
    }

    let opens = quotes.current(&candidates.asset_ids(), PriceField::Open)?;
    let short_list = rank_gaps(candidates, &opens, max_names);
    info!(
        "{}: {} of {} candidates gapped down",
        candidates.date(),
        short_list.len(),
        candidates.len()
    );
    Ok(short_list)
}
