//! Live-only real-time data subscription port.

use crate::domain::error::SellgapError;
use chrono::NaiveTime;

pub trait RealtimePort {
    /// Start tick collection for `asset_ids`, ending at `until` exchange time.
    fn collect_market_data(&self, asset_ids: &[String], until: NaiveTime)
    -> Result<(), SellgapError>;

    /// Point intraday quotes at the short-interval aggregate of the collected ticks.
    fn switch_to_aggregate_feed(&self) -> Result<(), SellgapError>;
}
