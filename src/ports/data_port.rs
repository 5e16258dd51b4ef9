//! Historical data port: universe listing and daily OHLCV history.

use crate::domain::error::SellgapError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::Asset;
use chrono::NaiveDate;

pub trait DataPort {
    /// Every asset known to the data source, with its security type.
    fn list_assets(&self) -> Result<Vec<Asset>, SellgapError>;

    /// Bars for `asset_id` dated within `[start_date, end_date]`, oldest first.
    fn fetch_ohlcv(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SellgapError>;
}
