//! Intraday quote port.

use crate::domain::error::SellgapError;
use crate::domain::ohlcv::PriceField;
use std::collections::HashMap;

pub trait QuotePort {
    /// Current value of `field` for each requested asset. Assets without a
    /// quote (halted, not yet traded) are absent from the returned map.
    fn current(
        &self,
        asset_ids: &[String],
        field: PriceField,
    ) -> Result<HashMap<String, f64>, SellgapError>;
}
