//! Position ledger port. The ledger lives on the execution platform.

use crate::domain::error::SellgapError;
use std::collections::HashMap;

pub trait LedgerPort {
    /// Signed share quantity per asset. Flat assets may be omitted.
    fn positions(&self) -> Result<HashMap<String, i64>, SellgapError>;
}
