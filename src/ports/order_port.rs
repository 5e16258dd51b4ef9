//! Order submission port.

use crate::domain::error::SellgapError;
use crate::domain::order::OrderRequest;

pub trait OrderPort {
    /// Hand one order to the platform. Returns the platform's order id.
    /// Fill and rejection outcomes after acceptance are the platform's concern.
    fn submit(&self, request: &OrderRequest) -> Result<String, SellgapError>;
}
