//! Contracts for the collaborators this crate drives but does not own.

pub mod config_port;
pub mod data_port;
pub mod ledger_port;
pub mod order_port;
pub mod quote_port;
pub mod realtime_port;
