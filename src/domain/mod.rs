//! Core domain types and logic.

pub mod ohlcv;
pub mod universe;
pub mod indicator;
pub mod factor;
pub mod gap;
pub mod order;
pub mod schedule;
pub mod strategy;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod config_validation;
pub mod error;
