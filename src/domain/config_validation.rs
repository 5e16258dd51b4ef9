//! Configuration validation.
//!
//! Validates every config field before a run starts.

use crate::domain::error::SellgapError;
use crate::domain::strategy::Environment;
use crate::domain::universe::parse_asset_ids;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime};

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    validate_environment(config)?;
    validate_target_value(config)?;
    validate_max_short_list(config)?;
    validate_factor_windows(config)?;
    validate_decay_rate(config)?;
    validate_liquidity_bounds(config)?;
    validate_price_bounds(config)?;
    validate_schedule(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_slippage(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(missing("data", "path")),
    }
    if let Some(list) = config.get_string("data", "assets") {
        parse_asset_ids(&list).map_err(|e| invalid("data", "assets", &e.to_string()))?;
    }
    Ok(())
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SellgapError> {
    match value {
        None => Err(missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| invalid("backtest", field, &format!("invalid {} format, expected YYYY-MM-DD", field))),
    }
}

/// Time under `[section] key`, or `default` when absent.
pub fn time_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, SellgapError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => parse_time(&s).ok_or_else(|| invalid(section, key, "expected HH:MM")),
    }
}

fn missing(section: &str, key: &str) -> SellgapError {
    SellgapError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> SellgapError {
    SellgapError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_environment(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let value = config.get_string_or("strategy", "environment", "backtest");
    Environment::parse(&value)
        .map(|_| ())
        .ok_or_else(|| invalid("strategy", "environment", "expected backtest or live"))
}

fn validate_target_value(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let value = config.get_double("strategy", "target_value_per_position", 50_000.0);
    if !(value > 0.0) {
        return Err(invalid(
            "strategy",
            "target_value_per_position",
            "target_value_per_position must be positive",
        ));
    }
    Ok(())
}

fn validate_max_short_list(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    if config.get_int("strategy", "max_short_list", 10) < 1 {
        return Err(invalid(
            "strategy",
            "max_short_list",
            "max_short_list must be at least 1",
        ));
    }
    Ok(())
}

fn validate_factor_windows(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    for (key, default) in [
        ("mavg_window", 20),
        ("dollar_volume_window", 30),
        ("volatility_window", 63),
    ] {
        if config.get_int("factors", key, default) < 1 {
            return Err(invalid("factors", key, "window must be at least 1"));
        }
    }
    Ok(())
}

fn validate_decay_rate(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let value = config.get_double("factors", "decay_rate", 0.99);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid("factors", "decay_rate", "decay_rate must be in (0, 1]"));
    }
    Ok(())
}

fn validate_liquidity_bounds(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let min = config.get_double("screen", "min_liquidity_percentile", 90.0);
    let max = config.get_double("screen", "max_liquidity_percentile", 100.0);
    if !(0.0..=100.0).contains(&min) {
        return Err(invalid(
            "screen",
            "min_liquidity_percentile",
            "percentile must be between 0 and 100",
        ));
    }
    if !(0.0..=100.0).contains(&max) {
        return Err(invalid(
            "screen",
            "max_liquidity_percentile",
            "percentile must be between 0 and 100",
        ));
    }
    if min > max {
        return Err(invalid(
            "screen",
            "min_liquidity_percentile",
            "min_liquidity_percentile must not exceed max_liquidity_percentile",
        ));
    }
    Ok(())
}

fn validate_price_bounds(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let min = config.get_double("screen", "min_price", 10.0);
    let max = config.get_double("screen", "max_price", 2000.0);
    if !(min >= 0.0) {
        return Err(invalid("screen", "min_price", "min_price must be non-negative"));
    }
    if !(max > min) {
        return Err(invalid("screen", "max_price", "max_price must exceed min_price"));
    }
    Ok(())
}

fn validate_schedule(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let open = time_or(config, "schedule", "market_open", NaiveTime::MIN)?;
    let close = time_or(config, "schedule", "market_close", NaiveTime::MIN)?;
    time_or(config, "live", "collect_until", NaiveTime::MIN)?;

    let has_open = config.get_string("schedule", "market_open").is_some();
    let has_close = config.get_string("schedule", "market_close").is_some();
    if has_open && has_close && open >= close {
        return Err(invalid(
            "schedule",
            "market_open",
            "market_open must be before market_close",
        ));
    }

    let detect = config.get_int("schedule", "detect_offset_minutes", 1);
    let short = config.get_int("schedule", "short_offset_minutes", 10);
    let close_offset = config.get_int("schedule", "close_offset_minutes", 5);
    if detect < 0 {
        return Err(invalid(
            "schedule",
            "detect_offset_minutes",
            "offset must be non-negative",
        ));
    }
    if short < detect {
        return Err(invalid(
            "schedule",
            "short_offset_minutes",
            "short orders cannot go out before gaps are detected",
        ));
    }
    if close_offset < 0 {
        return Err(invalid(
            "schedule",
            "close_offset_minutes",
            "offset must be non-negative",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    if !(config.get_double("backtest", "initial_capital", 1_000_000.0) > 0.0) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), SellgapError> {
    if !(config.get_double("backtest", "slippage_bps", 3.0) >= 0.0) {
        return Err(invalid(
            "backtest",
            "slippage_bps",
            "slippage_bps must be non-negative",
        ));
    }
    Ok(())
}
