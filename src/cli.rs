//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::replay::{run_replay, ReplayVenue};
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{
    parse_date, time_or, validate_backtest_config, validate_data_config, validate_strategy_config,
};
use crate::domain::error::SellgapError;
use crate::domain::factor::{compute_factors, FactorParams, ScreenParams};
use crate::domain::gap::DEFAULT_MAX_SHORTS;
use crate::domain::strategy::{Environment, SellGapStrategy, StrategyConfig};
use crate::domain::universe::{parse_asset_ids, SecurityType, Universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "sellgap", about = "Intraday down-gap short-selling strategy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the strategy over historical bars
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] start_date
        #[arg(long)]
        start: Option<String>,
        /// Overrides [backtest] end_date
        #[arg(long)]
        end: Option<String>,
    },
    /// Print the screened candidate table for one trading day
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, start, end } => run_backtest(&config, start.as_deref(), end.as_deref()),
        Command::Scan { config, date } => run_scan(&config, &date),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SellgapError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: SellgapError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SellgapError {
    SellgapError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn window(config: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, SellgapError> {
    let value = config.get_int("factors", key, default);
    usize::try_from(value)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| invalid("factors", key, "window must be at least 1"))
}

pub fn build_factor_params(config: &dyn ConfigPort) -> Result<FactorParams, SellgapError> {
    let defaults = FactorParams::default();
    Ok(FactorParams {
        mavg_window: window(config, "mavg_window", defaults.mavg_window as i64)?,
        dollar_volume_window: window(
            config,
            "dollar_volume_window",
            defaults.dollar_volume_window as i64,
        )?,
        volatility_window: window(config, "volatility_window", defaults.volatility_window as i64)?,
        decay_rate: config.get_double("factors", "decay_rate", defaults.decay_rate),
    })
}

pub fn build_screen_params(config: &dyn ConfigPort) -> ScreenParams {
    let defaults = ScreenParams::default();
    ScreenParams {
        security_type: config
            .get_string("screen", "security_type")
            .filter(|s| !s.trim().is_empty())
            .map(|s| SecurityType::parse(&s))
            .unwrap_or(defaults.security_type),
        min_liquidity_percentile: config.get_double(
            "screen",
            "min_liquidity_percentile",
            defaults.min_liquidity_percentile,
        ),
        max_liquidity_percentile: config.get_double(
            "screen",
            "max_liquidity_percentile",
            defaults.max_liquidity_percentile,
        ),
        min_price: config.get_double("screen", "min_price", defaults.min_price),
        max_price: config.get_double("screen", "max_price", defaults.max_price),
    }
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, SellgapError> {
    validate_strategy_config(config)?;
    let defaults = StrategyConfig::default();

    let environment_str = config.get_string_or("strategy", "environment", "backtest");
    let environment = Environment::parse(&environment_str)
        .ok_or_else(|| invalid("strategy", "environment", "expected backtest or live"))?;

    let assets = match config.get_string("data", "assets") {
        Some(list) if !list.trim().is_empty() => Some(
            parse_asset_ids(&list).map_err(|e| invalid("data", "assets", e.to_string()))?,
        ),
        _ => None,
    };

    Ok(StrategyConfig {
        environment,
        target_value_per_position: config.get_double(
            "strategy",
            "target_value_per_position",
            defaults.target_value_per_position,
        ),
        max_short_list: config.get_int("strategy", "max_short_list", DEFAULT_MAX_SHORTS as i64)
            as usize,
        assets,
        factors: build_factor_params(config)?,
        screen: build_screen_params(config),
        market_open: time_or(config, "schedule", "market_open", defaults.market_open)?,
        market_close: time_or(config, "schedule", "market_close", defaults.market_close)?,
        detect_offset_minutes: config.get_int(
            "schedule",
            "detect_offset_minutes",
            defaults.detect_offset_minutes,
        ),
        short_offset_minutes: config.get_int(
            "schedule",
            "short_offset_minutes",
            defaults.short_offset_minutes,
        ),
        close_offset_minutes: config.get_int(
            "schedule",
            "close_offset_minutes",
            defaults.close_offset_minutes,
        ),
        collect_until: time_or(config, "live", "collect_until", defaults.collect_until)?,
    })
}

/// `start`/`end` override the configured dates when given.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<BacktestConfig, SellgapError> {
    let start_str = start
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "start_date"));
    let end_str = end
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "end_date"));

    let bt_config = BacktestConfig {
        start_date: parse_date(start_str.as_deref(), "start_date")?,
        end_date: parse_date(end_str.as_deref(), "end_date")?,
        initial_capital: config.get_double("backtest", "initial_capital", 1_000_000.0),
        slippage_bps: config.get_double("backtest", "slippage_bps", 3.0),
    };

    if bt_config.start_date >= bt_config.end_date {
        return Err(invalid("backtest", "start_date", "start_date must be before end_date"));
    }
    if !(bt_config.initial_capital > 0.0) {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
    }
    if !(bt_config.slippage_bps >= 0.0) {
        return Err(invalid("backtest", "slippage_bps", "slippage_bps must be non-negative"));
    }
    Ok(bt_config)
}

fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, SellgapError> {
    validate_data_config(config)?;
    let path = config.get_string_or("data", "path", "");
    Ok(CsvAdapter::new(PathBuf::from(path)))
}

/// Universe ids the run trades: `[data] assets` when set, otherwise
/// everything the data source lists.
fn resolve_universe(
    data: &dyn DataPort,
    strategy: &StrategyConfig,
) -> Result<Universe, SellgapError> {
    let universe = Universe::new(data.list_assets()?);
    Ok(match &strategy.assets {
        Some(ids) => universe.restrict_to(ids),
        None => universe,
    })
}

fn run_backtest(config_path: &PathBuf, start: Option<&str>, end: Option<&str>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Strategy and replay settings
    let strategy_config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let bt_config = match build_backtest_config(&adapter, start, end) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 3: Data source and universe
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let universe = match resolve_universe(&data, &strategy_config) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };
    if universe.is_empty() {
        eprintln!("error: universe is empty");
        return ExitCode::from(5);
    }

    if strategy_config.environment == Environment::Live {
        eprintln!("warning: environment is live but no live venue is attached; replaying history");
    }

    // Stage 4: Replay
    let ids: Vec<String> = universe.assets.iter().map(|a| a.id.clone()).collect();
    eprintln!(
        "Loading {} assets, {} to {}",
        ids.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let venue = match ReplayVenue::load(&data, &ids, &bt_config) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    eprintln!("Replaying {} sessions", venue.sessions().len());
    let mut strategy = SellGapStrategy::new(strategy_config);
    let summary = run_replay(&mut strategy, &data, &venue);

    // Stage 5: Summary
    eprintln!("\n=== Replay Results ===");
    eprintln!("Sessions:         {}", summary.sessions);
    eprintln!("Fills:            {}", summary.fills);
    eprintln!("Realized P&L:     {:.2}", summary.realized_pnl);
    eprintln!("Final Equity:     {:.2}", summary.final_equity);
    eprintln!("Total Return:     {:.2}%", summary.total_return() * 100.0);
    ExitCode::SUCCESS
}

fn run_scan(config_path: &PathBuf, date_str: &str) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let date = match NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            eprintln!("error: invalid --date {date_str} (expected YYYY-MM-DD)");
            return ExitCode::from(2);
        }
    };

    let strategy_config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let universe = match resolve_universe(&data, &strategy_config) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };

    let candidates = compute_factors(
        &universe,
        &data,
        date,
        &strategy_config.factors,
        &strategy_config.screen,
    );

    println!("asset_id,moving_average,prior_low,volatility,last_close");
    for row in candidates.rows() {
        println!(
            "{},{:.4},{:.4},{:.6},{:.4}",
            row.asset_id, row.moving_average, row.prior_low, row.volatility, row.last_close
        );
    }
    eprintln!(
        "{}: {} of {} assets passed the screen",
        date,
        candidates.len(),
        universe.count()
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(e);
    }

    eprintln!("\nStrategy:");
    eprintln!("  environment:      {:?}", strategy.environment);
    eprintln!("  target notional:  {:.2}", strategy.target_value_per_position);
    eprintln!("  max short list:   {}", strategy.max_short_list);
    eprintln!(
        "  windows:          mavg {}, dollar volume {}, volatility {} (decay {})",
        strategy.factors.mavg_window,
        strategy.factors.dollar_volume_window,
        strategy.factors.volatility_window,
        strategy.factors.decay_rate
    );

    eprintln!("\nDaily schedule:");
    let session = strategy.session(NaiveDate::default());
    for trigger in strategy.schedule().resolve(&session) {
        eprintln!("  {}  {}", trigger.at.time().format("%H:%M"), trigger.callback);
    }

    if adapter.get_string("backtest", "start_date").is_some()
        || adapter.get_string("backtest", "end_date").is_some()
    {
        if let Err(e) = validate_backtest_config(&adapter) {
            return fail(e);
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
