//! Simulation runner: wires config, history, and a strategy into an engine.
//!
//! `run_simulation` is the single entry point used by the CLI and tests. It
//! does no I/O; loading and exporting live in `data_loader` and `export`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stacksim_core::domain::{FillDeclinedEvent, PositionSnapshot, Timestamp, TradeRecord};
use stacksim_core::engine::{Broker, Engine, EngineError, Portfolio, RunSummary};
use stacksim_core::sizers::SizingError;
use stacksim_core::strategy::Strategy;
use stacksim_core::{DataCollector, EventError};

use crate::config::{ConfigError, PriceLookup, SimConfig};
use crate::data_loader::{LoadError, PriceHistory};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("sizing error: {0}")]
    Sizing(#[from] SizingError),
    #[error("invalid market data: {0}")]
    MarketData(#[from] EventError),
    #[error("symbol '{0}' not found in loaded data")]
    SymbolNotFound(String),
    #[error("no price data to simulate")]
    NoData,
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to serialise for hashing: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of one simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy: String,
    pub sizer: String,
    pub calendar: String,
    pub symbols: Vec<String>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub bar_count: usize,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub trade_count: usize,
    pub declined_count: usize,
    /// Orders still waiting for the market to open when the data ran out.
    pub pending_orders: usize,
    pub trades: Vec<TradeRecord>,
    pub declined: Vec<FillDeclinedEvent>,
    pub positions: Vec<PositionSnapshot>,
    pub summary: RunSummary,
    pub config_hash: String,
    pub dataset_hash: String,
    /// BLAKE3 of the JSON trade log.
    pub fingerprint: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Report plus every snapshot the run recorded.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub report: SimulationReport,
    pub logs: DataCollector,
}

/// BLAKE3 of the JSON-serialised trade log.
pub fn trade_fingerprint(trades: &[TradeRecord]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(trades)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// BLAKE3 over every bar, in (symbol, time) order.
pub fn dataset_hash(history: &PriceHistory) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(&history.market_events())?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// Resolve the traded symbols: the configured list, or every symbol in the data.
fn resolve_symbols(config: &SimConfig, history: &PriceHistory) -> Result<Vec<String>, RunError> {
    if config.symbols.is_empty() {
        return Ok(history.symbols().into_iter().map(String::from).collect());
    }
    for s in &config.symbols {
        if !history.contains(s) {
            return Err(RunError::SymbolNotFound(s.clone()));
        }
    }
    Ok(config.symbols.clone())
}

/// Run one simulation over `history` with `strategy`.
pub fn run_simulation(
    config: &SimConfig,
    history: &PriceHistory,
    strategy: Box<dyn Strategy>,
) -> Result<SimulationOutput, RunError> {
    config.validate()?;
    if history.is_empty() {
        return Err(RunError::NoData);
    }
    let symbols = resolve_symbols(config, history)?;

    let mut data = history.clone();
    if !config.symbols.is_empty() {
        data.retain_symbols(&symbols);
    }

    let mut portfolio = Portfolio::new(config.initial_cash);
    for s in &symbols {
        portfolio.create_position(s);
    }
    portfolio.set_sizer(config.sizing.build()?);
    portfolio.set_reserve_policy(config.reserve);
    portfolio.set_snapshots(config.snapshots.portfolio);

    let calendar = config.calendar.build();
    let calendar_name = calendar.name().to_string();
    let broker = Broker::new(config.broker.costs(), calendar);

    let mut engine = Engine::new(broker, portfolio, strategy, DataCollector::new())
        .with_step_snapshots(config.snapshots.step);
    if config.broker.price_lookup == PriceLookup::AtTimestamp {
        engine = engine.with_price_source(Box::new(data.clone()));
    }
    let bar_count = engine.load_market_data(data.market_events())?;

    let summary = engine.run()?;
    let strategy_name = engine.strategy_name().to_string();
    let (portfolio, broker, market, logs) = engine.into_parts();
    for order in broker.pending_orders() {
        tracing::warn!(
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            placed = %order.timestamp,
            "order still pending at end of data"
        );
    }

    let end = market.time();
    let start = symbols.iter().filter_map(|s| data.first_timestamp(s)).min();
    let positions: Vec<PositionSnapshot> = portfolio
        .positions()
        .values()
        .map(|p| p.snapshot(end.unwrap_or_default(), market.close(&p.symbol)))
        .collect();
    let unrealized_pnl = positions.iter().filter_map(|p| p.unrealized_pnl).sum();
    let final_equity = portfolio.equity(&market);
    let initial_cash = portfolio.initial_cash();
    let total_return = if initial_cash > 0.0 {
        final_equity / initial_cash - 1.0
    } else {
        0.0
    };
    let trades = portfolio.trade_log().to_vec();
    let declined = portfolio.declined_fills().to_vec();

    let report = SimulationReport {
        schema_version: SCHEMA_VERSION,
        strategy: strategy_name,
        sizer: portfolio.sizer_name().to_string(),
        calendar: calendar_name,
        symbols,
        start,
        end,
        bar_count,
        initial_cash,
        final_cash: portfolio.cash(),
        final_equity,
        total_return,
        realized_pnl: portfolio.realized_pnl(),
        unrealized_pnl,
        total_commission: portfolio.cumulated_commission(),
        total_slippage: portfolio.cumulated_slippage(),
        trade_count: trades.len(),
        declined_count: declined.len(),
        pending_orders: broker.pending_count(),
        fingerprint: trade_fingerprint(&trades)?,
        trades,
        declined,
        positions,
        summary,
        config_hash: config.config_hash()?,
        dataset_hash: dataset_hash(&data)?,
    };

    tracing::info!(
        strategy = %report.strategy,
        trades = report.trade_count,
        declined = report.declined_count,
        final_equity = report.final_equity,
        fingerprint = %report.fingerprint,
        "simulation finished"
    );

    Ok(SimulationOutput { report, logs })
}
