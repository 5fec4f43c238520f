//! stacksim CLI: run simulations and generate synthetic price history.
//!
//! Commands:
//! - `run`: simulate a reference strategy over a CSV price file
//! - `synth`: write an oscillating or random-walk OHLCV CSV

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stacksim_core::domain::PriceField;
use stacksim_core::strategy::Strategy;
use stacksim_runner::data_loader::{load_csv, save_csv};
use stacksim_runner::export::save_artifacts;
use stacksim_runner::runner::run_simulation;
use stacksim_runner::strategies::{BuyAndHold, FixedPriceStrategy};
use stacksim_runner::synthetic::{fixed_oscillating, random_walk, Ohlc, RandomWalk};
use stacksim_runner::{PriceHistory, SimConfig, SimulationReport};

#[derive(Parser)]
#[command(name = "stacksim", about = "Event-driven market simulator")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyKind {
    FixedPrice,
    BuyAndHold,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FieldArg {
    Open,
    High,
    Low,
    Close,
}

impl From<FieldArg> for PriceField {
    fn from(f: FieldArg) -> Self {
        match f {
            FieldArg::Open => PriceField::Open,
            FieldArg::High => PriceField::High,
            FieldArg::Low => PriceField::Low,
            FieldArg::Close => PriceField::Close,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a strategy over a CSV price file.
    Run {
        /// OHLCV CSV (Date,Symbol,Open,High,Low,Close,Volume).
        #[arg(long)]
        data: PathBuf,

        /// TOML config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = StrategyKind::FixedPrice)]
        strategy: StrategyKind,

        /// Symbol for fixed-price. Defaults to the only symbol in the data.
        #[arg(long)]
        symbol: Option<String>,

        /// Buy when flat and the open is at or below this level.
        #[arg(long)]
        buy_below: Option<f64>,

        /// Sell when holding and the open is at or above this level.
        #[arg(long)]
        sell_above: Option<f64>,

        /// Bar field fixed-price compares against.
        #[arg(long, value_enum, default_value_t = FieldArg::Open)]
        field: FieldArg,

        /// Write report, logs and the resolved config here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write synthetic OHLCV CSV.
    Synth {
        /// Symbols to generate (random walk accepts several).
        #[arg(long, required = true)]
        symbol: Vec<String>,

        #[arg(long, default_value_t = 250)]
        days: usize,

        #[arg(long)]
        out: PathBuf,

        /// Oscillating pattern: low bar price.
        #[arg(long, default_value_t = 10.0)]
        low: f64,

        /// Oscillating pattern: high bar price.
        #[arg(long, default_value_t = 20.0)]
        high: f64,

        #[arg(long, default_value_t = 10.0)]
        volume: f64,

        /// Seeded random walk instead of the oscillating pattern.
        #[arg(long, default_value_t = false)]
        random_walk: bool,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Random walk starting price.
        #[arg(long, default_value_t = 100.0)]
        start: f64,

        /// Random walk daily return half-width.
        #[arg(long, default_value_t = 0.02)]
        volatility: f64,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            data,
            config,
            strategy,
            symbol,
            buy_below,
            sell_above,
            field,
            output_dir,
        } => run_cmd(RunArgs {
            data,
            config_path: config,
            kind: strategy,
            symbol,
            buy_below,
            sell_above,
            field,
            output_dir,
        }),
        Commands::Synth {
            symbol,
            days,
            out,
            low,
            high,
            volume,
            random_walk: walk,
            seed,
            start,
            volatility,
        } => {
            let history = if walk {
                let params = RandomWalk {
                    start_price: start,
                    days,
                    volatility,
                    volume,
                    seed,
                    ..RandomWalk::default()
                };
                let refs: Vec<&str> = symbol.iter().map(|s| s.as_str()).collect();
                random_walk(&refs, &params)
            } else {
                synth_oscillating(&symbol, low, high, days, volume)?
            };
            save_csv(&history, &out).with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} bars to {}", history.len(), out.display());
            Ok(())
        }
    }
}

fn synth_oscillating(symbols: &[String], low: f64, high: f64, days: usize, volume: f64) -> Result<PriceHistory> {
    let [symbol] = symbols else {
        bail!("the oscillating pattern takes exactly one --symbol");
    };
    if !(low > 0.0 && high > 0.0) {
        bail!("--low and --high must be positive");
    }
    Ok(fixed_oscillating(symbol, Ohlc::flat(low), Ohlc::flat(high), days, volume))
}

struct RunArgs {
    data: PathBuf,
    config_path: Option<PathBuf>,
    kind: StrategyKind,
    symbol: Option<String>,
    buy_below: Option<f64>,
    sell_above: Option<f64>,
    field: FieldArg,
    output_dir: Option<PathBuf>,
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let RunArgs {
        data,
        config_path,
        kind,
        symbol,
        buy_below,
        sell_above,
        field,
        output_dir,
    } = args;
    let config = match &config_path {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    tracing::debug!(config = ?config, "configuration");
    let history = load_csv(&data)?;

    let strategy: Box<dyn Strategy> = match kind {
        StrategyKind::BuyAndHold => Box::new(BuyAndHold::new()),
        StrategyKind::FixedPrice => {
            let (Some(buy), Some(sell)) = (buy_below, sell_above) else {
                bail!("fixed-price needs --buy-below and --sell-above");
            };
            let symbol = match symbol {
                Some(s) => s,
                None => match history.symbols().as_slice() {
                    [only] => only.to_string(),
                    _ => bail!("data has several symbols; pass --symbol"),
                },
            };
            let fixed = FixedPriceStrategy::new(symbol, buy, sell).with_field(field.into());
            tracing::info!(
                symbol = fixed.symbol(),
                buy_below = buy,
                sell_above = sell,
                field = ?field,
                "fixed-price strategy"
            );
            Box::new(fixed)
        }
    };

    let out = run_simulation(&config, &history, strategy)?;
    print_summary(&out.report);

    if let Some(dir) = output_dir {
        save_artifacts(&out.report, &out.logs, &dir)?;
        let config_out = dir.join("config.toml");
        std::fs::write(&config_out, config.to_toml()?)
            .with_context(|| format!("writing {}", config_out.display()))?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn print_summary(r: &SimulationReport) {
    println!();
    println!("=== Simulation Result ===");
    println!("Strategy:       {}", r.strategy);
    println!("Sizer:          {}", r.sizer);
    println!("Symbols:        {}", r.symbols.join(", "));
    if let (Some(start), Some(end)) = (r.start, r.end) {
        println!("Period:         {} to {}", start.date_naive(), end.date_naive());
    }
    println!("Bars:           {}", r.bar_count);
    println!("Trades:         {}", r.trade_count);
    println!("Declined:       {}", r.declined_count);
    println!();
    println!("--- Ledger ---");
    println!("Initial Cash:   {:.2}", r.initial_cash);
    println!("Final Cash:     {:.2}", r.final_cash);
    println!("Final Equity:   {:.2}", r.final_equity);
    println!("Total Return:   {:.2}%", r.total_return * 100.0);
    println!("Realized PnL:   {:.2}", r.realized_pnl);
    println!("Unrealized PnL: {:.2}", r.unrealized_pnl);
    println!("Commission:     {:.2}", r.total_commission);
    println!("Slippage:       {:.2}", r.total_slippage);
    if r.pending_orders > 0 {
        println!();
        println!("WARNING: {} orders still pending at end of data", r.pending_orders);
    }
    println!();
    println!("Fingerprint:    {}", r.fingerprint);
}
