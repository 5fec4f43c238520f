//! Synthetic price history for tests, demos, and benchmarks.
//!
//! Daily bars starting 2024-01-01 UTC.

use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use stacksim_core::domain::Timestamp;

use crate::data_loader::{Bar, PriceHistory};

/// Open/high/low/close of one pattern bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    /// Flat bar: all four fields equal.
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }
}

pub fn start_date() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `n` daily bars alternating between `first` and `second`.
pub fn fixed_oscillating(symbol: &str, first: Ohlc, second: Ohlc, n: usize, volume: f64) -> PriceHistory {
    let mut history = PriceHistory::new();
    let t0 = start_date();
    for i in 0..n {
        let p = if i % 2 == 0 { first } else { second };
        history.insert(
            symbol,
            Bar {
                timestamp: t0 + Duration::days(i as i64),
                open: p.open,
                high: p.high,
                low: p.low,
                close: p.close,
                volume,
            },
        );
    }
    history
}

/// Parameters of a seeded random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalk {
    pub start_price: f64,
    pub days: usize,
    /// Mean daily return.
    pub drift: f64,
    /// Half-width of the uniform daily return band.
    pub volatility: f64,
    pub volume: f64,
    pub seed: u64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            days: 250,
            drift: 0.0,
            volatility: 0.02,
            volume: 1_000_000.0,
            seed: 42,
        }
    }
}

/// Per-symbol seed so one master seed yields independent paths.
fn symbol_seed(seed: u64, symbol: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

const PRICE_FLOOR: f64 = 0.01;

/// Random walk for each symbol. Same parameters, same history.
pub fn random_walk(symbols: &[&str], params: &RandomWalk) -> PriceHistory {
    let mut history = PriceHistory::new();
    let t0 = start_date();
    let band = params.volatility.abs();

    for symbol in symbols {
        let mut rng = StdRng::seed_from_u64(symbol_seed(params.seed, symbol));
        let mut prev = params.start_price.max(PRICE_FLOOR);
        for i in 0..params.days {
            let ret = params.drift + if band > 0.0 { rng.gen_range(-band..=band) } else { 0.0 };
            let open = prev;
            let close = (open * (1.0 + ret)).max(PRICE_FLOOR);
            let wick_up: f64 = if band > 0.0 { rng.gen_range(0.0..=band / 2.0) } else { 0.0 };
            let wick_down: f64 = if band > 0.0 { rng.gen_range(0.0..=band / 2.0) } else { 0.0 };
            let high = open.max(close) * (1.0 + wick_up);
            let low = (open.min(close) * (1.0 - wick_down)).max(PRICE_FLOOR.min(open.min(close)));
            history.insert(
                symbol,
                Bar {
                    timestamp: t0 + Duration::days(i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: params.volume,
                },
            );
            prev = close;
        }
    }
    history
}
