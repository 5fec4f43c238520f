//! Criterion benchmarks for stacksim hot paths.
//!
//! Benchmarks:
//! 1. Full run over synthetic history (market → signal → order → fill cascades)
//! 2. Queue batching of simultaneous market events
//! 3. Position fill application

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stacksim_core::domain::{Event, FillEvent, MarketEvent, Position, Side, SignalEvent, Timestamp};
use stacksim_core::engine::{AlwaysOpen, Broker, BrokerConfig, Engine, EventQueue, Portfolio, StepContext};
use stacksim_core::sizers::SizingModel;
use stacksim_core::strategy::{Strategy, StrategyError};
use stacksim_core::NullCollector;

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
}

fn make_history(days: usize, symbols: &[String]) -> Vec<MarketEvent> {
    let mut out = Vec::with_capacity(days * symbols.len());
    for i in 0..days {
        for (k, symbol) in symbols.iter().enumerate() {
            let close = 100.0 + ((i + k) as f64 * 0.1).sin() * 10.0;
            out.push(MarketEvent {
                timestamp: t0() + Duration::days(i as i64),
                symbol: symbol.clone(),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0,
            });
        }
    }
    out
}

/// Alternates BUY and SELL on every bar, per symbol.
struct Flipper {
    holding: std::collections::HashMap<String, bool>,
}

impl Strategy for Flipper {
    fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), StrategyError> {
        if let Event::Market(m) = event {
            let held = self.holding.entry(m.symbol.clone()).or_insert(false);
            let side = if *held { Side::Sell } else { Side::Buy };
            *held = !*held;
            ctx.emit(SignalEvent {
                timestamp: m.timestamp,
                symbol: m.symbol.clone(),
                side,
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "flipper"
    }
}

// ── 1. Full run ──────────────────────────────────────────────────────

fn bench_engine_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_run");
    for &n_symbols in &[1usize, 10] {
        let symbols: Vec<String> = (0..n_symbols).map(|i| format!("S{i:02}")).collect();
        let history = make_history(2_000, &symbols);

        group.bench_with_input(BenchmarkId::from_parameter(n_symbols), &history, |b, history| {
            b.iter(|| {
                let mut portfolio = Portfolio::new(1_000_000.0);
                for s in &symbols {
                    portfolio.create_position(s);
                }
                if let Ok(sizer) = (SizingModel::Fixed { quantity: 10.0 }).build() {
                    portfolio.set_sizer(sizer);
                }
                let mut engine = Engine::new(
                    Broker::new(BrokerConfig::default(), Box::new(AlwaysOpen)),
                    portfolio,
                    Box::new(Flipper {
                        holding: Default::default(),
                    }),
                    NullCollector,
                );
                engine.load_market_data(history.iter().cloned()).ok();
                black_box(engine.run().ok())
            })
        });
    }
    group.finish();
}

// ── 2. Queue batching ────────────────────────────────────────────────

fn bench_queue_batching(c: &mut Criterion) {
    let symbols: Vec<String> = (0..50).map(|i| format!("S{i:02}")).collect();
    let history: Vec<Event> = make_history(200, &symbols)
        .into_iter()
        .map(Event::Market)
        .collect();

    c.bench_function("queue_pop_units_50x200", |b| {
        b.iter(|| {
            let mut q = EventQueue::new();
            q.extend_chronological(history.iter().cloned()).ok();
            let mut units = 0usize;
            while !q.pop_unit_of_work().is_empty() {
                units += 1;
            }
            black_box(units)
        })
    });
}

// ── 3. Position fills ────────────────────────────────────────────────

fn bench_position_fills(c: &mut Criterion) {
    let fills: Vec<FillEvent> = (0..1_000)
        .map(|i| FillEvent {
            timestamp: t0(),
            symbol: "SPY".into(),
            quantity: 10.0,
            side: if i % 2 == 0 { Side::Buy } else { Side::Sell },
            price: 100.0 + (i % 7) as f64,
            commission: 0.1,
            slippage: 0.05,
        })
        .collect();

    c.bench_function("position_apply_1000_fills", |b| {
        b.iter(|| {
            let mut pos = Position::new("SPY");
            for f in &fills {
                pos.apply_fill(f);
            }
            black_box(pos.realized_pnl)
        })
    });
}

criterion_group!(benches, bench_engine_run, bench_queue_batching, bench_position_fills);
criterion_main!(benches);
