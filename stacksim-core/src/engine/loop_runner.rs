//! Event loop: the heart of the simulator.
//!
//! Each iteration pops one unit of work and broadcasts every event in it, in
//! a fixed order, to:
//! 1. Market context: refresh the price cache
//! 2. Broker: drain pending orders, fill new ones
//! 3. Portfolio: size signals, commit fills, mark positions
//! 4. Strategy: decide whether to signal
//!
//! Reactions land on top of the queue and are drained before the next
//! independent event. The run ends when the queue is empty, or on the first
//! fatal error.

use super::broker::Broker;
use super::context::StepContext;
use super::market_context::{MarketContext, PriceSource};
use super::portfolio::Portfolio;
use super::queue::EventQueue;
use super::state::{EngineError, EngineStatus, RunSummary};
use crate::collector::SnapshotCollector;
use crate::domain::{Event, EventError, MarketEvent, StepSnapshot};
use crate::strategy::Strategy;
use std::time::Instant;

pub struct Engine<C: SnapshotCollector> {
    queue: EventQueue,
    market: MarketContext,
    broker: Broker,
    portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    collector: C,
    /// Overrides the market context as the broker's and sizer's quote source.
    prices: Option<Box<dyn PriceSource>>,
    step_snapshots: bool,
    status: EngineStatus,
}

impl<C: SnapshotCollector> Engine<C> {
    pub fn new(broker: Broker, portfolio: Portfolio, strategy: Box<dyn Strategy>, collector: C) -> Self {
        Self {
            queue: EventQueue::new(),
            market: MarketContext::new(),
            broker,
            portfolio,
            strategy,
            collector,
            prices: None,
            step_snapshots: false,
            status: EngineStatus::Idle,
        }
    }

    /// Merge each broadcast event with the portfolio state into a step snapshot.
    pub fn with_step_snapshots(mut self, enabled: bool) -> Self {
        self.step_snapshots = enabled;
        self
    }

    /// Quote fills and sizing from `prices` instead of the latest cached close.
    pub fn with_price_source(mut self, prices: Box<dyn PriceSource>) -> Self {
        self.prices = Some(prices);
        self
    }

    // ── Ingestion ──────────────────────────────────────────────────────

    pub fn push(&mut self, event: Event) -> Result<(), EventError> {
        self.queue.push(event)
    }

    /// Queue market history so that the earliest observation is processed
    /// first. Returns the number of events loaded.
    pub fn load_market_data<I>(&mut self, events: I) -> Result<usize, EventError>
    where
        I: IntoIterator<Item = MarketEvent>,
    {
        self.queue
            .extend_chronological(events.into_iter().map(Event::Market))
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn market(&self) -> &MarketContext {
        &self.market
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn into_parts(self) -> (Portfolio, Broker, MarketContext, C) {
        (self.portfolio, self.broker, self.market, self.collector)
    }

    // ── Run loop ───────────────────────────────────────────────────────

    /// Drain the queue. A failed engine cannot be run again; a finished one
    /// can, after more events are pushed.
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        if matches!(self.status, EngineStatus::Running | EngineStatus::Failed) {
            return Err(EngineError::NotRunnable(self.status));
        }

        let started = Instant::now();
        self.status = EngineStatus::Running;
        tracing::info!(
            queued = self.queue.size(),
            strategy = self.strategy.name(),
            sizer = self.portfolio.sizer_name(),
            "run started"
        );

        let mut summary = RunSummary::default();
        let outcome = self.drain(&mut summary);
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        match outcome {
            Ok(()) => {
                self.status = EngineStatus::Done;
                tracing::info!(
                    elapsed_secs = summary.elapsed_secs,
                    units = summary.units,
                    events = summary.total_events(),
                    cash = self.portfolio.cash(),
                    "run finished"
                );
                Ok(summary)
            }
            Err(err) => {
                self.status = EngineStatus::Failed;
                tracing::error!(
                    elapsed_secs = summary.elapsed_secs,
                    units = summary.units,
                    error = %err,
                    "run aborted"
                );
                Err(err)
            }
        }
    }

    fn drain(&mut self, summary: &mut RunSummary) -> Result<(), EngineError> {
        loop {
            let unit = self.queue.pop_unit_of_work();
            if unit.is_empty() {
                return Ok(());
            }
            summary.units += 1;
            summary.max_batch = summary.max_batch.max(unit.len());

            for event in &unit {
                self.broadcast(event)?;
                summary.record(event.kind());
            }
        }
    }

    fn broadcast(&mut self, event: &Event) -> Result<(), EngineError> {
        tracing::trace!(%event, "broadcast");
        self.market.handle(event);

        {
            let prices: &dyn PriceSource = match &self.prices {
                Some(p) => &**p,
                None => &self.market,
            };
            let mut ctx = StepContext {
                queue: &mut self.queue,
                market: &self.market,
                prices,
                collector: &mut self.collector,
            };

            self.broker
                .handle(event, &mut ctx)
                .map_err(|source| EngineError::InvalidEvent {
                    component: "broker",
                    source,
                })?;
            self.portfolio
                .handle(event, &mut ctx)
                .map_err(|source| EngineError::InvalidEvent {
                    component: "portfolio",
                    source,
                })?;
            if let Err(source) = self.strategy.handle(event, &mut ctx) {
                return Err(EngineError::Strategy {
                    strategy: self.strategy.name().to_string(),
                    event: event.to_string(),
                    source,
                });
            }
        }

        if self.step_snapshots {
            let step = StepSnapshot {
                event: event.snapshot(),
                portfolio: self.portfolio.snapshot(event.timestamp(), &self.market),
            };
            self.collector.event_snapshot(step);
        }
        Ok(())
    }
}
