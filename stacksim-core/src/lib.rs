//! stacksim core: event model, stack-ordered event queue, broker, portfolio.
//!
//! This crate contains the causal core of the simulator:
//! - Domain types (events, positions, trade records, snapshots)
//! - Event queue with same-timestamp market batching
//! - Market context price cache
//! - Broker order-matching state machine with a pending-order area
//! - Portfolio ledger with a solvency gate and pluggable sizing
//! - The run loop that broadcasts every event to each component in order

pub mod collector;
pub mod domain;
pub mod engine;
pub mod sizers;
pub mod strategy;

pub use collector::{DataCollector, NullCollector, SnapshotCollector};
pub use domain::{
    Event, EventError, EventKind, FillDeclinedEvent, FillEvent, MarketEvent, OrderEvent,
    OrderKind, Position, PriceField, Side, SignalEvent, Timestamp, TradeRecord,
};
pub use engine::{
    AlwaysOpen, Broker, BrokerConfig, Engine, EngineError, EngineStatus, EventQueue,
    MarketCalendar, MarketContext, Portfolio, PriceSource, RunSummary, StepContext,
};
pub use sizers::{AccountSnapshot, FixedSizer, MaxSizer, ReservePolicy, Sizer, SizingModel};
pub use strategy::{NullStrategy, Strategy, StrategyError};
