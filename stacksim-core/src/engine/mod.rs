//! Simulation engine: event queue, market context, broker, portfolio and the
//! run loop that ties them together.
//!
//! Components never hold references to each other. Each broadcast hands them
//! a [`StepContext`] borrowing the queue, the price cache and the collector.

pub mod broker;
pub mod calendar;
pub mod context;
pub mod loop_runner;
pub mod market_context;
pub mod portfolio;
pub mod queue;
pub mod state;

pub use broker::{Broker, BrokerConfig};
pub use calendar::{AlwaysOpen, MarketCalendar};
pub use context::StepContext;
pub use loop_runner::Engine;
pub use market_context::{MarketContext, PriceSource};
pub use portfolio::Portfolio;
pub use queue::EventQueue;
pub use state::{EngineError, EngineStatus, RunSummary};
