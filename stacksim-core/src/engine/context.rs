//! StepContext: what a component may touch while handling one broadcast.

use super::market_context::{MarketContext, PriceSource};
use super::queue::EventQueue;
use crate::collector::SnapshotCollector;
use crate::domain::{Event, EventError, Timestamp};

/// Borrowed view of the engine's shared state for a single broadcast.
///
/// Components push reactions through `queue`, read prices from `market` or
/// `prices`, and report to `collector`. Nothing here outlives the broadcast.
pub struct StepContext<'a> {
    pub queue: &'a mut EventQueue,
    pub market: &'a MarketContext,
    pub prices: &'a dyn PriceSource,
    pub collector: &'a mut dyn SnapshotCollector,
}

impl<'a> StepContext<'a> {
    /// Push a reaction on top of the queue.
    pub fn emit(&mut self, event: impl Into<Event>) -> Result<(), EventError> {
        self.queue.push(event.into())
    }

    /// Timestamp of the latest market observation.
    pub fn now(&self) -> Option<Timestamp> {
        self.market.time()
    }
}
