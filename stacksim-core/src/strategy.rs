//! Strategy seam.
//!
//! A strategy sees every event after the market context, broker and
//! portfolio have handled it. It decides when to trade, never how much:
//! it pushes Signal events and the portfolio sizes them.

use crate::domain::{Event, EventError};
use crate::engine::StepContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy emitted an invalid event: {0}")]
    InvalidEvent(#[from] EventError),
}

pub trait Strategy: Send + Sync {
    fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), StrategyError>;

    /// Strategy name for reports and logging
    fn name(&self) -> &str;
}

/// Never trades.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStrategy;

impl Strategy for NullStrategy {
    fn handle(&mut self, _event: &Event, _ctx: &mut StepContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
