//! Position sizers: decide how many units a signal trades.
//!
//! Sizers are stateless. They read an account snapshot, the current
//! positions and a quote, and return a quantity or `None` for "do not trade".
//! The cash reserve they respect is set beforehand by a [`ReservePolicy`].

pub mod fixed;
pub mod max;
pub mod reserve;

pub use fixed::FixedSizer;
pub use max::MaxSizer;
pub use reserve::ReservePolicy;

use crate::domain::{Position, SignalEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Read-only account view handed to sizers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub cash: f64,
    /// Cash excluded from sizing.
    pub cash_reserve: f64,
}

impl AccountSnapshot {
    /// Cash available for sizing, never below zero.
    pub fn free_cash(&self) -> f64 {
        (self.cash - self.cash_reserve).max(0.0)
    }
}

/// Position sizing logic
///
/// # Responsibilities
/// - Convert account snapshot + signal + quote → order quantity
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the strategy's job)
/// - Sizers do NOT check solvency (that's the portfolio's job at fill time)
pub trait Sizer: Send + Sync {
    /// Quantity to trade, or `None` when no order should be generated.
    fn size(
        &self,
        account: &AccountSnapshot,
        positions: &BTreeMap<String, Position>,
        signal: &SignalEvent,
        price: Option<f64>,
    ) -> Option<f64>;

    /// Sizer name for reports and logging
    fn name(&self) -> &str;
}

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("fixed quantity must be finite and > 0, got {0}")]
    InvalidQuantity(f64),
}

/// Selectable sizing model, as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingModel {
    /// Stake all free cash on BUY, close the whole holding on SELL.
    #[default]
    Max,
    /// Always trade the same quantity.
    Fixed { quantity: f64 },
}

impl SizingModel {
    pub fn build(&self) -> Result<Box<dyn Sizer>, SizingError> {
        Ok(match *self {
            SizingModel::Max => Box::new(MaxSizer),
            SizingModel::Fixed { quantity } => Box::new(FixedSizer::new(quantity)?),
        })
    }
}
