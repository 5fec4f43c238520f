//! Fixed Position Sizer
//!
//! Simplest sizer: trade the same quantity on every signal, either side.

use super::{AccountSnapshot, Sizer, SizingError};
use crate::domain::{Position, SignalEvent};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSizer {
    quantity: f64,
}

impl FixedSizer {
    pub fn new(quantity: f64) -> Result<Self, SizingError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(SizingError::InvalidQuantity(quantity));
        }
        Ok(Self { quantity })
    }
}

impl Sizer for FixedSizer {
    fn size(
        &self,
        _account: &AccountSnapshot,
        _positions: &BTreeMap<String, Position>,
        _signal: &SignalEvent,
        _price: Option<f64>,
    ) -> Option<f64> {
        Some(self.quantity)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
