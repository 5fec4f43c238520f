//! Per-symbol lot ledger.
//!
//! Quantity is never negative: a position is flat or long. Direction lives on
//! the fill's side, not on the sign of the quantity.

use super::event::{FillEvent, Side};
use super::snapshot::PositionSnapshot;
use super::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    /// Average cost per unit, fees included.
    pub avg_cost: f64,
    pub realized_pnl: f64,
    pub cumulated_commission: f64,
    pub cumulated_slippage: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0.0,
            avg_cost: 0.0,
            realized_pnl: 0.0,
            cumulated_commission: 0.0,
            cumulated_slippage: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }

    /// Apply a fill to the lot. Returns `false` when the fill is rejected
    /// (oversell or malformed quantity); state is unchanged in that case.
    pub fn apply_fill(&mut self, fill: &FillEvent) -> bool {
        if !fill.quantity.is_finite() || fill.quantity < 0.0 {
            tracing::warn!(
                symbol = %self.symbol,
                quantity = fill.quantity,
                "position rejected fill with invalid quantity"
            );
            return false;
        }
        if fill.quantity == 0.0 {
            return true;
        }

        match fill.side {
            Side::Buy => {
                let total_cost = self.avg_cost * self.quantity
                    + fill.price * fill.quantity
                    + fill.commission
                    + fill.slippage;
                self.quantity += fill.quantity;
                self.avg_cost = total_cost / self.quantity;
            }
            Side::Sell => {
                if fill.quantity > self.quantity {
                    tracing::warn!(
                        symbol = %self.symbol,
                        held = self.quantity,
                        requested = fill.quantity,
                        "position rejected sell larger than holding"
                    );
                    return false;
                }
                self.realized_pnl += (fill.price - self.avg_cost) * fill.quantity
                    - fill.commission
                    - fill.slippage;
                self.quantity -= fill.quantity;
                if self.quantity == 0.0 {
                    self.avg_cost = 0.0;
                }
            }
        }

        self.cumulated_commission += fill.commission;
        self.cumulated_slippage += fill.slippage;
        true
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.avg_cost) * self.quantity
    }

    pub fn snapshot(&self, timestamp: Timestamp, price: Option<f64>) -> PositionSnapshot {
        PositionSnapshot {
            timestamp,
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            avg_cost: self.avg_cost,
            realized_pnl: self.realized_pnl,
            cumulated_commission: self.cumulated_commission,
            cumulated_slippage: self.cumulated_slippage,
            market_price: price,
            market_value: price.map(|p| self.market_value(p)),
            unrealized_pnl: price.map(|p| self.unrealized_pnl(p)),
        }
    }
}
