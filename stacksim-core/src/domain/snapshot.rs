//! Flat, serialisable records handed to a snapshot collector.
//!
//! Snapshots are descriptive copies. Nothing in the core reads them back.

use super::event::{EventKind, OrderKind, Side};
use super::Timestamp;
use serde::{Deserialize, Serialize};

/// Descriptive record of a single event. Fields that do not apply to the
/// event's kind are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub kind: EventKind,
    pub timestamp: Timestamp,
    pub symbol: String,
    pub side: Option<Side>,
    pub order_kind: Option<OrderKind>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub commission: Option<f64>,
    pub slippage: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub reason: Option<String>,
}

impl EventSnapshot {
    pub fn new(kind: EventKind, timestamp: Timestamp, symbol: &str) -> Self {
        Self {
            kind,
            timestamp,
            symbol: symbol.to_string(),
            side: None,
            order_kind: None,
            quantity: None,
            price: None,
            commission: None,
            slippage: None,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            reason: None,
        }
    }
}

/// Account-level state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: Timestamp,
    pub cash: f64,
    pub cash_reserve: f64,
    pub invested_value: f64,
    pub equity: f64,
    pub realized_pnl: f64,
    pub cumulated_commission: f64,
    pub cumulated_slippage: f64,
    pub open_positions: usize,
}

/// Per-symbol position state, marked at the latest known price when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub realized_pnl: f64,
    pub cumulated_commission: f64,
    pub cumulated_slippage: f64,
    pub market_price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}

/// A fill the portfolio committed, with the cash balance after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSnapshot {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub slippage: f64,
    pub cash_after: f64,
}

/// The event's descriptive record merged with the portfolio state after it
/// was broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub event: EventSnapshot,
    pub portfolio: PortfolioSnapshot,
}
