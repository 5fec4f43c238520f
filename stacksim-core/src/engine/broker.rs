//! Broker: order-matching state machine.
//!
//! An order is either Pending (its venue is closed) or Resolved. Resolution
//! is terminal: the order becomes a Fill on the queue, or it is dropped with a
//! warning. The broker never emits FillDeclined and never retries a dropped
//! order.
//!
//! Execution price is the quoted price. Slippage is charged as a separate
//! fee so each cost component stays visible on the fill.

use super::calendar::{AlwaysOpen, MarketCalendar};
use super::context::StepContext;
use crate::domain::{
    Event, EventError, FillEvent, MarketEvent, OrderEvent, OrderKind, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Proportional execution costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Commission as a fraction of fill notional (0.001 = 0.1%).
    pub commission_pct: f64,
    /// Slippage as a fraction of quoted notional.
    pub slippage_pct: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            commission_pct: 0.001,
            slippage_pct: 0.0005,
        }
    }
}

impl BrokerConfig {
    pub fn frictionless() -> Self {
        Self {
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }
}

pub struct Broker {
    config: BrokerConfig,
    calendar: Box<dyn MarketCalendar>,
    // Oldest at the front.
    pending: VecDeque<OrderEvent>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.config)
            .field("calendar", &self.calendar.name())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default(), Box::new(AlwaysOpen))
    }
}

impl Broker {
    pub fn new(config: BrokerConfig, calendar: Box<dyn MarketCalendar>) -> Self {
        Self {
            config,
            calendar,
            pending: VecDeque::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_orders(&self) -> impl Iterator<Item = &OrderEvent> {
        self.pending.iter()
    }

    pub fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        match event {
            Event::Market(m) => self.on_market(m, ctx),
            Event::Order(o) => self.on_order(o, ctx),
            Event::Signal(_) | Event::Fill(_) | Event::FillDeclined(_) => Ok(()),
        }
    }

    fn on_order(&mut self, order: &OrderEvent, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        if order.kind != OrderKind::Market {
            tracing::warn!(symbol = %order.symbol, kind = %order.kind, "order kind not supported, dropped");
            return Ok(());
        }
        if !order.quantity.is_finite() || order.quantity <= 0.0 {
            tracing::warn!(
                symbol = %order.symbol,
                quantity = order.quantity,
                "order quantity must be positive, dropped"
            );
            return Ok(());
        }

        if !self.calendar.is_open(order.timestamp, &order.symbol) {
            tracing::info!(
                symbol = %order.symbol,
                at = %order.timestamp,
                calendar = self.calendar.name(),
                "market closed, holding order"
            );
            self.pending.push_back(order.clone());
            return Ok(());
        }

        match self.try_fill(order, order.timestamp, ctx) {
            Some(fill) => ctx.emit(fill),
            None => Ok(()),
        }
    }

    fn on_market(&mut self, market: &MarketEvent, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let now = market.timestamp;
        let mut still_closed = VecDeque::with_capacity(self.pending.len());
        let mut outcome = Ok(());
        while let Some(order) = self.pending.pop_front() {
            if !self.calendar.is_open(now, &order.symbol) {
                tracing::debug!(symbol = %order.symbol, at = %now, "market still closed, order stays pending");
                still_closed.push_back(order);
                continue;
            }
            if let Some(fill) = self.try_fill(&order, now, ctx) {
                if let Err(e) = ctx.emit(fill) {
                    outcome = Err(e);
                    break;
                }
            }
        }
        // Orders not yet visited keep their place behind the still-closed ones.
        still_closed.append(&mut self.pending);
        self.pending = still_closed;
        outcome
    }

    /// Price the order at `now`. `None` when no usable quote exists.
    fn try_fill(&self, order: &OrderEvent, now: Timestamp, ctx: &StepContext<'_>) -> Option<FillEvent> {
        let Some(price) = ctx.prices.price(&order.symbol, now) else {
            tracing::warn!(symbol = %order.symbol, at = %now, "no price for order, dropped");
            return None;
        };
        if !price.is_finite() || price <= 0.0 {
            tracing::warn!(symbol = %order.symbol, price, "price must be positive, order dropped");
            return None;
        }

        let slippage = self.config.slippage_pct * order.quantity * price;
        let fill_price = price;
        let commission = self.config.commission_pct * order.quantity * fill_price;

        tracing::debug!(
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            price = fill_price,
            commission,
            slippage,
            "order filled"
        );

        Some(FillEvent {
            timestamp: now,
            symbol: order.symbol.clone(),
            quantity: order.quantity,
            side: order.side,
            price: fill_price,
            commission,
            slippage,
        })
    }
}
