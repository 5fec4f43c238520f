//! Portfolio: cash, positions and the sizing policy.
//!
//! Turns signals into sized orders and fills into ledger mutations. Fills are
//! committed transactionally: solvency is checked against a staged balance
//! first, and only a fill that passes touches the position and the cash.

use super::context::StepContext;
use super::market_context::MarketContext;
use crate::domain::{
    Event, EventError, FillDeclinedEvent, FillEvent, FillSnapshot, MarketEvent, OrderEvent,
    PortfolioSnapshot, Position, Side, SignalEvent, Timestamp, TradeRecord,
};
use crate::sizers::{AccountSnapshot, MaxSizer, ReservePolicy, Sizer};
use std::collections::BTreeMap;

pub struct Portfolio {
    initial_cash: f64,
    cash: f64,
    cash_reserve: f64,
    positions: BTreeMap<String, Position>,
    sizer: Box<dyn Sizer>,
    reserve_policy: ReservePolicy,
    cumulated_commission: f64,
    cumulated_slippage: f64,
    invested_value: f64,
    snapshots: bool,
    trade_log: Vec<TradeRecord>,
    declined: Vec<FillDeclinedEvent>,
}

impl std::fmt::Debug for Portfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portfolio")
            .field("cash", &self.cash)
            .field("cash_reserve", &self.cash_reserve)
            .field("positions", &self.positions)
            .field("sizer", &self.sizer.name())
            .field("reserve_policy", &self.reserve_policy)
            .finish_non_exhaustive()
    }
}

impl Portfolio {
    /// New portfolio with the MAX sizer and the default reserve policy.
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            cash_reserve: 0.0,
            positions: BTreeMap::new(),
            sizer: Box::new(MaxSizer),
            reserve_policy: ReservePolicy::default(),
            cumulated_commission: 0.0,
            cumulated_slippage: 0.0,
            invested_value: 0.0,
            snapshots: false,
            trade_log: Vec::new(),
            declined: Vec::new(),
        }
    }

    // ── Setup ──────────────────────────────────────────────────────────

    /// Register a symbol. Returns `false` if it already exists.
    pub fn create_position(&mut self, symbol: &str) -> bool {
        if self.positions.contains_key(symbol) {
            return false;
        }
        self.positions
            .insert(symbol.to_string(), Position::new(symbol));
        true
    }

    pub fn set_sizer(&mut self, sizer: Box<dyn Sizer>) {
        self.sizer = sizer;
    }

    pub fn set_reserve_policy(&mut self, policy: ReservePolicy) {
        self.reserve_policy = policy;
    }

    pub fn set_snapshots(&mut self, enabled: bool) {
        self.snapshots = enabled;
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn cash_reserve(&self) -> f64 {
        self.cash_reserve
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn sizer_name(&self) -> &str {
        self.sizer.name()
    }

    pub fn cumulated_commission(&self) -> f64 {
        self.cumulated_commission
    }

    pub fn cumulated_slippage(&self) -> f64 {
        self.cumulated_slippage
    }

    pub fn trade_log(&self) -> &[TradeRecord] {
        &self.trade_log
    }

    pub fn declined_fills(&self) -> &[FillDeclinedEvent] {
        &self.declined
    }

    pub fn realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Value of all positions as of the last Market event handled.
    pub fn invested_value(&self) -> f64 {
        self.invested_value
    }

    /// Cash plus positions marked at the latest known closes.
    pub fn equity(&self, market: &MarketContext) -> f64 {
        self.cash + Self::mark(&self.positions, market)
    }

    pub fn snapshot(&self, at: Timestamp, market: &MarketContext) -> PortfolioSnapshot {
        let invested = Self::mark(&self.positions, market);
        PortfolioSnapshot {
            timestamp: at,
            cash: self.cash,
            cash_reserve: self.cash_reserve,
            invested_value: invested,
            equity: self.cash + invested,
            realized_pnl: self.realized_pnl(),
            cumulated_commission: self.cumulated_commission,
            cumulated_slippage: self.cumulated_slippage,
            open_positions: self.positions.values().filter(|p| !p.is_flat()).count(),
        }
    }

    fn mark(positions: &BTreeMap<String, Position>, market: &MarketContext) -> f64 {
        positions
            .iter()
            .filter_map(|(sym, pos)| market.close(sym).map(|px| pos.market_value(px)))
            .sum()
    }

    // ── Event handling ─────────────────────────────────────────────────

    pub fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        match event {
            Event::Market(m) => {
                self.on_market(m, ctx);
                Ok(())
            }
            Event::Signal(s) => self.on_signal(s, ctx),
            Event::Fill(f) => self.on_fill(f, ctx),
            Event::Order(_) | Event::FillDeclined(_) => Ok(()),
        }
    }

    fn on_market(&mut self, m: &MarketEvent, ctx: &mut StepContext<'_>) {
        if !self.positions.contains_key(&m.symbol) {
            return;
        }
        self.invested_value = Self::mark(&self.positions, ctx.market);
        self.emit_snapshots(m.timestamp, &m.symbol, ctx);
    }

    fn on_signal(&mut self, s: &SignalEvent, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        self.cash_reserve = self.reserve_policy.reserve(self.cash);

        if !self.positions.contains_key(&s.symbol) {
            tracing::error!(symbol = %s.symbol, "signal for unknown symbol dropped");
            return Ok(());
        }

        let account = AccountSnapshot {
            cash: self.cash,
            cash_reserve: self.cash_reserve,
        };
        let price = ctx.prices.price(&s.symbol, s.timestamp);
        let quantity = self.sizer.size(&account, &self.positions, s, price);

        match quantity {
            Some(q) if q.is_finite() && q > 0.0 => {
                tracing::debug!(
                    symbol = %s.symbol,
                    side = %s.side,
                    quantity = q,
                    sizer = self.sizer.name(),
                    "order generated"
                );
                ctx.emit(OrderEvent::market(s.timestamp, s.symbol.clone(), q, s.side))
            }
            _ => {
                tracing::debug!(
                    symbol = %s.symbol,
                    side = %s.side,
                    sizer = self.sizer.name(),
                    "sizer produced no order"
                );
                Ok(())
            }
        }
    }

    fn on_fill(&mut self, fill: &FillEvent, ctx: &mut StepContext<'_>) -> Result<(), EventError> {
        let Some(position) = self.positions.get_mut(&fill.symbol) else {
            tracing::error!(symbol = %fill.symbol, "fill for unknown symbol dropped");
            return Ok(());
        };

        let staged = match Self::stage_cash(self.cash, fill) {
            Ok(balance) => balance,
            Err(reason) => {
                tracing::warn!(
                    symbol = %fill.symbol,
                    side = %fill.side,
                    cash = self.cash,
                    reason = %reason,
                    "fill declined"
                );
                let declined = FillDeclinedEvent {
                    timestamp: fill.timestamp,
                    symbol: fill.symbol.clone(),
                    reason,
                };
                self.declined.push(declined.clone());
                return ctx.emit(declined);
            }
        };

        let realized_before = position.realized_pnl;
        if !position.apply_fill(fill) {
            return Ok(());
        }
        let realized = position.realized_pnl - realized_before;

        let cash_delta = staged - self.cash;
        self.cash = staged;
        self.cumulated_commission += fill.commission;
        self.cumulated_slippage += fill.slippage;
        self.trade_log
            .push(TradeRecord::from_fill(fill, cash_delta, self.cash, realized));

        tracing::debug!(
            symbol = %fill.symbol,
            side = %fill.side,
            quantity = fill.quantity,
            price = fill.price,
            cash = self.cash,
            "fill committed"
        );

        if self.snapshots {
            ctx.collector.fill_snapshot(FillSnapshot {
                timestamp: fill.timestamp,
                symbol: fill.symbol.clone(),
                side: fill.side,
                quantity: fill.quantity,
                price: fill.price,
                commission: fill.commission,
                slippage: fill.slippage,
                cash_after: self.cash,
            });
        }
        self.invested_value = Self::mark(&self.positions, ctx.market);
        self.emit_snapshots(fill.timestamp, &fill.symbol, ctx);
        Ok(())
    }

    /// Cash balance after the fill, or the reason it cannot be paid.
    ///
    /// Checks run in order: notional, commission, slippage. A sell credits
    /// its notional before the fee checks.
    fn stage_cash(cash: f64, fill: &FillEvent) -> Result<f64, String> {
        let mut balance = cash;
        match fill.side {
            Side::Buy => {
                let notional = fill.notional();
                if notional > balance {
                    return Err(format!(
                        "insufficient cash for notional: need {notional:.4}, have {balance:.4}"
                    ));
                }
                balance -= notional;
            }
            Side::Sell => balance += fill.notional(),
        }
        if fill.commission > balance {
            return Err(format!(
                "insufficient cash for commission: need {:.4}, have {balance:.4}",
                fill.commission
            ));
        }
        balance -= fill.commission;
        if fill.slippage > balance {
            return Err(format!(
                "insufficient cash for slippage: need {:.4}, have {balance:.4}",
                fill.slippage
            ));
        }
        balance -= fill.slippage;
        Ok(balance)
    }

    fn emit_snapshots(&self, at: Timestamp, symbol: &str, ctx: &mut StepContext<'_>) {
        if !self.snapshots {
            return;
        }
        ctx.collector.portfolio_snapshot(self.snapshot(at, ctx.market));
        if let Some(pos) = self.positions.get(symbol) {
            ctx.collector
                .position_snapshot(pos.snapshot(at, ctx.market.close(symbol)));
        }
    }
}
