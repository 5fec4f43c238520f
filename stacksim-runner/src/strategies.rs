//! Reference strategies.
//!
//! Both decide when to trade and nothing else. Quantities come from the
//! portfolio's sizer.

use std::collections::BTreeSet;

use stacksim_core::domain::{Event, MarketEvent, PriceField, Side, SignalEvent};
use stacksim_core::engine::StepContext;
use stacksim_core::strategy::{Strategy, StrategyError};

/// Buys when flat and the price drops to `buy_below`, sells when holding and
/// the price reaches `sell_above`.
///
/// The holding flag flips as soon as a signal is emitted. A `FillDeclined`
/// for the symbol flips it back, so a BUY the portfolio could not afford is
/// retried on the next qualifying bar.
#[derive(Debug, Clone)]
pub struct FixedPriceStrategy {
    symbol: String,
    buy_below: f64,
    sell_above: f64,
    field: PriceField,
    in_position: bool,
}

impl FixedPriceStrategy {
    pub fn new(symbol: impl Into<String>, buy_below: f64, sell_above: f64) -> Self {
        Self {
            symbol: symbol.into(),
            buy_below,
            sell_above,
            field: PriceField::Open,
            in_position: false,
        }
    }

    /// Compare against a different bar field (default: open).
    pub fn with_field(mut self, field: PriceField) -> Self {
        self.field = field;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[cfg(test)]
    pub fn in_position(&self) -> bool {
        self.in_position
    }

    fn quote(&self, m: &MarketEvent) -> f64 {
        match self.field {
            PriceField::Open => m.open,
            PriceField::High => m.high,
            PriceField::Low => m.low,
            PriceField::Close => m.close,
        }
    }

    fn on_market(&mut self, m: &MarketEvent, ctx: &mut StepContext<'_>) -> Result<(), StrategyError> {
        if m.symbol != self.symbol {
            return Ok(());
        }
        let price = self.quote(m);
        let side = if !self.in_position && price <= self.buy_below {
            Side::Buy
        } else if self.in_position && price >= self.sell_above {
            Side::Sell
        } else {
            return Ok(());
        };

        self.in_position = side == Side::Buy;
        tracing::debug!(symbol = %m.symbol, %side, price, at = %m.timestamp, "signal");
        ctx.emit(SignalEvent {
            timestamp: m.timestamp,
            symbol: m.symbol.clone(),
            side,
        })?;
        Ok(())
    }
}

impl Strategy for FixedPriceStrategy {
    fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), StrategyError> {
        match event {
            Event::Market(m) => self.on_market(m, ctx),
            Event::FillDeclined(d) if d.symbol == self.symbol => {
                self.in_position = !self.in_position;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "fixed_price"
    }
}

/// Buys every symbol once, on its first bar, and never sells.
///
/// A declined buy is retried on the symbol's next bar.
#[derive(Debug, Clone, Default)]
pub struct BuyAndHold {
    bought: BTreeSet<String>,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for BuyAndHold {
    fn handle(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Result<(), StrategyError> {
        match event {
            Event::Market(m) => {
                if self.bought.insert(m.symbol.clone()) {
                    ctx.emit(SignalEvent {
                        timestamp: m.timestamp,
                        symbol: m.symbol.clone(),
                        side: Side::Buy,
                    })?;
                }
            }
            Event::FillDeclined(d) => {
                self.bought.remove(&d.symbol);
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stacksim_core::domain::{FillDeclinedEvent, Timestamp};
    use stacksim_core::engine::{EventQueue, MarketContext};
    use stacksim_core::NullCollector;

    fn t(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn bar(symbol: &str, d: u32, open: f64) -> Event {
        Event::Market(MarketEvent {
            timestamp: t(d),
            symbol: symbol.into(),
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open + 0.5,
            volume: 10.0,
        })
    }

    /// Feed events to a strategy and return the sides it signalled, in order.
    fn drive(strategy: &mut dyn Strategy, events: &[Event]) -> Vec<(String, Side)> {
        let mut queue = EventQueue::new();
        let market = MarketContext::new();
        let mut sink = NullCollector;
        let mut out = Vec::new();
        for e in events {
            let mut ctx = StepContext {
                queue: &mut queue,
                market: &market,
                prices: &market,
                collector: &mut sink,
            };
            strategy.handle(e, &mut ctx).unwrap();
            while let Some(Event::Signal(s)) = queue.pop_unit_of_work().pop() {
                out.push((s.symbol, s.side));
            }
        }
        out
    }

    #[test]
    fn fixed_price_alternates_buy_and_sell() {
        let mut s = FixedPriceStrategy::new("SYN", 10.0, 20.0);
        let signals = drive(
            &mut s,
            &[
                bar("SYN", 1, 15.0),
                bar("SYN", 2, 10.0),
                bar("SYN", 3, 9.0),
                bar("SYN", 4, 20.0),
                bar("SYN", 5, 25.0),
                bar("SYN", 6, 5.0),
            ],
        );
        let sides: Vec<Side> = signals.into_iter().map(|(_, side)| side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell, Side::Buy]);
        assert!(s.in_position());
    }

    #[test]
    fn fixed_price_ignores_other_symbols() {
        let mut s = FixedPriceStrategy::new("SYN", 10.0, 20.0);
        assert!(drive(&mut s, &[bar("OTHER", 1, 1.0)]).is_empty());
        assert!(!s.in_position());
    }

    #[test]
    fn fixed_price_can_compare_close() {
        let mut s = FixedPriceStrategy::new("SYN", 10.0, 20.0).with_field(PriceField::Close);
        // open 10 qualifies, close 10.5 does not
        assert!(drive(&mut s, &[bar("SYN", 1, 10.0)]).is_empty());
    }

    #[test]
    fn declined_fill_resets_holding_flag() {
        let mut s = FixedPriceStrategy::new("SYN", 10.0, 20.0);
        let declined = Event::FillDeclined(FillDeclinedEvent {
            timestamp: t(1),
            symbol: "SYN".into(),
            reason: "insufficient cash".into(),
        });
        let signals = drive(&mut s, &[bar("SYN", 1, 5.0), declined, bar("SYN", 2, 5.0)]);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|(_, side)| *side == Side::Buy));
    }

    #[test]
    fn buy_and_hold_buys_each_symbol_once() {
        let mut s = BuyAndHold::new();
        let signals = drive(
            &mut s,
            &[bar("A", 1, 1.0), bar("B", 1, 1.0), bar("A", 2, 1.0), bar("B", 2, 1.0)],
        );
        assert_eq!(
            signals,
            vec![("A".to_string(), Side::Buy), ("B".to_string(), Side::Buy)]
        );
    }
}
