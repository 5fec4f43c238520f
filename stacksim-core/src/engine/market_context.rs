//! Latest observed OHLCV per symbol.
//!
//! A pure cache: it consumes Market events, never emits anything, and answers
//! `None` for symbols it has not seen. Callers treat `None` as "cannot price".

use crate::domain::{Event, MarketEvent, PriceField, Timestamp};
use std::collections::HashMap;

/// Something that can quote a price for a symbol at a point in time.
pub trait PriceSource: Send + Sync {
    fn price(&self, symbol: &str, at: Timestamp) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Quote {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl From<&MarketEvent> for Quote {
    fn from(m: &MarketEvent) -> Self {
        Self {
            open: m.open,
            high: m.high,
            low: m.low,
            close: m.close,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MarketContext {
    quotes: HashMap<String, Quote>,
    last_timestamp: Option<Timestamp>,
}

impl MarketContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only Market events are consumed; everything else is ignored.
    pub fn handle(&mut self, event: &Event) {
        if let Event::Market(m) = event {
            self.quotes.insert(m.symbol.clone(), Quote::from(m));
            self.last_timestamp = Some(m.timestamp);
        }
    }

    pub fn price(&self, symbol: &str, field: PriceField) -> Option<f64> {
        let q = self.quotes.get(symbol)?;
        Some(match field {
            PriceField::Open => q.open,
            PriceField::High => q.high,
            PriceField::Low => q.low,
            PriceField::Close => q.close,
        })
    }

    pub fn close(&self, symbol: &str) -> Option<f64> {
        self.price(symbol, PriceField::Close)
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.last_timestamp
    }
}

impl PriceSource for MarketContext {
    /// Latest cached close, regardless of `at`.
    fn price(&self, symbol: &str, _at: Timestamp) -> Option<f64> {
        self.close(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Side, SignalEvent};
    use chrono::{TimeZone, Utc};

    fn bar(day: u32, symbol: &str, close: f64) -> Event {
        Event::Market(MarketEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            symbol: symbol.into(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 100.0,
        })
    }

    #[test]
    fn unknown_symbol_yields_none() {
        let ctx = MarketContext::new();
        assert_eq!(ctx.price("AAPL", PriceField::Close), None);
        assert_eq!(ctx.time(), None);
    }

    #[test]
    fn market_event_overwrites_snapshot_and_time() {
        let mut ctx = MarketContext::new();
        ctx.handle(&bar(1, "AAPL", 10.0));
        ctx.handle(&bar(2, "AAPL", 12.0));

        assert_eq!(ctx.price("AAPL", PriceField::Close), Some(12.0));
        assert_eq!(ctx.price("AAPL", PriceField::Open), Some(11.0));
        assert_eq!(ctx.price("AAPL", PriceField::High), Some(13.0));
        assert_eq!(ctx.price("AAPL", PriceField::Low), Some(10.0));
        assert_eq!(ctx.time(), Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn other_events_are_ignored() {
        let mut ctx = MarketContext::new();
        ctx.handle(&Event::Signal(SignalEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            symbol: "AAPL".into(),
            side: Side::Buy,
        }));
        assert_eq!(ctx.close("AAPL"), None);
        assert_eq!(ctx.time(), None);
    }

    #[test]
    fn price_source_quotes_latest_close() {
        let mut ctx = MarketContext::new();
        ctx.handle(&bar(3, "MSFT", 50.0));
        let src: &dyn PriceSource = &ctx;
        let any_time = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(src.price("MSFT", any_time), Some(50.0));
        assert_eq!(src.price("AAPL", any_time), None);
    }
}
