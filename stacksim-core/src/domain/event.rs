//! Event model: the closed set of facts exchanged between components.
//!
//! Every component matches exhaustively on [`Event`]; adding a variant is a
//! compile error everywhere it is not handled.

use super::snapshot::EventSnapshot;
use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation failures detected when an event is ingested.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("order for {symbol} has invalid quantity {quantity}")]
    InvalidOrderQuantity { symbol: String, quantity: f64 },

    #[error("fill for {symbol} has invalid {field}: {value}")]
    InvalidFillField {
        symbol: String,
        field: &'static str,
        value: f64,
    },

    #[error("unknown side '{0}' (expected BUY or SELL)")]
    UnknownSide(String),

    #[error("unknown order kind '{0}' (expected MARKET, LIMIT or STOP)")]
    UnknownOrderKind(String),
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(EventError::UnknownSide(s.to_string())),
        }
    }
}

/// Order kind. Only `Market` is executable; the broker discards the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
            OrderKind::Stop => "STOP",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MARKET" => Ok(OrderKind::Market),
            "LIMIT" => Ok(OrderKind::Limit),
            "STOP" => Ok(OrderKind::Stop),
            _ => Err(EventError::UnknownOrderKind(s.to_string())),
        }
    }
}

/// One OHLCV observation for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A strategy's request to trade in a direction; quantity is decided later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub side: Side,
}

/// A sized order, routed to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub kind: OrderKind,
    pub quantity: f64,
    pub side: Side,
}

impl OrderEvent {
    pub fn market(timestamp: Timestamp, symbol: impl Into<String>, quantity: f64, side: Side) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            kind: OrderKind::Market,
            quantity,
            side,
        }
    }
}

/// An executed order. Slippage is a separate fee; `price` is the quoted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub quantity: f64,
    pub side: Side,
    pub price: f64,
    pub commission: f64,
    pub slippage: f64,
}

impl FillEvent {
    /// Price × quantity, without fees.
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Notional plus commission and slippage.
    pub fn total_cost(&self) -> f64 {
        self.notional() + self.commission + self.slippage
    }
}

/// The portfolio refused a fill it could not pay for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillDeclinedEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub reason: String,
}

/// Discriminant of [`Event`], used for counting and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
    FillDeclined,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Market => "MARKET",
            EventKind::Signal => "SIGNAL",
            EventKind::Order => "ORDER",
            EventKind::Fill => "FILL",
            EventKind::FillDeclined => "FILL_DECLINED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
    FillDeclined(FillDeclinedEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
            Event::FillDeclined(_) => EventKind::FillDeclined,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::Market(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
            Event::FillDeclined(e) => e.timestamp,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => &e.symbol,
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
            Event::FillDeclined(e) => &e.symbol,
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self, Event::Market(_))
    }

    /// Ingestion check. Orders need a finite positive quantity; fills need a
    /// positive quantity and price and non-negative fees.
    pub fn validate(&self) -> Result<(), EventError> {
        match self {
            Event::Order(order) => {
                if !order.quantity.is_finite() || order.quantity <= 0.0 {
                    return Err(EventError::InvalidOrderQuantity {
                        symbol: order.symbol.clone(),
                        quantity: order.quantity,
                    });
                }
                Ok(())
            }
            Event::Fill(fill) => {
                let checks: [(&'static str, f64, bool); 4] = [
                    ("quantity", fill.quantity, fill.quantity > 0.0),
                    ("price", fill.price, fill.price > 0.0),
                    ("commission", fill.commission, fill.commission >= 0.0),
                    ("slippage", fill.slippage, fill.slippage >= 0.0),
                ];
                for (field, value, ok) in checks {
                    if !value.is_finite() || !ok {
                        return Err(EventError::InvalidFillField {
                            symbol: fill.symbol.clone(),
                            field,
                            value,
                        });
                    }
                }
                Ok(())
            }
            Event::Market(_) | Event::Signal(_) | Event::FillDeclined(_) => Ok(()),
        }
    }

    /// Flat descriptive record of this event for the step log.
    pub fn snapshot(&self) -> EventSnapshot {
        let mut snap = EventSnapshot::new(self.kind(), self.timestamp(), self.symbol());
        match self {
            Event::Market(e) => {
                snap.open = Some(e.open);
                snap.high = Some(e.high);
                snap.low = Some(e.low);
                snap.close = Some(e.close);
                snap.volume = Some(e.volume);
            }
            Event::Signal(e) => {
                snap.side = Some(e.side);
            }
            Event::Order(e) => {
                snap.side = Some(e.side);
                snap.order_kind = Some(e.kind);
                snap.quantity = Some(e.quantity);
            }
            Event::Fill(e) => {
                snap.side = Some(e.side);
                snap.quantity = Some(e.quantity);
                snap.price = Some(e.price);
                snap.commission = Some(e.commission);
                snap.slippage = Some(e.slippage);
            }
            Event::FillDeclined(e) => {
                snap.reason = Some(e.reason.clone());
            }
        }
        snap
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Market(e) => write!(f, "Market({}, {}, close={})", e.timestamp, e.symbol, e.close),
            Event::Signal(e) => write!(f, "Signal({}, {}, {})", e.timestamp, e.symbol, e.side),
            Event::Order(e) => write!(
                f,
                "Order({}, {}, {}, {}, {})",
                e.timestamp, e.symbol, e.kind, e.quantity, e.side
            ),
            Event::Fill(e) => write!(
                f,
                "Fill({}, {}, {} {} @ {}, commission={:.4}, slippage={:.4})",
                e.timestamp, e.symbol, e.side, e.quantity, e.price, e.commission, e.slippage
            ),
            Event::FillDeclined(e) => {
                write!(f, "FillDeclined({}, {}, {})", e.timestamp, e.symbol, e.reason)
            }
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}

impl From<FillDeclinedEvent> for Event {
    fn from(e: FillDeclinedEvent) -> Self {
        Event::FillDeclined(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    fn fill(quantity: f64, price: f64, commission: f64, slippage: f64) -> Event {
        Event::Fill(FillEvent {
            timestamp: ts(),
            symbol: "AAPL".into(),
            quantity,
            side: Side::Buy,
            price,
            commission,
            slippage,
        })
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" SELL ".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!(
            "LONG".parse::<Side>(),
            Err(EventError::UnknownSide("LONG".into()))
        );
    }

    #[test]
    fn order_kind_parses() {
        assert_eq!("market".parse::<OrderKind>().unwrap(), OrderKind::Market);
        assert_eq!("LIMIT".parse::<OrderKind>().unwrap(), OrderKind::Limit);
        assert!("ICEBERG".parse::<OrderKind>().is_err());
    }

    #[test]
    fn order_with_non_positive_quantity_is_invalid() {
        for quantity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let order = Event::Order(OrderEvent::market(ts(), "AAPL", quantity, Side::Buy));
            assert!(order.validate().is_err(), "quantity {quantity} accepted");
        }
        let ok = Event::Order(OrderEvent::market(ts(), "AAPL", 0.5, Side::Sell));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn fill_field_validation_names_the_field() {
        assert!(fill(10.0, 100.0, 0.0, 0.0).validate().is_ok());

        match fill(10.0, 0.0, 0.0, 0.0).validate() {
            Err(EventError::InvalidFillField { field, .. }) => assert_eq!(field, "price"),
            other => panic!("unexpected {other:?}"),
        }
        match fill(10.0, 100.0, -0.1, 0.0).validate() {
            Err(EventError::InvalidFillField { field, .. }) => assert_eq!(field, "commission"),
            other => panic!("unexpected {other:?}"),
        }
        match fill(10.0, 100.0, 0.0, f64::NAN).validate() {
            Err(EventError::InvalidFillField { field, .. }) => assert_eq!(field, "slippage"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fill_costs() {
        let f = FillEvent {
            timestamp: ts(),
            symbol: "AAPL".into(),
            quantity: 10.0,
            side: Side::Buy,
            price: 100.0,
            commission: 1.0,
            slippage: 0.5,
        };
        assert_eq!(f.notional(), 1000.0);
        assert_eq!(f.total_cost(), 1001.5);
    }

    #[test]
    fn snapshot_carries_kind_specific_fields() {
        let order = Event::Order(OrderEvent::market(ts(), "AAPL", 3.0, Side::Sell));
        let snap = order.snapshot();
        assert_eq!(snap.kind, EventKind::Order);
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(snap.quantity, Some(3.0));
        assert_eq!(snap.side, Some(Side::Sell));
        assert_eq!(snap.close, None);
    }

    #[test]
    fn side_serializes_upper_case() {
        let json = serde_json::to_string(&Side::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
    }
}
