//! Domain types for the simulator: events, positions, trade records, snapshots.

pub mod event;
pub mod position;
pub mod snapshot;
pub mod trade;

pub use event::{
    Event, EventError, EventKind, FillDeclinedEvent, FillEvent, MarketEvent, OrderEvent,
    OrderKind, SignalEvent, Side,
};
pub use position::Position;
pub use snapshot::{EventSnapshot, FillSnapshot, PortfolioSnapshot, PositionSnapshot, StepSnapshot};
pub use trade::TradeRecord;

/// Symbol type alias
pub type Symbol = String;

/// Every event and snapshot is stamped in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// OHLC field selector for price lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}
