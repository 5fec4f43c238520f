//! TradeRecord: one committed fill in the portfolio's trade log.

use super::event::{FillEvent, Side};
use super::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub timestamp: Timestamp,
    pub symbol: String,
    pub side: Side,

    // ── Execution ──
    pub quantity: f64,
    pub price: f64,

    // ── Costs ──
    pub commission: f64,
    pub slippage: f64,

    // ── Ledger effect ──
    /// Signed change in cash: negative for buys, positive for sells.
    pub cash_delta: f64,
    pub cash_after: f64,
    /// PnL realised by this fill (zero for buys).
    pub realized_pnl: f64,
}

impl TradeRecord {
    pub fn from_fill(fill: &FillEvent, cash_delta: f64, cash_after: f64, realized_pnl: f64) -> Self {
        Self {
            timestamp: fill.timestamp,
            symbol: fill.symbol.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            commission: fill.commission,
            slippage: fill.slippage,
            cash_delta,
            cash_after,
            realized_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn from_fill_copies_execution_fields() {
        let fill = FillEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            symbol: "MSFT".into(),
            quantity: 3.0,
            side: Side::Sell,
            price: 10.0,
            commission: 0.2,
            slippage: 0.1,
        };
        let rec = TradeRecord::from_fill(&fill, 29.7, 129.7, 4.7);
        assert_eq!(rec.symbol, "MSFT");
        assert_eq!(rec.side, Side::Sell);
        assert_eq!((rec.commission, rec.slippage), (0.2, 0.1));
        assert_eq!(rec.cash_after, 129.7);
    }
}
