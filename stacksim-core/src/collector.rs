//! Snapshot sinks.
//!
//! Collectors receive copies of state as the run progresses. They have no way
//! to feed anything back into the core.

use crate::domain::{FillSnapshot, PortfolioSnapshot, PositionSnapshot, StepSnapshot};
use serde::{Deserialize, Serialize};

pub trait SnapshotCollector {
    fn portfolio_snapshot(&mut self, snapshot: PortfolioSnapshot);
    fn position_snapshot(&mut self, snapshot: PositionSnapshot);
    fn fill_snapshot(&mut self, snapshot: FillSnapshot);
    fn event_snapshot(&mut self, snapshot: StepSnapshot);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCollector;

impl SnapshotCollector for NullCollector {
    fn portfolio_snapshot(&mut self, _snapshot: PortfolioSnapshot) {}
    fn position_snapshot(&mut self, _snapshot: PositionSnapshot) {}
    fn fill_snapshot(&mut self, _snapshot: FillSnapshot) {}
    fn event_snapshot(&mut self, _snapshot: StepSnapshot) {}
}

/// Keeps every snapshot in memory, one log per kind.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DataCollector {
    pub portfolio_log: Vec<PortfolioSnapshot>,
    pub position_log: Vec<PositionSnapshot>,
    pub fill_log: Vec<FillSnapshot>,
    pub event_log: Vec<StepSnapshot>,
}

impl DataCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotCollector for DataCollector {
    fn portfolio_snapshot(&mut self, snapshot: PortfolioSnapshot) {
        self.portfolio_log.push(snapshot);
    }

    fn position_snapshot(&mut self, snapshot: PositionSnapshot) {
        self.position_log.push(snapshot);
    }

    fn fill_snapshot(&mut self, snapshot: FillSnapshot) {
        self.fill_log.push(snapshot);
    }

    fn event_snapshot(&mut self, snapshot: StepSnapshot) {
        self.event_log.push(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use chrono::{TimeZone, Utc};

    #[test]
    fn data_collector_keeps_each_kind_in_its_own_log() {
        let mut c = DataCollector::new();
        c.fill_snapshot(FillSnapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            symbol: "AAPL".into(),
            side: Side::Buy,
            quantity: 1.0,
            price: 10.0,
            commission: 0.0,
            slippage: 0.0,
            cash_after: 90.0,
        });
        assert_eq!(c.fill_log.len(), 1);
        assert!(c.portfolio_log.is_empty());
        assert!(c.position_log.is_empty());
        assert!(c.event_log.is_empty());
    }
}
