//! Market calendar seam. The broker asks it whether a symbol's venue is open.

use crate::domain::Timestamp;

pub trait MarketCalendar: Send + Sync {
    fn is_open(&self, at: Timestamp, symbol: &str) -> bool;

    fn name(&self) -> &str;
}

/// Every venue, every instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl MarketCalendar for AlwaysOpen {
    fn is_open(&self, _at: Timestamp, _symbol: &str) -> bool {
        true
    }

    fn name(&self) -> &str {
        "always_open"
    }
}
