//! Cash reserve policy, applied by the portfolio before every sizing call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservePolicy {
    /// Reserve a fraction of current cash, recomputed at each signal.
    FractionOfCash { fraction: f64 },
    /// Reserve a constant amount.
    Fixed { amount: f64 },
}

impl Default for ReservePolicy {
    fn default() -> Self {
        ReservePolicy::FractionOfCash { fraction: 0.1 }
    }
}

impl ReservePolicy {
    /// Reserve for the given cash balance. Negative cash reserves nothing.
    pub fn reserve(&self, cash: f64) -> f64 {
        match *self {
            ReservePolicy::FractionOfCash { fraction } => (cash * fraction).max(0.0),
            ReservePolicy::Fixed { amount } => amount,
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            ReservePolicy::FractionOfCash { fraction } => (0.0..=1.0).contains(&fraction),
            ReservePolicy::Fixed { amount } => amount.is_finite() && amount >= 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ten_percent_of_cash() {
        let p = ReservePolicy::default();
        assert!((p.reserve(10_000.0) - 1_000.0).abs() < 1e-9);
        assert_eq!(p.reserve(-50.0), 0.0);
    }

    #[test]
    fn fixed_ignores_cash() {
        let p = ReservePolicy::Fixed { amount: 1_000.0 };
        assert_eq!(p.reserve(5.0), 1_000.0);
        assert_eq!(p.reserve(1e9), 1_000.0);
    }

    #[test]
    fn validity() {
        assert!(ReservePolicy::FractionOfCash { fraction: 0.0 }.is_valid());
        assert!(!ReservePolicy::FractionOfCash { fraction: 1.5 }.is_valid());
        assert!(!ReservePolicy::FractionOfCash { fraction: f64::NAN }.is_valid());
        assert!(!ReservePolicy::Fixed { amount: -1.0 }.is_valid());
    }
}
