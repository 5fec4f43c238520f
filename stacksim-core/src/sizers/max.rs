//! Max sizer: all free cash in, whole holding out.

use super::{AccountSnapshot, Sizer};
use crate::domain::{Position, Side, SignalEvent};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxSizer;

impl Sizer for MaxSizer {
    fn size(
        &self,
        account: &AccountSnapshot,
        positions: &BTreeMap<String, Position>,
        signal: &SignalEvent,
        price: Option<f64>,
    ) -> Option<f64> {
        match signal.side {
            Side::Buy => {
                let price = price.filter(|p| p.is_finite() && *p > 0.0)?;
                let quantity = account.free_cash() / price;
                (quantity.is_finite() && quantity > 0.0).then_some(quantity)
            }
            // No partial exits.
            Side::Sell => positions
                .get(&signal.symbol)
                .map(|p| p.quantity)
                .filter(|q| *q > 0.0),
        }
    }

    fn name(&self) -> &str {
        "max"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn signal(side: Side) -> SignalEvent {
        SignalEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            symbol: "SPY".into(),
            side,
        }
    }

    fn held(quantity: f64) -> BTreeMap<String, Position> {
        let mut pos = Position::new("SPY");
        pos.quantity = quantity;
        pos.avg_cost = 10.0;
        BTreeMap::from([("SPY".to_string(), pos)])
    }

    #[test]
    fn buy_stakes_cash_above_reserve() {
        let acct = AccountSnapshot { cash: 10_000.0, cash_reserve: 1_000.0 };
        let q = MaxSizer.size(&acct, &held(0.0), &signal(Side::Buy), Some(90.0));
        assert_eq!(q, Some(100.0));
    }

    #[test]
    fn buy_without_usable_price_is_rejected() {
        let acct = AccountSnapshot { cash: 10_000.0, cash_reserve: 0.0 };
        let positions = held(0.0);
        assert_eq!(MaxSizer.size(&acct, &positions, &signal(Side::Buy), None), None);
        assert_eq!(MaxSizer.size(&acct, &positions, &signal(Side::Buy), Some(0.0)), None);
        assert_eq!(MaxSizer.size(&acct, &positions, &signal(Side::Buy), Some(-5.0)), None);
    }

    #[test]
    fn buy_with_no_free_cash_is_rejected() {
        let acct = AccountSnapshot { cash: 100.0, cash_reserve: 100.0 };
        assert_eq!(MaxSizer.size(&acct, &held(0.0), &signal(Side::Buy), Some(1.0)), None);
    }

    #[test]
    fn reserve_above_cash_sizes_nothing() {
        let acct = AccountSnapshot { cash: 100.0, cash_reserve: 150.0 };
        assert_eq!(MaxSizer.size(&acct, &held(0.0), &signal(Side::Buy), Some(1.0)), None);
    }

    #[test]
    fn sell_closes_whole_holding() {
        let acct = AccountSnapshot { cash: 0.0, cash_reserve: 0.0 };
        assert_eq!(MaxSizer.size(&acct, &held(42.0), &signal(Side::Sell), None), Some(42.0));
        assert_eq!(MaxSizer.size(&acct, &held(0.0), &signal(Side::Sell), None), None);
        assert_eq!(
            MaxSizer.size(&acct, &BTreeMap::new(), &signal(Side::Sell), None),
            None
        );
    }
}
