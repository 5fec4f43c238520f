//! Market calendars for the broker.

use chrono::{Datelike, Timelike, Weekday};
use stacksim_core::domain::Timestamp;
use stacksim_core::engine::MarketCalendar;

/// Closed on Saturdays and Sundays (UTC), open otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

fn is_weekend(at: Timestamp) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

impl MarketCalendar for WeekdayCalendar {
    fn is_open(&self, at: Timestamp, _symbol: &str) -> bool {
        !is_weekend(at)
    }

    fn name(&self) -> &str {
        "weekdays"
    }
}

/// Weekdays only, open in `[open_hour, close_hour)` UTC.
#[derive(Debug, Clone, Copy)]
pub struct SessionCalendar {
    open_hour: u32,
    close_hour: u32,
}

impl SessionCalendar {
    pub fn new(open_hour: u32, close_hour: u32) -> Self {
        Self {
            open_hour,
            close_hour,
        }
    }
}

impl MarketCalendar for SessionCalendar {
    fn is_open(&self, at: Timestamp, _symbol: &str) -> bool {
        if is_weekend(at) {
            return false;
        }
        let hour = at.hour();
        hour >= self.open_hour && hour < self.close_hour
    }

    fn name(&self) -> &str {
        "session"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn weekday_calendar_closes_weekends() {
        let cal = WeekdayCalendar;
        // 2024-01-05 is a Friday.
        assert!(cal.is_open(Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(), "X"));
        assert!(!cal.is_open(Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap(), "X"));
        assert!(!cal.is_open(Utc.with_ymd_and_hms(2024, 1, 7, 12, 0, 0).unwrap(), "X"));
        assert!(cal.is_open(Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(), "X"));
    }

    #[test]
    fn session_calendar_respects_hours() {
        let cal = SessionCalendar::new(9, 17);
        let monday = |h| Utc.with_ymd_and_hms(2024, 1, 8, h, 0, 0).unwrap();
        assert!(!cal.is_open(monday(8), "X"));
        assert!(cal.is_open(monday(9), "X"));
        assert!(cal.is_open(monday(16), "X"));
        assert!(!cal.is_open(monday(17), "X"));
        assert!(!cal.is_open(Utc.with_ymd_and_hms(2024, 1, 6, 10, 0, 0).unwrap(), "X"));
    }
}
