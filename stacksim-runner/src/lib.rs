//! stacksim runner: everything around the core that a simulation needs.
//!
//! This crate builds on `stacksim-core` to provide:
//! - TOML run configuration
//! - CSV price history with a price-by-timestamp lookup
//! - Weekday and session market calendars
//! - Synthetic price patterns
//! - Reference strategies
//! - Run orchestration, fingerprinting, and artifact export

pub mod calendar;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod strategies;
pub mod synthetic;

pub use calendar::{SessionCalendar, WeekdayCalendar};
pub use config::{CalendarConfig, ConfigError, PriceLookup, SimConfig, SnapshotConfig};
pub use data_loader::{load_csv, read_csv, save_csv, write_csv, Bar, LoadError, PriceHistory};
pub use export::{save_artifacts, ExportError};
pub use runner::{run_simulation, RunError, SimulationOutput, SimulationReport};
pub use strategies::{BuyAndHold, FixedPriceStrategy};
pub use synthetic::{fixed_oscillating, random_walk, Ohlc, RandomWalk};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<SimulationReport>();
        assert_sync::<SimulationReport>();
    }

    #[test]
    fn config_and_history_are_send_sync() {
        assert_send::<SimConfig>();
        assert_sync::<SimConfig>();
        assert_send::<PriceHistory>();
        assert_sync::<PriceHistory>();
    }
}
