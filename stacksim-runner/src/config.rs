//! Serializable simulation configuration, loaded from TOML.
//!
//! Every section has a default, so an empty file is a valid configuration:
//! 100 000 cash, 0.1% commission, 0.05% slippage, MAX sizing, a reserve of
//! 10% of cash, and an always-open market.

use serde::{Deserialize, Serialize};
use stacksim_core::engine::{AlwaysOpen, BrokerConfig, MarketCalendar};
use stacksim_core::sizers::{ReservePolicy, SizingModel};
use std::path::Path;
use thiserror::Error;

use crate::calendar::{SessionCalendar, WeekdayCalendar};

/// Errors from configuration parsing or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub initial_cash: f64,
    /// Symbols to open positions for. Empty means every symbol in the data.
    pub symbols: Vec<String>,
    pub snapshots: SnapshotConfig,
    pub broker: BrokerSection,
    pub sizing: SizingModel,
    pub reserve: ReservePolicy,
    pub calendar: CalendarConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            symbols: Vec::new(),
            snapshots: SnapshotConfig::default(),
            broker: BrokerSection::default(),
            sizing: SizingModel::default(),
            reserve: ReservePolicy::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

/// Which snapshots the run records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Portfolio, position and fill snapshots from the portfolio.
    pub portfolio: bool,
    /// One merged event + portfolio snapshot per broadcast event.
    pub step: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            portfolio: true,
            step: false,
        }
    }
}

/// Broker costs and price lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrokerSection {
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub price_lookup: PriceLookup,
}

impl Default for BrokerSection {
    fn default() -> Self {
        let costs = BrokerConfig::default();
        Self {
            commission_pct: costs.commission_pct,
            slippage_pct: costs.slippage_pct,
            price_lookup: PriceLookup::default(),
        }
    }
}

impl BrokerSection {
    pub fn costs(&self) -> BrokerConfig {
        BrokerConfig {
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }
}

/// Where fills and sizing get their quote.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceLookup {
    /// Latest close seen by the market context.
    #[default]
    Latest,
    /// Close of the latest bar at or before the fill time, from the loaded history.
    AtTimestamp,
}

/// Market calendar selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarConfig {
    #[default]
    AlwaysOpen,
    /// Closed on Saturdays and Sundays.
    Weekdays,
    /// Weekdays, open in `[open_hour, close_hour)` UTC.
    Session { open_hour: u32, close_hour: u32 },
}

impl CalendarConfig {
    pub fn build(&self) -> Box<dyn MarketCalendar> {
        match *self {
            CalendarConfig::AlwaysOpen => Box::new(AlwaysOpen),
            CalendarConfig::Weekdays => Box::new(WeekdayCalendar),
            CalendarConfig::Session {
                open_hour,
                close_hour,
            } => Box::new(SessionCalendar::new(open_hour, close_hour)),
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_cash must be finite and >= 0, got {}",
                self.initial_cash
            )));
        }
        for (name, value) in [
            ("broker.commission_pct", self.broker.commission_pct),
            ("broker.slippage_pct", self.broker.slippage_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        self.sizing
            .build()
            .map_err(|e| ConfigError::Invalid(format!("sizing: {e}")))?;
        if !self.reserve.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "reserve policy out of range: {:?}",
                self.reserve
            )));
        }
        if let CalendarConfig::Session {
            open_hour,
            close_hour,
        } = self.calendar
        {
            if open_hour >= close_hour || close_hour > 24 {
                return Err(ConfigError::Invalid(format!(
                    "session hours must satisfy open < close <= 24, got {open_hour}..{close_hour}"
                )));
            }
        }
        if let Some(dup) = first_duplicate(&self.symbols) {
            return Err(ConfigError::Invalid(format!("symbol '{dup}' listed twice")));
        }
        Ok(())
    }

    /// Deterministic hash of the configuration, for run fingerprints.
    pub fn config_hash(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .find(|s| !seen.insert(s.as_str()))
        .map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = SimConfig::from_toml("").unwrap();
        assert_eq!(cfg, SimConfig::default());
        assert_eq!(cfg.broker.commission_pct, 0.001);
        assert_eq!(cfg.broker.slippage_pct, 0.0005);
        assert_eq!(cfg.sizing, SizingModel::Max);
        assert_eq!(cfg.reserve, ReservePolicy::FractionOfCash { fraction: 0.1 });
        assert_eq!(cfg.calendar, CalendarConfig::AlwaysOpen);
    }

    #[test]
    fn full_document_parses() {
        let cfg = SimConfig::from_toml(
            r#"
initial_cash = 10000.0
symbols = ["SYN"]

[snapshots]
portfolio = false
step = true

[broker]
commission_pct = 0.005
slippage_pct = 0.005
price_lookup = "AT_TIMESTAMP"

[sizing]
type = "FIXED"
quantity = 10.0

[reserve]
type = "FIXED"
amount = 1000.0

[calendar]
type = "SESSION"
open_hour = 9
close_hour = 17
"#,
        )
        .unwrap();

        assert_eq!(cfg.initial_cash, 10_000.0);
        assert_eq!(cfg.symbols, vec!["SYN".to_string()]);
        assert!(cfg.snapshots.step);
        assert!(!cfg.snapshots.portfolio);
        assert_eq!(cfg.broker.price_lookup, PriceLookup::AtTimestamp);
        assert_eq!(cfg.sizing, SizingModel::Fixed { quantity: 10.0 });
        assert_eq!(cfg.reserve, ReservePolicy::Fixed { amount: 1_000.0 });
        assert_eq!(
            cfg.calendar,
            CalendarConfig::Session {
                open_hour: 9,
                close_hour: 17
            }
        );
        assert_eq!(cfg.calendar.build().name(), "session");
    }

    #[test]
    fn rejects_negative_cash() {
        let err = SimConfig::from_toml("initial_cash = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_fee() {
        let err = SimConfig::from_toml("[broker]\ncommission_pct = -0.1").unwrap_err();
        assert!(err.to_string().contains("commission_pct"));
    }

    #[test]
    fn rejects_zero_fixed_quantity() {
        let err = SimConfig::from_toml("[sizing]\ntype = \"FIXED\"\nquantity = 0.0").unwrap_err();
        assert!(err.to_string().contains("sizing"));
    }

    #[test]
    fn rejects_reserve_fraction_above_one() {
        let err = SimConfig::from_toml("[reserve]\ntype = \"FRACTION_OF_CASH\"\nfraction = 1.5")
            .unwrap_err();
        assert!(err.to_string().contains("reserve"));
    }

    #[test]
    fn rejects_inverted_session() {
        let err = SimConfig::from_toml(
            "[calendar]\ntype = \"SESSION\"\nopen_hour = 17\nclose_hour = 9",
        )
        .unwrap_err();
        assert!(err.to_string().contains("session"));
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let err = SimConfig::from_toml(r#"symbols = ["A", "B", "A"]"#).unwrap_err();
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn unknown_sizing_type_is_a_parse_error() {
        let err = SimConfig::from_toml("[sizing]\ntype = \"KELLY\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_round_trip_preserves_config() {
        let mut cfg = SimConfig::default();
        cfg.sizing = SizingModel::Fixed { quantity: 3.0 };
        cfg.calendar = CalendarConfig::Weekdays;
        let text = cfg.to_toml().unwrap();
        assert_eq!(SimConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn config_hash_is_deterministic_and_sensitive() {
        let a = SimConfig::default();
        let mut b = SimConfig::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.initial_cash = 1.0;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
