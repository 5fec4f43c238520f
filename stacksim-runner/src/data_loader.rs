//! OHLCV price history: CSV loading, writing, and timestamp lookup.
//!
//! CSV layout is `Date,Symbol,Open,High,Low,Close,Volume`. Extra columns
//! (dividends, splits) are ignored. `Volume` may be missing or empty. `Date`
//! is `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (both UTC) or RFC 3339.
//!
//! Rows are validated on load; the first bad row fails the whole file with
//! its line number.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use stacksim_core::domain::{MarketEvent, Timestamp};
use stacksim_core::engine::PriceSource;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("no rows in price data")]
    Empty,
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    fn validate(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        if let Some((name, v)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} is not finite ({v})"));
        }
        if self.open <= 0.0 || self.close <= 0.0 {
            return Err(format!(
                "open and close must be > 0 (open {}, close {})",
                self.open, self.close
            ));
        }
        if self.high < self.low {
            return Err(format!("high {} below low {}", self.high, self.low));
        }
        if self.volume < 0.0 {
            return Err(format!("negative volume {}", self.volume));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume", default)]
    volume: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CsvOut<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Symbol")]
    symbol: &'a str,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Parse a date or timestamp cell as UTC.
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    if let Ok(n) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(n.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Per-symbol bars ordered by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    bars: BTreeMap<String, BTreeMap<Timestamp, Bar>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bar. A bar already stored at the same timestamp is replaced
    /// and returned.
    pub fn insert(&mut self, symbol: &str, bar: Bar) -> Option<Bar> {
        let replaced = self
            .bars
            .entry(symbol.to_string())
            .or_default()
            .insert(bar.timestamp, bar);
        if replaced.is_some() {
            tracing::warn!(symbol, at = %bar.timestamp, "duplicate bar replaced");
        }
        replaced
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.bars.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.bars.contains_key(symbol)
    }

    /// Total number of bars across symbols.
    pub fn len(&self) -> usize {
        self.bars.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bars(&self, symbol: &str) -> Option<&BTreeMap<Timestamp, Bar>> {
        self.bars.get(symbol)
    }

    pub fn first_timestamp(&self, symbol: &str) -> Option<Timestamp> {
        self.bars.get(symbol)?.keys().next().copied()
    }

    pub fn last_timestamp(&self, symbol: &str) -> Option<Timestamp> {
        self.bars.get(symbol)?.keys().next_back().copied()
    }

    /// Latest bar at or before `at`.
    pub fn bar_at(&self, symbol: &str, at: Timestamp) -> Option<&Bar> {
        self.bars
            .get(symbol)?
            .range(..=at)
            .next_back()
            .map(|(_, bar)| bar)
    }

    /// Every bar as a market event, in (symbol, time) order.
    pub fn market_events(&self) -> Vec<MarketEvent> {
        self.bars
            .iter()
            .flat_map(|(symbol, bars)| {
                bars.values().map(move |b| MarketEvent {
                    timestamp: b.timestamp,
                    symbol: symbol.clone(),
                    open: b.open,
                    high: b.high,
                    low: b.low,
                    close: b.close,
                    volume: b.volume,
                })
            })
            .collect()
    }

    /// Keep only the listed symbols.
    pub fn retain_symbols(&mut self, symbols: &[String]) {
        self.bars.retain(|s, _| symbols.iter().any(|k| k == s));
    }
}

impl PriceSource for PriceHistory {
    /// Close of the latest bar at or before `at`.
    fn price(&self, symbol: &str, at: Timestamp) -> Option<f64> {
        self.bar_at(symbol, at).map(|b| b.close)
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

pub fn load_csv(path: &Path) -> Result<PriceHistory, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let history = read_csv(file)?;
    tracing::info!(
        path = %path.display(),
        symbols = history.symbols().len(),
        bars = history.len(),
        "price history loaded"
    );
    Ok(history)
}

pub fn read_csv<R: Read>(reader: R) -> Result<PriceHistory, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut history = PriceHistory::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| LoadError::InvalidRow {
                line,
                reason: e.to_string(),
            })?;

        let timestamp = parse_timestamp(&row.date).ok_or_else(|| LoadError::InvalidRow {
            line,
            reason: format!("unparseable date '{}'", row.date),
        })?;
        if row.symbol.is_empty() {
            return Err(LoadError::InvalidRow {
                line,
                reason: "empty symbol".into(),
            });
        }
        let bar = Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or(0.0),
        };
        bar.validate()
            .map_err(|reason| LoadError::InvalidRow { line, reason })?;
        history.insert(&row.symbol, bar);
    }

    if history.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(history)
}

/// Write history as CSV in time order, symbols sorted within a timestamp.
pub fn write_csv<W: Write>(history: &PriceHistory, writer: W) -> Result<(), LoadError> {
    let mut rows: Vec<(&Timestamp, &str, &Bar)> = history
        .bars
        .iter()
        .flat_map(|(symbol, bars)| bars.iter().map(move |(ts, bar)| (ts, symbol.as_str(), bar)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

    let mut wtr = csv::Writer::from_writer(writer);
    for (ts, symbol, bar) in rows {
        wtr.serialize(CsvOut {
            date: format_timestamp(*ts),
            symbol,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: "<writer>".into(),
        source,
    })?;
    Ok(())
}

pub fn save_csv(history: &PriceHistory, path: &Path) -> Result<(), LoadError> {
    let file = std::fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv(history, file)
}

/// Midnight timestamps are written as plain dates.
fn format_timestamp(ts: Timestamp) -> String {
    let naive = ts.naive_utc();
    if naive.time() == chrono::NaiveTime::MIN {
        naive.date().format("%Y-%m-%d").to_string()
    } else {
        ts.to_rfc3339()
    }
}
