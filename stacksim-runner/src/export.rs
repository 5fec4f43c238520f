//! Reporting and export: JSON, CSV, JSON lines, and Markdown artifacts.
//!
//! A run directory holds:
//! - `report.json`: the full `SimulationReport`, schema-versioned
//! - `report.md`: human-readable summary
//! - `trades.csv`, `declined.csv`: committed and refused fills
//! - `portfolio.csv`, `positions.csv`, `fills.csv`: collector logs
//! - `events.jsonl`: one step snapshot per line (nested, so not CSV)
//!
//! Unknown schema versions are rejected on load.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use stacksim_core::domain::StepSnapshot;
use stacksim_core::DataCollector;

use crate::runner::{SimulationReport, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {max})")]
    UnsupportedSchema { found: u32, max: u32 },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &SimulationReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn import_json(json: &str) -> Result<SimulationReport, ExportError> {
    let report: SimulationReport = serde_json::from_str(json)?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: report.schema_version,
            max: SCHEMA_VERSION,
        });
    }
    Ok(report)
}

/// One JSON object per line.
pub fn export_events_jsonl<W: Write>(events: &[StepSnapshot], mut out: W) -> Result<(), ExportError> {
    for e in events {
        serde_json::to_writer(&mut out, e)?;
        out.write_all(b"\n").map_err(io_err(Path::new("<events>")))?;
    }
    Ok(())
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Rows as CSV with a header taken from the field names.
pub fn export_csv<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Io {
            path: "<csv buffer>".into(),
            source: e.into_error(),
        })?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(io_err(path))
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the report and every collector log into `dir`, creating it.
///
/// Returns the list of files written.
pub fn save_artifacts(
    report: &SimulationReport,
    logs: &DataCollector,
    dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut written = Vec::new();

    let mut put = |name: &str, contents: String| -> Result<(), ExportError> {
        let path = dir.join(name);
        write_file(&path, &contents)?;
        written.push(path);
        Ok(())
    };

    put("report.json", export_json(report)?)?;
    put("report.md", generate_report(report))?;
    put("trades.csv", export_csv(&report.trades)?)?;
    put("declined.csv", export_csv(&report.declined)?)?;
    put("portfolio.csv", export_csv(&logs.portfolio_log)?)?;
    put("positions.csv", export_csv(&logs.position_log)?)?;
    put("fills.csv", export_csv(&logs.fill_log)?)?;

    let events_path = dir.join("events.jsonl");
    let file = File::create(&events_path).map_err(io_err(&events_path))?;
    let mut out = BufWriter::new(file);
    export_events_jsonl(&logs.event_log, &mut out)?;
    out.flush().map_err(io_err(&events_path))?;
    written.push(events_path);

    tracing::info!(dir = %dir.display(), files = written.len(), "artifacts saved");
    Ok(written)
}

pub fn load_report(dir: &Path) -> Result<SimulationReport, ExportError> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path).map_err(io_err(&path))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

fn fmt_ts(ts: Option<stacksim_core::domain::Timestamp>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

pub fn generate_report(r: &SimulationReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Simulation Report\n\n");

    md.push_str("## Setup\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", r.strategy));
    md.push_str(&format!("| Sizer | {} |\n", r.sizer));
    md.push_str(&format!("| Calendar | {} |\n", r.calendar));
    md.push_str(&format!("| Symbols | {} |\n", r.symbols.join(", ")));
    md.push_str(&format!("| Period | {} to {} |\n", fmt_ts(r.start), fmt_ts(r.end)));
    md.push_str(&format!("| Bars | {} |\n", r.bar_count));
    md.push_str(&format!("| Config Hash | {} |\n", r.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", r.dataset_hash));
    md.push('\n');

    md.push_str("## Results\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Initial Cash | {:.2} |\n", r.initial_cash));
    md.push_str(&format!("| Final Cash | {:.2} |\n", r.final_cash));
    md.push_str(&format!("| Final Equity | {:.2} |\n", r.final_equity));
    md.push_str(&format!("| Total Return | {:.2}% |\n", r.total_return * 100.0));
    md.push_str(&format!("| Realized PnL | {:.2} |\n", r.realized_pnl));
    md.push_str(&format!("| Unrealized PnL | {:.2} |\n", r.unrealized_pnl));
    md.push_str(&format!("| Commission | {:.2} |\n", r.total_commission));
    md.push_str(&format!("| Slippage | {:.2} |\n", r.total_slippage));
    md.push_str(&format!("| Trades | {} |\n", r.trade_count));
    md.push_str(&format!("| Declined Fills | {} |\n", r.declined_count));
    if r.pending_orders > 0 {
        md.push_str(&format!("| Pending Orders | **{}** |\n", r.pending_orders));
    }
    md.push('\n');

    md.push_str("## Events\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("| --- | --- |\n");
    for (kind, count) in &r.summary.events {
        md.push_str(&format!("| {} | {} |\n", kind, count));
    }
    md.push_str(&format!(
        "\n{} units of work, largest batch {}, {:.3}s.\n\n",
        r.summary.units, r.summary.max_batch, r.summary.elapsed_secs
    ));

    if !r.positions.is_empty() {
        md.push_str("## Positions\n\n");
        md.push_str("| Symbol | Quantity | Avg Cost | Price | Unrealized |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for p in &r.positions {
            md.push_str(&format!(
                "| {} | {:.4} | {:.4} | {} | {} |\n",
                p.symbol,
                p.quantity,
                p.avg_cost,
                p.market_price.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".into()),
                p.unrealized_pnl.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
            ));
        }
        md.push('\n');
    }

    md.push_str(&format!("Fingerprint: `{}`\n", r.fingerprint));
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::runner::run_simulation;
    use crate::strategies::BuyAndHold;
    use crate::synthetic::{fixed_oscillating, Ohlc};

    fn sample() -> (SimulationReport, DataCollector) {
        let mut cfg = SimConfig::default();
        cfg.snapshots.step = true;
        let h = fixed_oscillating("SYN", Ohlc::flat(10.0), Ohlc::flat(12.0), 6, 10.0);
        let out = run_simulation(&cfg, &h, Box::new(BuyAndHold::new())).unwrap();
        (out.report, out.logs)
    }

    #[test]
    fn json_round_trip() {
        let (report, _) = sample();
        let back = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(back.fingerprint, report.fingerprint);
        assert_eq!(back.trades, report.trades);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let (mut report, _) = sample();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        assert!(matches!(
            import_json(&json),
            Err(ExportError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let (report, _) = sample();
        let csv = export_csv(&report.trades).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("timestamp,symbol,side,quantity,price"));
        assert_eq!(lines.count(), report.trades.len());
        assert!(csv.contains("BUY"));
    }

    #[test]
    fn events_jsonl_is_one_object_per_line() {
        let (_, logs) = sample();
        let mut buf = Vec::new();
        export_events_jsonl(&logs.event_log, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), logs.event_log.len());
        for line in text.lines() {
            let _: StepSnapshot = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn markdown_mentions_key_numbers() {
        let (report, _) = sample();
        let md = generate_report(&report);
        assert!(md.starts_with("# Simulation Report"));
        assert!(md.contains("| Strategy | buy_and_hold |"));
        assert!(md.contains(&report.fingerprint));
    }

    #[test]
    fn artifacts_saved_and_reloaded() {
        let (report, logs) = sample();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let files = save_artifacts(&report, &logs, &out).unwrap();
        assert_eq!(files.len(), 8);
        assert!(files.iter().all(|f| f.exists()));
        let back = load_report(&out).unwrap();
        assert_eq!(back.fingerprint, report.fingerprint);
    }
}
