//! Result export
//!
//! Writes day records and trades as CSV and the per-policy comparison as
//! JSON, so results can be inspected outside the terminal.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backtest::BacktestReport;
use crate::metrics::{OptionTrade, StrategyComparisonResult};
use crate::options::StrikePolicy;
use crate::DayRecord;

pub const DAY_RECORDS_FILE: &str = "day_records.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// `trades_{policy}.csv`
pub fn trades_file_name(policy: StrikePolicy) -> String {
    format!("trades_{}.csv", policy.as_str().to_lowercase())
}

pub fn write_day_records(path: impl AsRef<Path>, records: &[DayRecord]) -> Result<()> {
    write_rows(path.as_ref(), records)
}

pub fn write_trades(path: impl AsRef<Path>, trades: &[OptionTrade]) -> Result<()> {
    write_rows(path.as_ref(), trades)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    evaluated_days: usize,
    skipped_days: usize,
    breakout_days: usize,
    ce_days: usize,
    pe_days: usize,
    no_breakout_days: usize,
    best_policy: Option<StrikePolicy>,
    policies: Vec<&'a StrategyComparisonResult>,
}

pub fn write_summary(path: impl AsRef<Path>, report: &BacktestReport) -> Result<()> {
    let path = path.as_ref();
    let summary = RunSummary {
        evaluated_days: report.day_records.len(),
        skipped_days: report.skipped_days.len(),
        breakout_days: report.breakout_days(),
        ce_days: report.ce_days(),
        pe_days: report.pe_days(),
        no_breakout_days: report.no_breakout_days(),
        best_policy: report.best_policy().map(|p| p.policy),
        policies: report.policies.iter().map(|p| &p.summary).collect(),
    };
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write every result file of a run into `dir`, returning the paths written
pub fn export_report(dir: impl AsRef<Path>, report: &BacktestReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(report.policies.len() + 2);

    let path = dir.join(DAY_RECORDS_FILE);
    write_day_records(&path, &report.day_records)?;
    written.push(path);

    for policy in &report.policies {
        let path = dir.join(trades_file_name(policy.policy));
        write_trades(&path, &policy.trades)?;
        written.push(path);
    }

    let path = dir.join(SUMMARY_FILE);
    write_summary(&path, report)?;
    written.push(path);

    info!("Exported {} result files to {}", written.len(), dir.display());
    Ok(written)
}
