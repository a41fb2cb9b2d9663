//! Data loading and management
//!
//! Loads intraday spot bars from CSV, restricts them to the exchange session
//! and groups them into trading days. Fetching from a broker API is out of
//! scope; any exporter that writes `datetime,open,high,low,close,volume`
//! works.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use std::path::Path;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::{PriceBar, TradingDay};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Parse a bar timestamp, keeping exchange-local wall time when an offset is present
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .with_context(|| format!("Failed to parse datetime: {}", s))
}

/// Load OHLCV bars from a CSV file with a header row
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<PriceBar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut bars = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Row {}: missing {} column", row_idx + 1, name))?
                .trim()
                .parse()
                .with_context(|| format!("Row {}: failed to parse {}", row_idx + 1, name))
        };

        let dt_str = record
            .get(0)
            .with_context(|| format!("Row {}: missing datetime column", row_idx + 1))?;

        bars.push(PriceBar {
            datetime: parse_datetime(dt_str)?,
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: match record.get(5).map(str::trim) {
                Some(v) if !v.is_empty() => v
                    .parse()
                    .with_context(|| format!("Row {}: failed to parse volume", row_idx + 1))?,
                _ => 0.0,
            },
        });
    }

    Ok(bars)
}

/// Drop bars failing `PriceBar::validate`; returns the kept bars and the drop count
pub fn drop_invalid_bars(bars: Vec<PriceBar>) -> (Vec<PriceBar>, usize) {
    let total = bars.len();
    let kept: Vec<PriceBar> = bars.into_iter().filter(PriceBar::is_valid).collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Sort chronologically and drop repeated timestamps, keeping the first
pub fn prepare_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.datetime);
    bars.dedup_by_key(|b| b.datetime);
    bars
}

/// Keep bars whose time of day falls inside `[open, close]`
pub fn filter_session(bars: Vec<PriceBar>, open: NaiveTime, close: NaiveTime) -> Vec<PriceBar> {
    bars.into_iter()
        .filter(|b| {
            let t = b.datetime.time();
            t >= open && t <= close
        })
        .collect()
}

/// Group sorted bars into one `TradingDay` per calendar date
pub fn group_by_day(bars: Vec<PriceBar>) -> Vec<TradingDay> {
    bars.into_iter()
        .chunk_by(|b| b.trade_date())
        .into_iter()
        .map(|(date, group)| TradingDay::new(date, group.collect()))
        .collect()
}

/// Load a bar file and turn it into session-filtered trading days
pub fn load_trading_days(path: impl AsRef<Path>, session: &SessionConfig) -> Result<Vec<TradingDay>> {
    let path = path.as_ref();
    let raw = load_csv(path)?;
    let raw_count = raw.len();

    let validation = validate_bars(&raw);
    for warning in validation.warnings.iter().take(5) {
        warn!("{}", warning);
    }
    for error in validation.errors.iter().take(5) {
        warn!("{}", error);
    }

    let (valid, dropped) = drop_invalid_bars(raw);
    if dropped > 0 {
        warn!("Dropped {} invalid bars from {}", dropped, path.display());
    }

    let bars = filter_session(prepare_bars(valid), session.market_open, session.market_close);
    let days = group_by_day(bars);

    if days.is_empty() {
        anyhow::bail!("No session bars found in {}", path.display());
    }

    info!(
        "Loaded {} bars ({} in session) over {} trading days from {}",
        raw_count,
        days.iter().map(TradingDay::len).sum::<usize>(),
        days.len(),
        path.display()
    );

    Ok(days)
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate bar data for consistency
pub fn validate_bars(bars: &[PriceBar]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if bars.is_empty() {
        errors.push("No bars provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, bar) in bars.iter().enumerate() {
        if let Err(e) = bar.validate() {
            errors.push(format!("Bar {} ({}): {}", i, bar.datetime, e));
        }
        if i > 0 && bar.datetime <= bars[i - 1].datetime {
            warnings.push(format!("Bar {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn bar(day: u32, h: u32, m: u32, close: f64) -> PriceBar {
        let dt = NaiveDate::from_ymd_opt(2024, 10, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        PriceBar::new_unchecked(dt, close, close + 1.0, close - 1.0, close, 100.0)
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 10, 17)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-10-17 09:15:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-10-17T09:15:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-10-17T09:15:00+05:30").unwrap(), expected);
        assert_eq!(parse_datetime("2024-10-17 09:15:00+05:30").unwrap(), expected);
        assert!(parse_datetime("17/10/2024").is_err());
    }

    #[test]
    fn test_prepare_sorts_and_dedups() {
        let bars = vec![bar(17, 9, 20, 2.0), bar(17, 9, 15, 1.0), bar(17, 9, 20, 3.0)];
        let prepared = prepare_bars(bars);
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].close, 1.0);
        assert_eq!(prepared[1].close, 2.0);
    }

    #[test]
    fn test_filter_session_is_inclusive() {
        let bars = vec![
            bar(17, 9, 10, 1.0),
            bar(17, 9, 15, 2.0),
            bar(17, 15, 30, 3.0),
            bar(17, 15, 35, 4.0),
        ];
        let kept = filter_session(bars, time(9, 15), time(15, 30));
        let closes: Vec<f64> = kept.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0]);
    }

    #[test]
    fn test_group_by_day() {
        let bars = vec![
            bar(17, 9, 15, 1.0),
            bar(17, 9, 20, 2.0),
            bar(18, 9, 15, 3.0),
        ];
        let days = group_by_day(bars);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].len(), 2);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 10, 18).unwrap());
    }

    #[test]
    fn test_validate_bars() {
        let mut bars = vec![bar(17, 9, 15, 100.0), bar(17, 9, 20, 101.0)];
        assert!(validate_bars(&bars).is_valid());

        bars.push(bar(17, 9, 20, 102.0));
        bars[0].high = 50.0;
        let result = validate_bars(&bars);
        assert!(!result.is_valid());
        assert_eq!(result.warnings.len(), 1);

        assert!(!validate_bars(&[]).is_valid());
    }

    #[test]
    fn test_load_trading_days_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-10-17 09:10:00,100,101,99,100,0").unwrap();
        writeln!(file, "2024-10-17 09:15:00,100,101,99,100,0").unwrap();
        writeln!(file, "2024-10-17 09:20:00,100,102,98,101,0").unwrap();
        writeln!(file, "2024-10-17 09:20:00,100,102,98,101,0").unwrap();
        writeln!(file, "2024-10-18 09:15:00,101,103,100,102,0").unwrap();

        let days = load_trading_days(file.path(), &SessionConfig::default()).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].len(), 2);
        assert_eq!(days[1].bars[0].high, 103.0);
    }

    #[test]
    fn test_load_csv_reports_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-10-17 09:15:00,100,abc,99,100,0").unwrap();

        let err = load_csv(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("high"));
    }

    #[test]
    fn test_malformed_volume_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-10-17 09:15:00,100,101,99,100,1e").unwrap();

        let err = load_csv(file.path()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Row 1"));
        assert!(message.contains("volume"));
    }

    #[test]
    fn test_missing_volume_defaults_to_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close").unwrap();
        writeln!(file, "2024-10-17 09:15:00,100,101,99,100").unwrap();

        let bars = load_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn test_invalid_bars_are_dropped_before_grouping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-10-17 09:15:00,100,101,99,100,0").unwrap();
        writeln!(file, "2024-10-17 09:20:00,100,101,99,5e15,0").unwrap();
        writeln!(file, "2024-10-17 09:25:00,100,101,99,NaN,0").unwrap();
        writeln!(file, "2024-10-17 09:30:00,100,102,98,101,0").unwrap();

        let raw = load_csv(file.path()).unwrap();
        assert_eq!(raw.len(), 4);
        let result = validate_bars(&raw);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("Bar 1"));

        let days = load_trading_days(file.path(), &SessionConfig::default()).unwrap();
        assert_eq!(days.len(), 1);
        let closes: Vec<f64> = days[0].bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![100.0, 101.0]);
    }

    #[test]
    fn test_drop_invalid_bars_counts() {
        let mut bad = bar(17, 9, 20, 100.0);
        bad.high = f64::INFINITY;
        let (kept, dropped) = drop_invalid_bars(vec![bar(17, 9, 15, 100.0), bad]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
    }
}
