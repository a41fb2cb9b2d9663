//! Validate command implementation

use anyhow::Result;
use orb_backtest::config::SessionConfig;
use orb_backtest::{data, TradingDay};
use tracing::{info, warn};

pub fn run(data_path: String) -> Result<()> {
    info!("Validating {}", data_path);

    let bars = data::load_csv(&data_path)?;
    let result = data::validate_bars(&bars);
    let bar_count = bars.len();

    for error in &result.errors {
        warn!("{}", error);
    }
    for warning in &result.warnings {
        warn!("{}", warning);
    }

    // Same bars the backtest would see
    let (valid, dropped) = data::drop_invalid_bars(bars);
    let session = SessionConfig::default();
    let days = data::group_by_day(data::filter_session(
        data::prepare_bars(valid),
        session.market_open,
        session.market_close,
    ));
    let short_days = days.iter().filter(|d| !d.is_tradeable()).count();

    println!("{}", "=".repeat(60));
    println!("DATA VALIDATION");
    println!("{}", "=".repeat(60));
    println!("File:               {}", data_path);
    println!("Bars:               {}", bar_count);
    println!("Invalid (dropped):  {}", dropped);
    println!("Trading days:       {}", days.len());
    println!(
        "Days < {} bars:      {}",
        TradingDay::MIN_BARS,
        short_days
    );
    if let (Some(first), Some(last)) = (days.first(), days.last()) {
        println!("Range:              {} to {}", first.date, last.date);
    }
    println!("Errors:             {}", result.errors.len());
    println!("Warnings:           {}", result.warnings.len());
    println!("{}", "=".repeat(60));

    if !result.is_valid() {
        anyhow::bail!("{} validation errors in {}", result.errors.len(), data_path);
    }

    info!("Validation passed");
    Ok(())
}
