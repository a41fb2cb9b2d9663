//! Expiry command implementation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use orb_backtest::expiry::{days_to_expiry, select_expiry, ExpiryPolicy};
use tracing::info;

pub fn run(date: String, policy: String) -> Result<()> {
    let trade_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
    let policy: ExpiryPolicy = policy.parse()?;

    let expiry = select_expiry(trade_date, policy);
    let dte = days_to_expiry(trade_date, policy);
    info!("{} expiry for {}: {} ({} days)", policy, trade_date, expiry, dte);

    println!("Trade date:     {} ({})", trade_date, trade_date.format("%A"));
    println!("Expiry policy:  {}", policy);
    println!("Expiry date:    {} ({})", expiry, expiry.format("%A"));
    println!("Days to expiry: {}", dte);

    Ok(())
}
