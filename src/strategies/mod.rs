//! Trading Strategies Module
//!
//! Contains the available intraday strategies and the common abstraction the
//! backtester drives.

pub mod opening_breakout;

use anyhow::Result;

use crate::{Config, DayRecord, TradingDay};

/// A strategy that makes at most one trade per session
pub trait IntradayStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluate one session. `None` means the day could not be evaluated and is skipped.
    fn evaluate_day(&self, day: &TradingDay) -> Option<DayRecord>;
}

pub const AVAILABLE: &[&str] = &["opening_breakout"];

/// Build the strategy named in the config
pub fn create(config: &Config) -> Result<Box<dyn IntradayStrategy>> {
    let name = config.strategy_name()?;
    match name.as_str() {
        "opening_breakout" => opening_breakout::create(config),
        other => anyhow::bail!(
            "Unknown strategy: {}. Available strategies: {}",
            other,
            AVAILABLE.join(", ")
        ),
    }
}
