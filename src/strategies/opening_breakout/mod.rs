//! Opening Bar Breakout Strategy
//!
//! Entry on breakout of the second session bar's high/low range.

mod config;
mod strategy;

pub use config::OpeningBreakoutConfig;
pub use strategy::{
    Breakout, BreakoutEvent, ExitEvent, OpeningBreakoutStrategy, SIGNAL_BAR_INDEX,
};

use crate::strategies::IntradayStrategy;
use crate::Config;
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn IntradayStrategy>> {
    let strategy_config: OpeningBreakoutConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse opening_breakout config: {}", e))?;
    strategy_config.validate()?;
    Ok(Box::new(OpeningBreakoutStrategy::new(
        strategy_config,
        config.options.expiry_policy,
        config.options.strike_step,
    )))
}
