//! Opening Range Breakout Backtester
//!
//! Backtests the Bank Nifty opening-bar breakout on intraday spot bars and
//! compares strike-selection policies for the long option bought on each
//! breakout, using a calibrated delta/gamma/theta premium model in place of
//! historical option prices.

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod expiry;
pub mod export;
pub mod metrics;
pub mod options;
pub mod strategies;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, ConfigResult, SimulationError};
pub use types::*;
