//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files, with environment
//! variable overrides (a `.env` file is honoured by the binary).

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::expiry::ExpiryPolicy;
use crate::options::{PremiumModelConfig, StrikePolicy, DEFAULT_STRIKE_STEP};

pub const ENV_DATA_PATH: &str = "ORB_DATA_PATH";
pub const ENV_LOT_SIZE: &str = "ORB_LOT_SIZE";
pub const ENV_EXPIRY: &str = "ORB_EXPIRY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    /// Strategy section; `name` selects the strategy, the rest are its parameters
    #[serde(default = "default_strategy")]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

fn default_strategy() -> serde_json::Value {
    serde_json::json!({ "name": "opening_breakout" })
}

impl Default for Config {
    fn default() -> Self {
        Config {
            session: SessionConfig::default(),
            strategy: default_strategy(),
            options: OptionsConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from JSON file, apply environment overrides and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Override selected settings from the environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var(ENV_DATA_PATH) {
            self.backtest.data_path = path;
        }
        if let Ok(lot_size) = std::env::var(ENV_LOT_SIZE) {
            self.options.lot_size = lot_size
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number, got '{}'", ENV_LOT_SIZE, lot_size))?;
        }
        if let Ok(expiry) = std::env::var(ENV_EXPIRY) {
            self.options.expiry_policy = expiry.parse()?;
        }
        Ok(())
    }

    /// Get strategy name from strategy config
    pub fn strategy_name(&self) -> Result<String> {
        self.strategy
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .context("'name' is required in the 'strategy' section of config. Example: \"strategy\": { \"name\": \"opening_breakout\", ... }")
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.session.validate()?;
        self.options.validate()
    }
}

/// Exchange session used to filter bars (exchange-local time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            market_open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            market_close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.market_open >= self.market_close {
            return Err(ConfigError::InvalidSetting {
                name: "session",
                reason: format!(
                    "market_open {} must be before market_close {}",
                    self.market_open, self.market_close
                ),
            });
        }
        Ok(())
    }
}

/// Option contract and premium model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Contract multiplier. Bank Nifty moved from 25 to 15 in Oct 2024;
    /// use the size in force for the backtested period.
    pub lot_size: u32,
    #[serde(default = "default_strike_step")]
    pub strike_step: f64,
    pub expiry_policy: ExpiryPolicy,
    /// Strike policies to compare, in report order
    pub strike_policies: Vec<StrikePolicy>,
    #[serde(default)]
    pub premium_model: PremiumModelConfig,
}

fn default_strike_step() -> f64 {
    DEFAULT_STRIKE_STEP
}

impl Default for OptionsConfig {
    fn default() -> Self {
        OptionsConfig {
            lot_size: 15,
            strike_step: DEFAULT_STRIKE_STEP,
            expiry_policy: ExpiryPolicy::Weekly,
            strike_policies: StrikePolicy::ALL.to_vec(),
            premium_model: PremiumModelConfig::default(),
        }
    }
}

impl OptionsConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.lot_size == 0 {
            return Err(ConfigError::InvalidLotSize);
        }
        if !(self.strike_step > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "strike_step",
                reason: format!("{} must be positive", self.strike_step),
            });
        }
        if self.strike_policies.is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "strike_policies",
                reason: "at least one strike policy is required".to_string(),
            });
        }
        for policy in &self.strike_policies {
            self.premium_model.calibration_for(*policy)?;
        }
        self.premium_model.validate()
    }
}

/// Backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// CSV of intraday spot bars
    pub data_path: String,
    pub results_dir: String,
    /// Evaluate trading days on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            data_path: "data/BANKNIFTY_5m.csv".to_string(),
            results_dir: "results".to_string(),
            parallel: true,
        }
    }
}
