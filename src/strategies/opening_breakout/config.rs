//! Opening Breakout Configuration

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBreakoutConfig {
    /// Target distance as a multiple of the signal bar range (default: 3.0)
    #[serde(default = "default_target_range_multiple")]
    pub target_range_multiple: f64,

    /// Trailing bars held back from the end-of-day exit, since the last
    /// bar of a session may be partial (default: 1)
    #[serde(default = "default_eod_buffer_bars")]
    pub eod_buffer_bars: usize,
}

fn default_target_range_multiple() -> f64 {
    3.0
}
fn default_eod_buffer_bars() -> usize {
    1
}

impl Default for OpeningBreakoutConfig {
    fn default() -> Self {
        Self {
            target_range_multiple: default_target_range_multiple(),
            eod_buffer_bars: default_eod_buffer_bars(),
        }
    }
}

impl OpeningBreakoutConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.target_range_multiple > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "target_range_multiple",
                reason: format!("{} must be positive", self.target_range_multiple),
            });
        }
        Ok(())
    }
}
