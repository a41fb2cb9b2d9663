//! Configuration error types

use thiserror::Error;

use crate::options::StrikePolicy;

/// Mistakes in backtest configuration.
///
/// These abort the run instead of falling back to a default policy, since a
/// silently substituted strike or expiry would produce a plausible but wrong
/// comparison.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown strike policy '{0}' (expected one of ATM, OTM_100, OTM_200, ITM_100)")]
    UnknownStrikePolicy(String),

    #[error("unknown expiry policy '{0}' (expected WEEKLY or MONTHLY)")]
    UnknownExpiryPolicy(String),

    #[error("no calibration configured for strike policy {0}")]
    MissingCalibration(StrikePolicy),

    #[error("invalid calibration for {policy}: {reason}")]
    InvalidCalibration { policy: StrikePolicy, reason: String },

    #[error("lot size must be greater than zero")]
    InvalidLotSize,

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to price one trade
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("spot move {0} is not a finite number")]
    NonFiniteMove(f64),

    #[error("premium for spot move {spot_move} is not finite")]
    NonFinitePremium { spot_move: f64 },
}
