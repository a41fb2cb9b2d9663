//! Strike selection policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::OptionType;

/// Default Bank Nifty strike interval
pub const DEFAULT_STRIKE_STEP: f64 = 100.0;

/// Which strike to buy relative to the at-the-money strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrikePolicy {
    #[serde(rename = "ATM")]
    Atm,
    #[serde(rename = "OTM_100")]
    Otm100,
    #[serde(rename = "OTM_200")]
    Otm200,
    #[serde(rename = "ITM_100")]
    Itm100,
}

impl StrikePolicy {
    pub const ALL: [StrikePolicy; 4] = [
        StrikePolicy::Atm,
        StrikePolicy::Otm100,
        StrikePolicy::Otm200,
        StrikePolicy::Itm100,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrikePolicy::Atm => "ATM",
            StrikePolicy::Otm100 => "OTM_100",
            StrikePolicy::Otm200 => "OTM_200",
            StrikePolicy::Itm100 => "ITM_100",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StrikePolicy::Atm => "At The Money",
            StrikePolicy::Otm100 => "100 Points OTM",
            StrikePolicy::Otm200 => "200 Points OTM",
            StrikePolicy::Itm100 => "100 Points ITM",
        }
    }

    /// Points out of the money; negative means in the money
    pub fn otm_points(self) -> f64 {
        match self {
            StrikePolicy::Atm => 0.0,
            StrikePolicy::Otm100 => 100.0,
            StrikePolicy::Otm200 => 200.0,
            StrikePolicy::Itm100 => -100.0,
        }
    }
}

impl fmt::Display for StrikePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrikePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        StrikePolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownStrikePolicy(s.to_string()))
    }
}

/// Parse a comma-separated policy list such as `"ATM,OTM_100"`
pub fn parse_policy_list(s: &str) -> Result<Vec<StrikePolicy>, ConfigError> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(StrikePolicy::from_str)
        .collect()
}

/// CE and PE strikes chosen for one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikePair {
    pub call: f64,
    pub put: f64,
}

impl StrikePair {
    pub fn for_option(&self, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => self.call,
            OptionType::Put => self.put,
        }
    }
}

/// Spot rounded to the nearest listed strike
pub fn atm_strike(spot: f64, strike_step: f64) -> f64 {
    (spot / strike_step).round() * strike_step
}

/// Strikes for both sides; OTM calls sit above spot, OTM puts below.
pub fn select_strikes(spot: f64, policy: StrikePolicy, strike_step: f64) -> StrikePair {
    let atm = atm_strike(spot, strike_step);
    let offset = policy.otm_points();
    StrikePair {
        call: atm + offset,
        put: atm - offset,
    }
}
