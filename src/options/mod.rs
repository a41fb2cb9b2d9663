//! Options side of the backtest: strike selection and the premium model.

mod premium;
mod strike;

pub use premium::{
    default_calibration, option_gamma, DteBucket, OptionPremiumSimulation, PremiumModelConfig,
    PremiumSimulator, StrikeCalibration,
};
pub use strike::{
    atm_strike, parse_policy_list, select_strikes, StrikePair, StrikePolicy, DEFAULT_STRIKE_STEP,
};
