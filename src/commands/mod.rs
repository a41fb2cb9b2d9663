pub mod backtest;
pub mod expiry;
pub mod validate;
