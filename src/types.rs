//! Core data types used across the backtester

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("bar fields must be finite: open={open}, high={high}, low={low}, close={close}, volume={volume}")]
    NonFinite {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// One intraday OHLCV observation.
///
/// `datetime` is exchange-local wall time (IST for NSE data); the session
/// filter and day grouping both work on local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Create a new bar with validation
    pub fn new(
        datetime: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self::new_unchecked(datetime, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted sources or when validation is done separately)
    pub fn new_unchecked(
        datetime: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn validate(&self) -> Result<(), BarValidationError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if !fields.iter().all(|v| v.is_finite()) {
            return Err(BarValidationError::NonFinite {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                volume: self.volume,
            });
        }

        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(BarValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Calendar date the bar trades on
    pub fn trade_date(&self) -> NaiveDate {
        self.datetime.date()
    }
}

/// All session bars of one calendar trading date, in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDay {
    pub date: NaiveDate,
    pub bars: Vec<PriceBar>,
}

impl TradingDay {
    /// Reference bar, signal bar and at least one bar to break out on
    pub const MIN_BARS: usize = 3;

    pub fn new(date: NaiveDate, bars: Vec<PriceBar>) -> Self {
        Self { date, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether the day has enough bars to look for a breakout
    pub fn is_tradeable(&self) -> bool {
        self.bars.len() >= Self::MIN_BARS
    }

    pub fn high(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.high).reduce(f64::max)
    }

    pub fn low(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.low).reduce(f64::min)
    }
}

/// The second bar of the day, whose range defines the breakout levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBar {
    pub datetime: NaiveDateTime,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl SignalBar {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

impl From<&PriceBar> for SignalBar {
    fn from(bar: &PriceBar) -> Self {
        Self {
            datetime: bar.datetime,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}

/// Long option bought on a breakout: calls for upside, puts for downside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl OptionType {
    /// +1 for calls, -1 for puts; multiplies an underlying move into a favourable move
    pub fn sign(self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "CE"),
            OptionType::Put => write!(f, "PE"),
        }
    }
}

/// Which side of the signal bar price broke through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakoutDirection {
    None,
    Up,
    Down,
}

impl BreakoutDirection {
    pub fn option_type(self) -> Option<OptionType> {
        match self {
            BreakoutDirection::Up => Some(OptionType::Call),
            BreakoutDirection::Down => Some(OptionType::Put),
            BreakoutDirection::None => None,
        }
    }
}

/// How a triggered trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    Target,
    EndOfDay,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::Target => write!(f, "TARGET"),
            ExitReason::EndOfDay => write!(f, "EOD"),
        }
    }
}

/// One evaluated trading day, with or without a breakout.
///
/// Trade fields are `None` on no-breakout days. `spot_move` is the raw
/// underlying change `exit - entry`, so it is negative for a profitable put.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub signal_bar_high: f64,
    pub signal_bar_low: f64,
    pub signal_bar_range: f64,
    pub atm_strike: f64,
    pub direction: BreakoutDirection,
    pub entry_time: Option<NaiveDateTime>,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub spot_move: f64,
    pub spot_move_pct: f64,
    pub day_high: f64,
    pub day_low: f64,
}

impl DayRecord {
    pub fn is_breakout(&self) -> bool {
        self.direction != BreakoutDirection::None
    }

    pub fn option_type(&self) -> Option<OptionType> {
        self.direction.option_type()
    }

    /// Underlying points gained in the trade's favour
    pub fn favourable_points(&self) -> f64 {
        self.option_type()
            .map_or(0.0, |t| self.spot_move * t.sign())
    }
}

// ============================================================================
// Money Type - Precise Decimal Arithmetic for Monetary Values
// ============================================================================

use rust_decimal::Decimal;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Money type for rupee P&L totals.
///
/// Wraps `rust_decimal::Decimal` so that summing hundreds of per-trade
/// totals across strike policies does not drift the way `f64` sums do.
///
/// # Example
/// ```
/// use orb_backtest::Money;
/// let per_unit = Money::from_f64(116.5);
/// let total = per_unit * Money::from_i64(15);
/// assert_eq!(total.to_f64(), 1747.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create from f64. NaN and infinities map to zero.
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::try_from(value).unwrap_or_else(|_| {
            if value.is_nan() || value.is_infinite() {
                Decimal::ZERO
            } else {
                Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
            }
        }))
    }

    pub fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn from_i64(value: i64) -> Self {
        Money(Decimal::from(value))
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Mul for Money {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Money(self.0 * rhs.0)
    }
}

impl Div for Money {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        if rhs.0.is_zero() {
            Money::ZERO
        } else {
            Money(self.0 / rhs.0)
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}
