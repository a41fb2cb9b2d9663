//! Option expiry selection
//!
//! Bank Nifty weekly contracts expire on Wednesday, monthly contracts on the
//! last Thursday of the month. Days to expiry drive the time-decay buckets of
//! the premium model.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

pub const WEEKLY_EXPIRY_DAY: Weekday = Weekday::Wed;
pub const MONTHLY_EXPIRY_DAY: Weekday = Weekday::Thu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpiryPolicy {
    Weekly,
    Monthly,
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryPolicy::Weekly => write!(f, "WEEKLY"),
            ExpiryPolicy::Monthly => write!(f, "MONTHLY"),
        }
    }
}

impl FromStr for ExpiryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Ok(ExpiryPolicy::Weekly),
            "MONTHLY" => Ok(ExpiryPolicy::Monthly),
            _ => Err(ConfigError::UnknownExpiryPolicy(s.to_string())),
        }
    }
}

/// Next applicable expiry for a trade taken on `trade_date`
pub fn select_expiry(trade_date: NaiveDate, policy: ExpiryPolicy) -> NaiveDate {
    match policy {
        ExpiryPolicy::Weekly => next_weekly_expiry(trade_date),
        ExpiryPolicy::Monthly => monthly_expiry(trade_date),
    }
}

/// Calendar days from the trade date to the selected expiry
pub fn days_to_expiry(trade_date: NaiveDate, policy: ExpiryPolicy) -> i64 {
    (select_expiry(trade_date, policy) - trade_date).num_days()
}

/// Upcoming Wednesday; a Wednesday trade uses that day's expiry.
pub fn next_weekly_expiry(trade_date: NaiveDate) -> NaiveDate {
    let today = trade_date.weekday().num_days_from_monday() as i64;
    let target = WEEKLY_EXPIRY_DAY.num_days_from_monday() as i64;
    let days_ahead = (target - today).rem_euclid(7);
    trade_date + Duration::days(days_ahead)
}

/// Last Thursday of the trade's month, or of the following month once that has passed.
pub fn monthly_expiry(trade_date: NaiveDate) -> NaiveDate {
    let this_month = last_weekday_of_month(trade_date.year(), trade_date.month(), MONTHLY_EXPIRY_DAY);
    if trade_date <= this_month {
        return this_month;
    }

    let (year, month) = if trade_date.month() == 12 {
        (trade_date.year() + 1, 1)
    } else {
        (trade_date.year(), trade_date.month() + 1)
    };
    last_weekday_of_month(year, month, MONTHLY_EXPIRY_DAY)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let last_day = last_day_of_month(year, month);
    let back = (last_day.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        .rem_euclid(7);
    last_day - Duration::days(back)
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    // Day 1 of any valid month always exists
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|d| d - Duration::days(1))
        .unwrap_or(NaiveDate::MIN)
}
