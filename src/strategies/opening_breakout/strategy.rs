//! Opening Bar Breakout Strategy
//!
//! Signal: the second bar of the session (09:20-09:25 on 5-minute data).
//! Entry: first later bar trading above its high (buy CE) or below its low (buy PE).
//! Exit: stop at the opposite end of the signal bar, target at a multiple of its
//! range, otherwise the close of the last complete bar.
//!
//! When one bar breaches both ends, the upside breakout wins. Within a bar the
//! stop is checked before the target. Both orderings are fixed so that repeated
//! runs agree; intrabar order cannot be recovered from OHLC data.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::expiry::{select_expiry, ExpiryPolicy};
use crate::options::atm_strike;
use crate::strategies::IntradayStrategy;
use crate::{BreakoutDirection, DayRecord, ExitReason, OptionType, SignalBar, TradingDay};

use super::config::OpeningBreakoutConfig;

/// Index of the signal bar within the session
pub const SIGNAL_BAR_INDEX: usize = 1;

/// A triggered breakout and the levels that manage it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakout {
    pub option_type: OptionType,
    pub signal: SignalBar,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target: f64,
}

impl Breakout {
    pub fn direction(&self) -> BreakoutDirection {
        match self.option_type {
            OptionType::Call => BreakoutDirection::Up,
            OptionType::Put => BreakoutDirection::Down,
        }
    }

    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.target - self.entry_price).abs()
    }

    pub fn risk_reward_ratio(&self) -> f64 {
        let risk = self.risk();
        if risk > 0.0 {
            self.reward() / risk
        } else {
            0.0
        }
    }
}

/// Outcome of scanning a session for a breakout of the signal bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakoutEvent {
    NoBreakout { signal: SignalBar },
    Triggered(Breakout),
}

impl BreakoutEvent {
    pub fn direction(&self) -> BreakoutDirection {
        match self {
            BreakoutEvent::NoBreakout { .. } => BreakoutDirection::None,
            BreakoutEvent::Triggered(b) => b.direction(),
        }
    }

    pub fn signal(&self) -> SignalBar {
        match self {
            BreakoutEvent::NoBreakout { signal } => *signal,
            BreakoutEvent::Triggered(b) => b.signal,
        }
    }

    pub fn breakout(&self) -> Option<&Breakout> {
        match self {
            BreakoutEvent::NoBreakout { .. } => None,
            BreakoutEvent::Triggered(b) => Some(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitEvent {
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
}

pub struct OpeningBreakoutStrategy {
    config: OpeningBreakoutConfig,
    expiry_policy: ExpiryPolicy,
    strike_step: f64,
}

impl OpeningBreakoutStrategy {
    pub fn new(config: OpeningBreakoutConfig, expiry_policy: ExpiryPolicy, strike_step: f64) -> Self {
        Self {
            config,
            expiry_policy,
            strike_step,
        }
    }

    pub fn config(&self) -> &OpeningBreakoutConfig {
        &self.config
    }

    /// Scan the session for the first bar leaving the signal bar's range.
    ///
    /// Returns `None` when the day has too few bars to evaluate.
    pub fn detect_breakout(&self, day: &TradingDay) -> Option<BreakoutEvent> {
        if !day.is_tradeable() {
            return None;
        }

        let signal = SignalBar::from(&day.bars[SIGNAL_BAR_INDEX]);
        let range = signal.range();
        let target_distance = range * self.config.target_range_multiple;

        for (idx, bar) in day.bars.iter().enumerate().skip(SIGNAL_BAR_INDEX + 1) {
            if bar.high > signal.high {
                return Some(BreakoutEvent::Triggered(Breakout {
                    option_type: OptionType::Call,
                    signal,
                    entry_index: idx,
                    entry_time: bar.datetime,
                    entry_price: signal.high,
                    stop_loss: signal.low,
                    target: signal.high + target_distance,
                }));
            }
            if bar.low < signal.low {
                return Some(BreakoutEvent::Triggered(Breakout {
                    option_type: OptionType::Put,
                    signal,
                    entry_index: idx,
                    entry_time: bar.datetime,
                    entry_price: signal.low,
                    stop_loss: signal.high,
                    target: signal.low - target_distance,
                }));
            }
        }

        Some(BreakoutEvent::NoBreakout { signal })
    }

    /// Follow a triggered breakout from its entry bar to the first stop or target hit.
    ///
    /// Without a hit the trade closes at the last complete bar. If the entry
    /// came on that bar or later, the entry bar closes the trade instead.
    ///
    /// `breakout` must come from `detect_breakout` on the same `day`. A
    /// breakout whose entry bar lies outside `day` exits flat at its entry.
    pub fn detect_exit(&self, day: &TradingDay, breakout: &Breakout) -> ExitEvent {
        let last_index = match day.bars.len().checked_sub(1) {
            Some(last) if last >= breakout.entry_index => last,
            _ => {
                return ExitEvent {
                    exit_index: breakout.entry_index,
                    exit_time: breakout.entry_time,
                    exit_price: breakout.entry_price,
                    exit_reason: ExitReason::EndOfDay,
                }
            }
        };
        let eod_index = last_index
            .saturating_sub(self.config.eod_buffer_bars)
            .max(breakout.entry_index);

        let scan = day
            .bars
            .iter()
            .enumerate()
            .take(eod_index + 1)
            .skip(breakout.entry_index);

        for (idx, bar) in scan {
            let (stop_hit, target_hit) = match breakout.option_type {
                OptionType::Call => (bar.low <= breakout.stop_loss, bar.high >= breakout.target),
                OptionType::Put => (bar.high >= breakout.stop_loss, bar.low <= breakout.target),
            };

            if stop_hit {
                return ExitEvent {
                    exit_index: idx,
                    exit_time: bar.datetime,
                    exit_price: breakout.stop_loss,
                    exit_reason: ExitReason::StopLoss,
                };
            }
            if target_hit {
                return ExitEvent {
                    exit_index: idx,
                    exit_time: bar.datetime,
                    exit_price: breakout.target,
                    exit_reason: ExitReason::Target,
                };
            }
        }

        // entry_index <= eod_index <= last_index
        let bar = &day.bars[eod_index];
        ExitEvent {
            exit_index: eod_index,
            exit_time: bar.datetime,
            exit_price: bar.close,
            exit_reason: ExitReason::EndOfDay,
        }
    }
}

impl IntradayStrategy for OpeningBreakoutStrategy {
    fn name(&self) -> &'static str {
        "opening_breakout"
    }

    fn evaluate_day(&self, day: &TradingDay) -> Option<DayRecord> {
        let Some(event) = self.detect_breakout(day) else {
            debug!(date = %day.date, bars = day.len(), "Skipping day with insufficient bars");
            return None;
        };

        let expiry_date = select_expiry(day.date, self.expiry_policy);
        let days_to_expiry = (expiry_date - day.date).num_days();
        let signal = event.signal();

        let mut record = DayRecord {
            date: day.date,
            expiry_date,
            days_to_expiry,
            signal_bar_high: signal.high,
            signal_bar_low: signal.low,
            signal_bar_range: signal.range(),
            atm_strike: atm_strike(signal.close, self.strike_step),
            direction: event.direction(),
            entry_time: None,
            entry_price: None,
            stop_loss: None,
            target: None,
            risk_reward_ratio: None,
            exit_time: None,
            exit_price: None,
            exit_reason: None,
            spot_move: 0.0,
            spot_move_pct: 0.0,
            day_high: day.high().unwrap_or(signal.high),
            day_low: day.low().unwrap_or(signal.low),
        };

        let Some(breakout) = event.breakout() else {
            debug!(date = %day.date, "No breakout");
            return Some(record);
        };

        let exit = self.detect_exit(day, breakout);
        let spot_move = exit.exit_price - breakout.entry_price;

        record.entry_time = Some(breakout.entry_time);
        record.entry_price = Some(breakout.entry_price);
        record.stop_loss = Some(breakout.stop_loss);
        record.target = Some(breakout.target);
        record.risk_reward_ratio = Some(breakout.risk_reward_ratio());
        record.exit_time = Some(exit.exit_time);
        record.exit_price = Some(exit.exit_price);
        record.exit_reason = Some(exit.exit_reason);
        record.spot_move = spot_move;
        record.spot_move_pct = if breakout.entry_price > 0.0 {
            spot_move / breakout.entry_price * 100.0
        } else {
            0.0
        };

        debug!(
            date = %day.date,
            side = %breakout.option_type,
            entry = breakout.entry_price,
            exit = exit.exit_price,
            reason = %exit.exit_reason,
            "Breakout evaluated"
        );

        Some(record)
    }
}
