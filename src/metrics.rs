//! Per-trade records and per-policy aggregate statistics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::options::StrikePolicy;
use crate::{ExitReason, Money, OptionType};

/// One simulated option trade: a triggered day under one strike policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTrade {
    pub date: NaiveDate,
    pub option_type: OptionType,
    pub strike_policy: StrikePolicy,
    pub selected_strike: f64,
    pub days_to_expiry: i64,
    pub exit_reason: ExitReason,
    pub spot_move: f64,
    pub entry_premium: f64,
    pub exit_premium: f64,
    pub entry_delta: f64,
    pub exit_delta: f64,
    pub gamma: f64,
    pub theta_decay: f64,
    pub profit_per_unit: f64,
    /// `profit_per_unit × lot_size`
    pub total_profit: Money,
    pub profit_pct: f64,
}

impl OptionTrade {
    pub fn is_win(&self) -> bool {
        self.total_profit.is_positive()
    }

    pub fn is_loss(&self) -> bool {
        self.total_profit.is_negative()
    }
}

/// Aggregate statistics of one strike policy over a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparisonResult {
    pub policy: StrikePolicy,
    pub total_days: usize,
    pub total_trades: usize,
    pub ce_trades: usize,
    pub pe_trades: usize,
    pub no_breakout_days: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent
    pub win_rate: f64,
    pub sl_hits: usize,
    pub target_hits: usize,
    pub eod_exits: usize,
    pub sl_hit_rate: f64,
    pub target_hit_rate: f64,
    pub eod_exit_rate: f64,
    pub total_pnl: Money,
    pub avg_pnl: Money,
    pub max_profit: Money,
    /// Smallest single-trade P&L
    pub max_loss: Money,
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Aggregate the trades of one policy. Rates and averages are zero when
/// there are no trades.
pub fn aggregate(
    policy: StrikePolicy,
    total_days: usize,
    no_breakout_days: usize,
    trades: &[OptionTrade],
) -> StrategyComparisonResult {
    let total_trades = trades.len();
    let count_type = |t: OptionType| trades.iter().filter(|tr| tr.option_type == t).count();
    let count_exit = |r: ExitReason| trades.iter().filter(|tr| tr.exit_reason == r).count();

    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    let losing_trades = trades.iter().filter(|t| t.is_loss()).count();
    let sl_hits = count_exit(ExitReason::StopLoss);
    let target_hits = count_exit(ExitReason::Target);
    let eod_exits = count_exit(ExitReason::EndOfDay);

    let total_pnl: Money = trades.iter().map(|t| t.total_profit).sum();
    let avg_pnl = total_pnl / Money::from_i64(total_trades as i64);
    let max_profit = trades.iter().map(|t| t.total_profit).max().unwrap_or(Money::ZERO);
    let max_loss = trades.iter().map(|t| t.total_profit).min().unwrap_or(Money::ZERO);

    StrategyComparisonResult {
        policy,
        total_days,
        total_trades,
        ce_trades: count_type(OptionType::Call),
        pe_trades: count_type(OptionType::Put),
        no_breakout_days,
        winning_trades,
        losing_trades,
        win_rate: pct(winning_trades, total_trades),
        sl_hits,
        target_hits,
        eod_exits,
        sl_hit_rate: pct(sl_hits, total_trades),
        target_hit_rate: pct(target_hits, total_trades),
        eod_exit_rate: pct(eod_exits, total_trades),
        total_pnl,
        avg_pnl,
        max_profit,
        max_loss,
    }
}
