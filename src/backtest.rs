//! Backtesting engine
//!
//! Evaluates every trading day with the configured strategy, then prices each
//! triggered day as a long option under every configured strike policy.
//! Days are independent, so evaluation runs on the rayon pool when enabled.

use anyhow::Result;
use chrono::NaiveDate;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::metrics::{aggregate, OptionTrade, StrategyComparisonResult};
use crate::options::{select_strikes, PremiumSimulator, StrikePolicy};
use crate::strategies::IntradayStrategy;
use crate::{Config, DayRecord, Money, OptionType, SimulationError, TradingDay};

/// Backtest engine
pub struct Backtester {
    strategy: Box<dyn IntradayStrategy>,
    simulator: PremiumSimulator,
    lot_size: u32,
    strike_step: f64,
    strike_policies: Vec<StrikePolicy>,
    parallel: bool,
}

impl Backtester {
    pub fn new(config: &Config, strategy: Box<dyn IntradayStrategy>) -> Result<Self> {
        config.options.validate()?;
        let simulator = PremiumSimulator::new(config.options.premium_model.clone())?;

        Ok(Backtester {
            strategy,
            simulator,
            lot_size: config.options.lot_size,
            strike_step: config.options.strike_step,
            strike_policies: config.options.strike_policies.clone(),
            parallel: config.backtest.parallel,
        })
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Run backtest over the given sessions
    pub fn run(&self, days: &[TradingDay]) -> Result<BacktestReport> {
        self.run_inner(days, None)
    }

    /// Run backtest, advancing `progress_bar` once per evaluated day
    pub fn run_with_progress(&self, days: &[TradingDay], progress_bar: &ProgressBar) -> Result<BacktestReport> {
        self.run_inner(days, Some(progress_bar))
    }

    fn run_inner(&self, days: &[TradingDay], progress: Option<&ProgressBar>) -> Result<BacktestReport> {
        info!(
            "Evaluating {} trading days with {} ({})",
            days.len(),
            self.strategy.name(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let evaluated = self.evaluate_days(days, progress);

        let mut day_records = Vec::with_capacity(days.len());
        let mut skipped_days = Vec::new();
        for (day, record) in days.iter().zip(evaluated) {
            match record {
                Some(record) => day_records.push(record),
                None => {
                    warn!("Skipping {}: only {} bars", day.date, day.len());
                    skipped_days.push(day.date);
                }
            }
        }

        let no_breakout_days = day_records.iter().filter(|r| !r.is_breakout()).count();

        let mut policies = Vec::with_capacity(self.strike_policies.len());
        for &policy in &self.strike_policies {
            let trades = self.simulate_trades(&day_records, policy)?;
            let summary = aggregate(policy, day_records.len(), no_breakout_days, &trades);
            info!(
                "{}: {} trades, win rate {:.1}%, total P&L ₹{}",
                policy,
                summary.total_trades,
                summary.win_rate,
                summary.total_pnl.round_dp(2)
            );
            policies.push(PolicyReport {
                policy,
                trades,
                summary,
            });
        }

        let report = BacktestReport {
            day_records,
            skipped_days,
            policies,
        };

        info!(
            "Backtest complete: {} days evaluated, {} breakouts ({} CE, {} PE), {} skipped",
            report.day_records.len(),
            report.breakout_days(),
            report.ce_days(),
            report.pe_days(),
            report.skipped_days.len()
        );

        Ok(report)
    }

    /// Evaluate each day; output order matches input order
    fn evaluate_days(&self, days: &[TradingDay], progress: Option<&ProgressBar>) -> Vec<Option<DayRecord>> {
        let evaluate = |day: &TradingDay| {
            let record = self.strategy.evaluate_day(day);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            record
        };

        if self.parallel {
            days.par_iter().map(evaluate).collect()
        } else {
            days.iter().map(evaluate).collect()
        }
    }

    /// Price every triggered day as a long option under `policy`.
    ///
    /// A day whose move cannot be priced is logged and left out; a
    /// configuration problem aborts.
    pub fn simulate_trades(&self, records: &[DayRecord], policy: StrikePolicy) -> Result<Vec<OptionTrade>> {
        let lot_size = Money::from_i64(i64::from(self.lot_size));
        let mut trades = Vec::new();

        for record in records {
            let (Some(option_type), Some(exit_reason)) = (record.option_type(), record.exit_reason) else {
                continue;
            };

            let sim = match self
                .simulator
                .simulate(record.spot_move, option_type, policy, record.days_to_expiry)
            {
                Ok(sim) => sim,
                Err(SimulationError::Config(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping {} trade on {}: {}", policy, record.date, e);
                    continue;
                }
            };
            let strikes = select_strikes(record.atm_strike, policy, self.strike_step);

            trades.push(OptionTrade {
                date: record.date,
                option_type,
                strike_policy: policy,
                selected_strike: strikes.for_option(option_type),
                days_to_expiry: record.days_to_expiry,
                exit_reason,
                spot_move: record.spot_move,
                entry_premium: sim.entry_premium,
                exit_premium: sim.exit_premium,
                entry_delta: sim.entry_delta,
                exit_delta: sim.exit_delta,
                gamma: sim.gamma,
                theta_decay: sim.theta_decay,
                profit_per_unit: sim.profit,
                total_profit: (Money::from_f64(sim.profit) * lot_size).round_dp(2),
                profit_pct: sim.profit_pct,
            });
        }

        Ok(trades)
    }
}

/// Trades and statistics of one strike policy
#[derive(Debug, Clone, Serialize)]
pub struct PolicyReport {
    pub policy: StrikePolicy,
    pub trades: Vec<OptionTrade>,
    pub summary: StrategyComparisonResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestReport {
    pub day_records: Vec<DayRecord>,
    /// Sessions with too few bars to evaluate
    pub skipped_days: Vec<NaiveDate>,
    /// In configured policy order
    pub policies: Vec<PolicyReport>,
}

impl BacktestReport {
    pub fn breakout_days(&self) -> usize {
        self.day_records.iter().filter(|r| r.is_breakout()).count()
    }

    pub fn ce_days(&self) -> usize {
        self.count_option_type(OptionType::Call)
    }

    pub fn pe_days(&self) -> usize {
        self.count_option_type(OptionType::Put)
    }

    pub fn no_breakout_days(&self) -> usize {
        self.day_records.len() - self.breakout_days()
    }

    fn count_option_type(&self, option_type: OptionType) -> usize {
        self.day_records
            .iter()
            .filter(|r| r.option_type() == Some(option_type))
            .count()
    }

    pub fn policy(&self, policy: StrikePolicy) -> Option<&PolicyReport> {
        self.policies.iter().find(|p| p.policy == policy)
    }

    /// Policy with the highest total P&L; the earlier policy wins a tie
    pub fn best_policy(&self) -> Option<&PolicyReport> {
        self.policies.iter().fold(None, |best: Option<&PolicyReport>, candidate| match best {
            Some(b) if b.summary.total_pnl >= candidate.summary.total_pnl => Some(b),
            _ => Some(candidate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies;
    use crate::{ExitReason, PriceBar};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn day(date: NaiveDate, ohlc: &[(f64, f64, f64, f64)]) -> TradingDay {
        let start = date.and_hms_opt(9, 15, 0).unwrap();
        let bars = ohlc
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                PriceBar::new_unchecked(start + Duration::minutes(5 * i as i64), o, h, l, c, 0.0)
            })
            .collect();
        TradingDay::new(date, bars)
    }

    /// UP breakout at 50000 stopped out at 49900
    fn stop_loss_day(date: NaiveDate) -> TradingDay {
        day(
            date,
            &[
                (49_950.0, 49_980.0, 49_920.0, 49_960.0),
                (49_960.0, 50_000.0, 49_900.0, 49_950.0),
                (49_950.0, 50_050.0, 49_940.0, 50_020.0),
                (50_020.0, 50_030.0, 49_850.0, 49_880.0),
                (49_880.0, 49_900.0, 49_860.0, 49_870.0),
            ],
        )
    }

    /// DOWN breakout at 49900 reaching the 49600 target
    fn put_target_day(date: NaiveDate) -> TradingDay {
        day(
            date,
            &[
                (49_950.0, 49_980.0, 49_920.0, 49_960.0),
                (49_960.0, 50_000.0, 49_900.0, 49_950.0),
                (49_950.0, 49_960.0, 49_850.0, 49_870.0),
                (49_870.0, 49_880.0, 49_550.0, 49_580.0),
                (49_580.0, 49_600.0, 49_500.0, 49_520.0),
            ],
        )
    }

    fn inside_day(date: NaiveDate) -> TradingDay {
        day(
            date,
            &[
                (49_950.0, 49_980.0, 49_920.0, 49_960.0),
                (49_960.0, 50_000.0, 49_900.0, 49_950.0),
                (49_950.0, 49_990.0, 49_910.0, 49_960.0),
                (49_960.0, 49_995.0, 49_905.0, 49_950.0),
            ],
        )
    }

    fn backtester(config: &Config) -> Backtester {
        let strategy = strategies::create(config).unwrap();
        Backtester::new(config, strategy).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    #[test]
    fn test_run_counts_days() {
        let days = vec![
            stop_loss_day(date(14)),
            put_target_day(date(15)),
            inside_day(date(16)),
            day(date(17), &[(1.0, 2.0, 0.5, 1.5), (1.5, 2.0, 1.0, 1.2)]),
        ];
        let report = backtester(&Config::default()).run(&days).unwrap();

        assert_eq!(report.day_records.len(), 3);
        assert_eq!(report.skipped_days, vec![date(17)]);
        assert_eq!(report.breakout_days(), 2);
        assert_eq!(report.ce_days(), 1);
        assert_eq!(report.pe_days(), 1);
        assert_eq!(report.no_breakout_days(), 1);
        assert_eq!(report.policies.len(), 4);

        let atm = report.policy(StrikePolicy::Atm).unwrap();
        assert_eq!(atm.summary.total_trades, 2);
        assert_eq!(atm.summary.total_days, 3);
        assert_eq!(atm.summary.no_breakout_days, 1);
        assert_eq!(atm.summary.sl_hits, 1);
        assert_eq!(atm.summary.target_hits, 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let days: Vec<TradingDay> = (1..=20)
            .map(|d| match d % 3 {
                0 => stop_loss_day(date(d)),
                1 => put_target_day(date(d)),
                _ => inside_day(date(d)),
            })
            .collect();

        let mut config = Config::default();
        let parallel = backtester(&config).run(&days).unwrap();
        config.backtest.parallel = false;
        let sequential = backtester(&config).run(&days).unwrap();

        assert_eq!(parallel.day_records, sequential.day_records);
        for (p, s) in parallel.policies.iter().zip(&sequential.policies) {
            assert_eq!(p.summary, s.summary);
        }
    }

    #[test]
    fn test_trade_totals_use_lot_size() {
        let mut config = Config::default();
        config.options.lot_size = 25;
        config.options.strike_policies = vec![StrikePolicy::Otm100];
        let report = backtester(&config).run(&[put_target_day(date(15))]).unwrap();

        let trade = &report.policies[0].trades[0];
        assert_eq!(trade.option_type, OptionType::Put);
        assert_eq!(trade.exit_reason, ExitReason::Target);
        assert_relative_eq!(trade.spot_move, -300.0);
        // Signal close 49950 rounds to 50000; OTM put is 100 below
        assert_eq!(trade.selected_strike, 49_900.0);
        assert_relative_eq!(
            trade.total_profit.to_f64(),
            trade.profit_per_unit * 25.0,
            epsilon = 0.01
        );
        assert!(trade.total_profit.is_positive());
    }

    #[test]
    fn test_stop_loss_trade_loses() {
        let report = backtester(&Config::default()).run(&[stop_loss_day(date(14))]).unwrap();
        for policy in &report.policies {
            assert!(policy.trades[0].total_profit.is_negative());
            assert!(policy.trades[0].exit_premium >= 0.0);
        }
    }

    #[test]
    fn test_no_trades_is_not_an_error() {
        let report = backtester(&Config::default()).run(&[inside_day(date(16))]).unwrap();
        assert_eq!(report.breakout_days(), 0);
        for policy in &report.policies {
            assert_eq!(policy.summary.total_trades, 0);
            assert_eq!(policy.summary.win_rate, 0.0);
        }
    }

    #[test]
    fn test_best_policy_prefers_first_on_tie() {
        let report = backtester(&Config::default()).run(&[inside_day(date(16))]).unwrap();
        assert_eq!(report.best_policy().unwrap().policy, StrikePolicy::Atm);
        assert!(BacktestReport::default().best_policy().is_none());
    }

    #[test]
    fn test_best_policy_highest_pnl() {
        let report = backtester(&Config::default()).run(&[put_target_day(date(15))]).unwrap();
        let best = report.best_policy().unwrap();
        for policy in &report.policies {
            assert!(best.summary.total_pnl >= policy.summary.total_pnl);
        }
    }

    #[test]
    fn test_unpriceable_move_is_skipped() {
        // EOD exit bar carries an infinite close that bypassed the loader
        let broken = day(
            date(14),
            &[
                (49_950.0, 49_980.0, 49_920.0, 49_960.0),
                (49_960.0, 50_000.0, 49_900.0, 49_950.0),
                (49_950.0, 50_050.0, 49_940.0, 50_020.0),
                (50_020.0, 50_040.0, 49_990.0, f64::INFINITY),
                (50_030.0, 50_040.0, 50_000.0, 50_010.0),
            ],
        );
        let days = vec![broken, put_target_day(date(15))];
        let report = backtester(&Config::default()).run(&days).unwrap();

        assert_eq!(report.day_records.len(), 2);
        assert_eq!(report.ce_days(), 1);
        for policy in &report.policies {
            assert_eq!(policy.summary.total_trades, 1);
            assert_eq!(policy.trades[0].option_type, OptionType::Put);
        }
    }

    #[test]
    fn test_huge_move_completes() {
        let extreme = day(
            date(14),
            &[
                (49_950.0, 49_980.0, 49_920.0, 49_960.0),
                (49_960.0, 50_000.0, 49_900.0, 49_950.0),
                (49_950.0, 50_050.0, 49_940.0, 50_020.0),
                (50_020.0, 50_040.0, 49_990.0, 5e15),
                (50_030.0, 50_040.0, 50_000.0, 50_010.0),
            ],
        );
        let report = backtester(&Config::default()).run(&[extreme]).unwrap();
        for policy in &report.policies {
            let trade = &policy.trades[0];
            assert_eq!(trade.exit_reason, ExitReason::EndOfDay);
            assert!(trade.profit_per_unit.is_finite());
            assert!(trade.exit_premium >= 0.0);
        }
    }

    #[test]
    fn test_progress_bar_advances_per_day() {
        let days = vec![stop_loss_day(date(14)), inside_day(date(16))];
        let pb = ProgressBar::hidden();
        backtester(&Config::default()).run_with_progress(&days, &pb).unwrap();
        assert_eq!(pb.position(), 2);
    }
}
