//! Synthetic option premium simulation
//!
//! This is an approximation, not an options pricer. A fixed initial delta and
//! base premium per strike policy are scaled by time-to-expiry buckets, the
//! premium change is integrated over the spot move in fixed point steps with
//! delta drifting by a constant gamma, and a flat theta charge is taken for
//! the intraday hold.
//!
//! Calibration defaults are for Bank Nifty weekly options and belong in the
//! configuration file for any other underlying.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::StrikePolicy;
use crate::error::{ConfigError, ConfigResult, SimulationError};
use crate::OptionType;

/// Initial delta and base premium for one strike policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeCalibration {
    pub initial_delta: f64,
    pub base_premium: f64,
}

impl StrikeCalibration {
    pub fn new(initial_delta: f64, base_premium: f64) -> Self {
        Self {
            initial_delta,
            base_premium,
        }
    }
}

/// Premium model constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumModelConfig {
    /// Calibration per strike policy
    #[serde(default = "default_calibration")]
    pub calibration: BTreeMap<StrikePolicy, StrikeCalibration>,

    /// Spot points per integration step (default: 10)
    #[serde(default = "default_step_points")]
    pub step_points: f64,

    /// Gamma of an exactly at-the-money option before the expiry multiplier (default: 0.01)
    #[serde(default = "default_base_gamma")]
    pub base_gamma: f64,

    /// Lower delta bound while integrating (default: 0.01)
    #[serde(default = "default_delta_floor")]
    pub delta_floor: f64,

    /// Upper delta bound while integrating (default: 0.99)
    #[serde(default = "default_delta_cap")]
    pub delta_cap: f64,
}

pub fn default_calibration() -> BTreeMap<StrikePolicy, StrikeCalibration> {
    BTreeMap::from([
        (StrikePolicy::Atm, StrikeCalibration::new(0.55, 300.0)),
        (StrikePolicy::Otm100, StrikeCalibration::new(0.35, 175.0)),
        (StrikePolicy::Otm200, StrikeCalibration::new(0.20, 75.0)),
        (StrikePolicy::Itm100, StrikeCalibration::new(0.65, 450.0)),
    ])
}
fn default_step_points() -> f64 {
    10.0
}
fn default_base_gamma() -> f64 {
    0.01
}
fn default_delta_floor() -> f64 {
    0.01
}
fn default_delta_cap() -> f64 {
    0.99
}

impl Default for PremiumModelConfig {
    fn default() -> Self {
        Self {
            calibration: default_calibration(),
            step_points: default_step_points(),
            base_gamma: default_base_gamma(),
            delta_floor: default_delta_floor(),
            delta_cap: default_delta_cap(),
        }
    }
}

impl PremiumModelConfig {
    pub fn calibration_for(&self, policy: StrikePolicy) -> ConfigResult<StrikeCalibration> {
        self.calibration
            .get(&policy)
            .copied()
            .ok_or(ConfigError::MissingCalibration(policy))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (&policy, cal) in &self.calibration {
            if !(cal.initial_delta > 0.0 && cal.initial_delta < 1.0) {
                return Err(ConfigError::InvalidCalibration {
                    policy,
                    reason: format!("initial_delta {} must be in (0, 1)", cal.initial_delta),
                });
            }
            if !(cal.base_premium > 0.0) {
                return Err(ConfigError::InvalidCalibration {
                    policy,
                    reason: format!("base_premium {} must be positive", cal.base_premium),
                });
            }
        }
        if !(self.step_points > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "step_points",
                reason: format!("{} must be positive", self.step_points),
            });
        }
        if self.base_gamma < 0.0 {
            return Err(ConfigError::InvalidSetting {
                name: "base_gamma",
                reason: format!("{} must not be negative", self.base_gamma),
            });
        }
        if !(self.delta_floor >= 0.0 && self.delta_floor < self.delta_cap && self.delta_cap <= 1.0) {
            return Err(ConfigError::InvalidSetting {
                name: "delta_floor/delta_cap",
                reason: format!(
                    "need 0 <= floor < cap <= 1, got [{}, {}]",
                    self.delta_floor, self.delta_cap
                ),
            });
        }
        Ok(())
    }
}

/// Time-to-expiry bucket shared by the premium, gamma and theta tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DteBucket {
    /// One day or less
    ExpiryDay,
    /// Two to three days
    CurrentWeek,
    /// Four to seven days
    NextWeek,
    /// More than a week
    Distant,
}

impl DteBucket {
    pub fn from_days(days_to_expiry: i64) -> Self {
        match days_to_expiry {
            d if d <= 1 => DteBucket::ExpiryDay,
            d if d <= 3 => DteBucket::CurrentWeek,
            d if d <= 7 => DteBucket::NextWeek,
            _ => DteBucket::Distant,
        }
    }

    /// Time value scaling of the base premium
    pub fn premium_multiplier(self) -> f64 {
        match self {
            DteBucket::ExpiryDay => 0.6,
            DteBucket::CurrentWeek => 1.0,
            DteBucket::NextWeek => 1.3,
            DteBucket::Distant => 1.5,
        }
    }

    /// Gamma grows as expiry approaches
    pub fn gamma_multiplier(self) -> f64 {
        match self {
            DteBucket::ExpiryDay => 3.0,
            DteBucket::CurrentWeek => 2.0,
            DteBucket::NextWeek => 1.5,
            DteBucket::Distant => 1.0,
        }
    }

    /// Fraction of the entry premium lost to decay over one session
    pub fn theta_decay_pct(self) -> f64 {
        match self {
            DteBucket::ExpiryDay => 0.15,
            DteBucket::CurrentWeek => 0.08,
            DteBucket::NextWeek => 0.05,
            DteBucket::Distant => 0.03,
        }
    }
}

/// Gamma peaks at delta 0.5 and falls linearly to zero at delta 0 or 1.
pub fn option_gamma(delta: f64, days_to_expiry: i64, base_gamma: f64) -> f64 {
    let atm_distance = (delta.abs() - 0.5).abs();
    let gamma = base_gamma * (1.0 - atm_distance * 2.0) * DteBucket::from_days(days_to_expiry).gamma_multiplier();
    gamma.max(0.0)
}

/// Result of one simulated option round trip, per unit of the underlying
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionPremiumSimulation {
    pub entry_premium: f64,
    pub exit_premium: f64,
    pub entry_delta: f64,
    pub exit_delta: f64,
    pub gamma: f64,
    pub theta_decay: f64,
    pub profit: f64,
    pub profit_pct: f64,
}

/// Stateless premium model over a validated configuration
#[derive(Debug, Clone)]
pub struct PremiumSimulator {
    config: PremiumModelConfig,
}

impl PremiumSimulator {
    pub fn new(config: PremiumModelConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PremiumModelConfig {
        &self.config
    }

    /// Simulate entry and exit premiums for a long option.
    ///
    /// `spot_move` is the underlying change from entry to exit (`exit - entry`).
    /// Calls gain on positive moves, puts on negative ones.
    pub fn simulate(
        &self,
        spot_move: f64,
        option_type: OptionType,
        policy: StrikePolicy,
        days_to_expiry: i64,
    ) -> Result<OptionPremiumSimulation, SimulationError> {
        if !spot_move.is_finite() {
            return Err(SimulationError::NonFiniteMove(spot_move));
        }

        let cal = self.config.calibration_for(policy)?;
        let bucket = DteBucket::from_days(days_to_expiry);

        let entry_premium = cal.base_premium * bucket.premium_multiplier();
        let entry_delta = cal.initial_delta.abs();
        let gamma = option_gamma(entry_delta, days_to_expiry, self.config.base_gamma);

        let favourable_move = spot_move * option_type.sign();
        let (premium_change, exit_delta) = self.integrate_delta(entry_delta, gamma, favourable_move);

        let theta_decay = entry_premium * bucket.theta_decay_pct();
        let exit_premium = (entry_premium + premium_change - theta_decay).max(0.0);
        if !exit_premium.is_finite() {
            return Err(SimulationError::NonFinitePremium { spot_move });
        }
        let profit = exit_premium - entry_premium;
        let profit_pct = if entry_premium > 0.0 {
            profit / entry_premium * 100.0
        } else {
            0.0
        };

        Ok(OptionPremiumSimulation {
            entry_premium,
            exit_premium,
            entry_delta,
            exit_delta,
            gamma,
            theta_decay,
            profit,
            profit_pct,
        })
    }

    /// Premium change and final delta over `favourable_move`.
    ///
    /// Equivalent to stepping `max(1, floor(|move| / step_points))` equal steps,
    /// each adding `delta × step` and then moving delta by `gamma × step`
    /// within `[delta_floor, delta_cap]`. After the first step delta is linear
    /// in the step count until it is pinned at a bound, so both phases are
    /// summed in closed form and the cost does not grow with the move.
    fn integrate_delta(&self, entry_delta: f64, gamma: f64, favourable_move: f64) -> (f64, f64) {
        let (floor, cap) = (self.config.delta_floor, self.config.delta_cap);
        let num_steps = (favourable_move.abs() / self.config.step_points).floor().max(1.0);
        let step = favourable_move / num_steps;
        let drift = gamma * step;

        let start = (entry_delta + drift).clamp(floor, cap);
        let remaining = num_steps - 1.0;

        let (free_steps, pinned) = if drift > 0.0 {
            (((cap - start) / drift).floor() + 1.0, cap)
        } else if drift < 0.0 {
            (((floor - start) / drift).floor() + 1.0, floor)
        } else {
            (remaining, start)
        };
        let free_steps = free_steps.min(remaining);

        let delta_sum = entry_delta
            + free_steps * start
            + drift * free_steps * (free_steps - 1.0) / 2.0
            + (remaining - free_steps) * pinned;
        let exit_delta = (start + remaining * drift).clamp(floor, cap);

        (delta_sum * step, exit_delta)
    }
}

impl Default for PremiumSimulator {
    fn default() -> Self {
        Self {
            config: PremiumModelConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn simulator() -> PremiumSimulator {
        PremiumSimulator::default()
    }

    #[test]
    fn test_dte_buckets() {
        assert_eq!(DteBucket::from_days(0), DteBucket::ExpiryDay);
        assert_eq!(DteBucket::from_days(1), DteBucket::ExpiryDay);
        assert_eq!(DteBucket::from_days(3), DteBucket::CurrentWeek);
        assert_eq!(DteBucket::from_days(6), DteBucket::NextWeek);
        assert_eq!(DteBucket::from_days(8), DteBucket::Distant);
    }

    #[test]
    fn test_gamma_peaks_at_the_money() {
        assert_relative_eq!(option_gamma(0.5, 10, 0.01), 0.01);
        assert_relative_eq!(option_gamma(0.55, 3, 0.01), 0.018, epsilon = 1e-12);
        assert_relative_eq!(option_gamma(0.20, 1, 0.01), 0.012, epsilon = 1e-12);
        assert!(option_gamma(0.55, 3, 0.01) > option_gamma(0.65, 3, 0.01));
        assert_eq!(option_gamma(1.2, 3, 0.01), 0.0);
    }

    #[test]
    fn test_atm_call_upside_scenario() {
        let sim = simulator()
            .simulate(150.0, OptionType::Call, StrikePolicy::Atm, 3)
            .unwrap();

        assert_relative_eq!(sim.entry_premium, 300.0);
        assert_relative_eq!(sim.entry_delta, 0.55);
        assert_relative_eq!(sim.gamma, 0.018, epsilon = 1e-12);
        assert_relative_eq!(sim.theta_decay, 24.0, epsilon = 1e-9);
        // 15 steps of 10 points: delta 0.55, 0.73, 0.91, then capped at 0.99
        assert_relative_eq!(sim.exit_delta, 0.99, epsilon = 1e-12);
        assert_relative_eq!(sim.profit, 140.7 - 24.0, epsilon = 1e-9);
        assert!(sim.profit > 0.0);
        assert_relative_eq!(sim.profit_pct, sim.profit / sim.entry_premium * 100.0);
    }

    #[test]
    fn test_put_gains_on_downside() {
        let down = simulator()
            .simulate(-150.0, OptionType::Put, StrikePolicy::Atm, 3)
            .unwrap();
        let up = simulator()
            .simulate(150.0, OptionType::Call, StrikePolicy::Atm, 3)
            .unwrap();
        assert_relative_eq!(down.profit, up.profit);

        let adverse = simulator()
            .simulate(150.0, OptionType::Put, StrikePolicy::Atm, 3)
            .unwrap();
        assert!(adverse.profit < 0.0);
        assert!(adverse.exit_delta < adverse.entry_delta);
    }

    #[test]
    fn test_flat_move_costs_theta() {
        let sim = simulator()
            .simulate(0.0, OptionType::Call, StrikePolicy::Otm100, 1)
            .unwrap();
        assert_relative_eq!(sim.entry_premium, 105.0);
        assert_relative_eq!(sim.profit, -sim.theta_decay);
        assert_relative_eq!(sim.exit_delta, sim.entry_delta);
    }

    #[test]
    fn test_expiry_bucket_scales_entry_premium() {
        let distant = simulator()
            .simulate(0.0, OptionType::Call, StrikePolicy::Itm100, 14)
            .unwrap();
        assert_relative_eq!(distant.entry_premium, 675.0);
        assert_relative_eq!(distant.theta_decay, 20.25, epsilon = 1e-9);
    }

    #[test]
    fn test_large_adverse_move_floors_exit_premium() {
        let sim = simulator()
            .simulate(-5_000.0, OptionType::Call, StrikePolicy::Otm200, 1)
            .unwrap();
        assert_eq!(sim.exit_premium, 0.0);
        assert_relative_eq!(sim.profit, -sim.entry_premium);
        assert_relative_eq!(sim.profit_pct, -100.0);
    }

    #[test]
    fn test_non_finite_move_is_rejected() {
        for spot_move in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = simulator()
                .simulate(spot_move, OptionType::Call, StrikePolicy::Atm, 3)
                .unwrap_err();
            assert!(matches!(err, SimulationError::NonFiniteMove(_)));
        }
    }

    #[test]
    fn test_huge_adverse_move_floors_exit_premium() {
        let sim = simulator()
            .simulate(-1e15, OptionType::Call, StrikePolicy::Atm, 3)
            .unwrap();
        assert_eq!(sim.exit_premium, 0.0);
        assert_relative_eq!(sim.profit, -sim.entry_premium);
        assert_relative_eq!(sim.exit_delta, 0.01);
    }

    #[test]
    fn test_huge_favourable_move_stays_finite() {
        let sim = simulator()
            .simulate(-1e15, OptionType::Put, StrikePolicy::Otm200, 1)
            .unwrap();
        assert!(sim.profit.is_finite());
        assert!(sim.profit > 0.0);
        assert_relative_eq!(sim.exit_delta, 0.99);
        // Almost the whole move is earned at the capped delta
        assert_relative_eq!(sim.profit, 0.99e15, max_relative = 1e-6);
    }

    #[test]
    fn test_closed_form_matches_stepping() {
        let config = PremiumModelConfig::default();
        let sim = simulator();
        for &(spot_move, option_type, policy, dte) in &[
            (150.0, OptionType::Call, StrikePolicy::Atm, 3),
            (-437.5, OptionType::Call, StrikePolicy::Itm100, 1),
            (-1234.0, OptionType::Put, StrikePolicy::Otm200, 5),
            (95.0, OptionType::Put, StrikePolicy::Otm100, 12),
            (7.0, OptionType::Call, StrikePolicy::Atm, 0),
        ] {
            let cal = config.calibration_for(policy).unwrap();
            let gamma = option_gamma(cal.initial_delta, dte, config.base_gamma);
            let favourable = spot_move * option_type.sign();
            let steps = ((favourable.abs() / config.step_points) as usize).max(1);
            let step = favourable / steps as f64;
            let (mut change, mut delta) = (0.0, cal.initial_delta);
            for _ in 0..steps {
                change += delta * step;
                delta = (delta + gamma * step).clamp(config.delta_floor, config.delta_cap);
            }

            let (closed_change, closed_delta) = sim.integrate_delta(cal.initial_delta, gamma, favourable);
            assert_relative_eq!(closed_change, change, epsilon = 1e-9);
            assert_relative_eq!(closed_delta, delta, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_missing_calibration_is_an_error() {
        let mut config = PremiumModelConfig::default();
        config.calibration.remove(&StrikePolicy::Otm200);
        let sim = PremiumSimulator::new(config).unwrap();

        let err = sim
            .simulate(100.0, OptionType::Call, StrikePolicy::Otm200, 3)
            .unwrap_err();
        assert_eq!(
            err,
            SimulationError::Config(ConfigError::MissingCalibration(StrikePolicy::Otm200))
        );
    }

    #[test]
    fn test_invalid_calibration_rejected() {
        let mut config = PremiumModelConfig::default();
        config
            .calibration
            .insert(StrikePolicy::Atm, StrikeCalibration::new(1.5, 300.0));
        assert!(matches!(
            PremiumSimulator::new(config),
            Err(ConfigError::InvalidCalibration { policy: StrikePolicy::Atm, .. })
        ));

        let config = PremiumModelConfig {
            step_points: 0.0,
            ..PremiumModelConfig::default()
        };
        assert!(matches!(
            PremiumSimulator::new(config),
            Err(ConfigError::InvalidSetting { name: "step_points", .. })
        ));
    }

    fn any_policy() -> impl Strategy<Value = StrikePolicy> {
        prop::sample::select(StrikePolicy::ALL.to_vec())
    }

    fn any_option_type() -> impl Strategy<Value = OptionType> {
        prop::sample::select(vec![OptionType::Call, OptionType::Put])
    }

    proptest! {
        #[test]
        fn prop_simulation_is_deterministic(
            spot_move in -3_000.0f64..3_000.0,
            option_type in any_option_type(),
            policy in any_policy(),
            dte in 0i64..40,
        ) {
            let first = simulator().simulate(spot_move, option_type, policy, dte).unwrap();
            let second = simulator().simulate(spot_move, option_type, policy, dte).unwrap();
            prop_assert_eq!(first.profit.to_bits(), second.profit.to_bits());
            prop_assert_eq!(first.exit_premium.to_bits(), second.exit_premium.to_bits());
            prop_assert_eq!(first.exit_delta.to_bits(), second.exit_delta.to_bits());
        }

        #[test]
        fn prop_exit_premium_never_negative(
            spot_move in -1e12f64..1e12,
            option_type in any_option_type(),
            policy in any_policy(),
            dte in 0i64..40,
        ) {
            let sim = simulator().simulate(spot_move, option_type, policy, dte).unwrap();
            prop_assert!(sim.exit_premium >= 0.0);
            prop_assert!(sim.profit >= -sim.entry_premium - 1e-9);
            prop_assert!(sim.exit_delta >= 0.01 && sim.exit_delta <= 0.99);
        }
    }
}
