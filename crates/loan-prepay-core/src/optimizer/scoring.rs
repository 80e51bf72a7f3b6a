//! Scenario metrics, viability and objective scores.
//!
//! Score weights:
//! - savings:  `savings + return_ratio * 10_000`
//! - term:     `term_reduction * 100 + savings / 1_000`
//! - balanced: `0.4 * savings% + 0.3 * normalised return ratio + 0.3 * viability tier`,
//!   every component on a 0–100 scale. The return ratio saturates at 5x.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::{SimulationResult, StrategyParameters};
use crate::error::LoanPrepayError;
use crate::types::{Money, Months};
use crate::LoanPrepayResult;

const SAVINGS_RETURN_WEIGHT: Decimal = dec!(10000);
const TERM_MONTH_WEIGHT: Decimal = dec!(100);
const TERM_SAVINGS_DIVISOR: Decimal = dec!(1000);

const BALANCED_SAVINGS_WEIGHT: Decimal = dec!(0.4);
const BALANCED_RETURN_WEIGHT: Decimal = dec!(0.3);
const BALANCED_VIABILITY_WEIGHT: Decimal = dec!(0.3);
const RETURN_RATIO_CEILING: Decimal = dec!(5);

const HIGH_VIABILITY_MAX_SHARE: Decimal = dec!(0.30);
const MEDIUM_VIABILITY_MAX_SHARE: Decimal = dec!(0.70);

const NO_RESERVE_PENALTY: Decimal = dec!(20);
const STABLE_EMPLOYMENT_BONUS: Decimal = dec!(10);

/// What the borrower can put towards prepayment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// One-off amount available for an upfront lump sum.
    #[serde(default)]
    pub available_lump_sum: Money,
    /// Largest recurring extra payment the borrower can sustain.
    #[serde(default)]
    pub max_recurring_extra: Money,
    #[serde(default)]
    pub has_emergency_reserve: bool,
    #[serde(default)]
    pub stable_employment: bool,
}

impl Resources {
    pub fn validate(&self) -> LoanPrepayResult<()> {
        if self.available_lump_sum < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "available_lump_sum",
                "Available lump sum cannot be negative",
            ));
        }
        if self.max_recurring_extra < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "max_recurring_extra",
                "Recurring capacity cannot be negative",
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.available_lump_sum.is_zero() && self.max_recurring_extra.is_zero()
    }

    /// Part of the available lump sum a loan of `principal` can absorb.
    pub fn usable_lump_sum(&self, principal: Money) -> Money {
        self.available_lump_sum.min(principal).max(Decimal::ZERO)
    }

    /// Share of the usable lump sum applied by `amount`, in [0, 1]. Any part
    /// of `amount` above the principal is never applied and does not count.
    pub fn lump_fraction(&self, amount: Money, principal: Money) -> Decimal {
        share(amount.min(principal), self.usable_lump_sum(principal))
    }

    /// Share of the recurring capacity used by `amount`, in [0, 1].
    pub fn extra_fraction(&self, amount: Money) -> Decimal {
        share(amount, self.max_recurring_extra)
    }
}

fn share(amount: Money, available: Money) -> Decimal {
    if available <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (amount / available).clamp(Decimal::ZERO, Decimal::ONE)
}

/// Optimisation goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Maximise money saved, rewarding efficient use of prepayments.
    #[default]
    Savings,
    /// Finish the loan as early as possible.
    Term,
    /// Blend of savings, return and sustainability.
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViabilityTier {
    High,
    Medium,
    Low,
}

impl ViabilityTier {
    pub fn from_capacity_share(share: Decimal) -> Self {
        if share <= HIGH_VIABILITY_MAX_SHARE {
            ViabilityTier::High
        } else if share <= MEDIUM_VIABILITY_MAX_SHARE {
            ViabilityTier::Medium
        } else {
            ViabilityTier::Low
        }
    }

    /// Tier on a 0–100 scale for the balanced blend.
    pub fn score(self) -> Decimal {
        match self {
            ViabilityTier::High => dec!(100),
            ViabilityTier::Medium => dec!(60),
            ViabilityTier::Low => dec!(20),
        }
    }
}

/// 0–100 sustainability of a plan: lower the more of the recurring
/// capacity it consumes, penalised without an emergency reserve, rewarded
/// for stable employment.
pub fn viability_score(extra_share: Decimal, resources: &Resources) -> Decimal {
    let mut score = dec!(100) - extra_share.clamp(Decimal::ZERO, Decimal::ONE) * dec!(60);
    if !resources.has_emergency_reserve {
        score -= NO_RESERVE_PENALTY;
    }
    if resources.stable_employment {
        score += STABLE_EMPLOYMENT_BONUS;
    }
    score.clamp(Decimal::ZERO, dec!(100))
}

/// A strategy evaluated against the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub strategy: StrategyParameters,
    /// Simulation summary (no ledger).
    pub result: SimulationResult,
    pub savings: Money,
    pub term_reduction: Months,
    /// Lump sum plus every recurring extra actually paid.
    pub invested: Money,
    pub return_ratio: Decimal,
    /// Savings as a percentage of the baseline total paid.
    pub savings_pct: Decimal,
    pub lump_fraction: Decimal,
    pub extra_fraction: Decimal,
    pub viability: ViabilityTier,
    pub viability_score: Decimal,
    pub objective: Objective,
    pub score: Decimal,
}

impl Scenario {
    /// Evaluate `result` against `baseline` and score it for `objective`.
    pub fn evaluate(
        result: &SimulationResult,
        baseline: &SimulationResult,
        principal: Money,
        resources: &Resources,
        objective: Objective,
    ) -> Scenario {
        let strategy = result.strategy.clone();

        let savings = (baseline.total_paid - result.total_paid).clamp(Decimal::ZERO, baseline.total_paid);
        let term_reduction = baseline
            .term_months
            .saturating_sub(result.term_months)
            .min(baseline.term_months.saturating_sub(1));

        let lump_used = strategy.lump_sum.min(principal);
        let invested = lump_used + result.total_extra_principal;
        let return_ratio = if invested > Decimal::ZERO {
            (savings / invested).round_dp(4)
        } else {
            Decimal::ZERO
        };
        let savings_pct = if baseline.total_paid > Decimal::ZERO {
            (savings / baseline.total_paid * dec!(100)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let lump_fraction = resources.lump_fraction(strategy.lump_sum, principal);
        let extra_fraction = resources.extra_fraction(strategy.recurring_extra);
        let viability = ViabilityTier::from_capacity_share(extra_fraction);

        let mut scenario = Scenario {
            strategy,
            result: result.summary(),
            savings,
            term_reduction,
            invested,
            return_ratio,
            savings_pct,
            lump_fraction,
            extra_fraction,
            viability,
            viability_score: viability_score(extra_fraction, resources),
            objective,
            score: Decimal::ZERO,
        };
        scenario.score = scenario.score_for(objective);
        scenario
    }

    /// Composite score under `objective`. Capped runs get the worst score.
    pub fn score_for(&self, objective: Objective) -> Decimal {
        if self.result.is_capped() {
            return Decimal::MIN;
        }
        match objective {
            Objective::Savings => self.savings + self.return_ratio * SAVINGS_RETURN_WEIGHT,
            Objective::Term => {
                Decimal::from(self.term_reduction) * TERM_MONTH_WEIGHT
                    + self.savings / TERM_SAVINGS_DIVISOR
            }
            Objective::Balanced => {
                let normalised_return =
                    (self.return_ratio / RETURN_RATIO_CEILING).min(Decimal::ONE) * dec!(100);
                (BALANCED_SAVINGS_WEIGHT * self.savings_pct
                    + BALANCED_RETURN_WEIGHT * normalised_return
                    + BALANCED_VIABILITY_WEIGHT * self.viability.score())
                .round_dp(4)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::SimulationOutcome;

    fn result(strategy: StrategyParameters, term: Months, total_paid: Money, extra_months: Months) -> SimulationResult {
        SimulationResult {
            total_extra_principal: strategy.recurring_extra * Decimal::from(extra_months),
            strategy,
            outcome: SimulationOutcome::Extinguished,
            term_months: term,
            total_paid,
            total_interest: Decimal::ZERO,
            total_amortized: Decimal::ZERO,
            extra_months_applied: extra_months,
            total_correction_added: Decimal::ZERO,
            final_balance: Decimal::ZERO,
            term_years: Decimal::ZERO,
            average_monthly_cost: Decimal::ZERO,
            effective_annual_rate: Decimal::ZERO,
            ledger: Vec::new(),
        }
    }

    fn resources() -> Resources {
        Resources {
            available_lump_sum: dec!(30000),
            max_recurring_extra: dec!(1000),
            has_emergency_reserve: true,
            stable_employment: true,
        }
    }

    #[test]
    fn test_tier_bands() {
        assert_eq!(ViabilityTier::from_capacity_share(dec!(0.3)), ViabilityTier::High);
        assert_eq!(ViabilityTier::from_capacity_share(dec!(0.5)), ViabilityTier::Medium);
        assert_eq!(ViabilityTier::from_capacity_share(dec!(0.7)), ViabilityTier::Medium);
        assert_eq!(ViabilityTier::from_capacity_share(dec!(0.71)), ViabilityTier::Low);
    }

    #[test]
    fn test_viability_score_modifiers() {
        let mut r = resources();
        assert_eq!(viability_score(Decimal::ONE, &r), dec!(50));
        r.has_emergency_reserve = false;
        r.stable_employment = false;
        assert_eq!(viability_score(Decimal::ONE, &r), dec!(20));
        assert_eq!(viability_score(Decimal::ZERO, &r), dec!(80));
        r.stable_employment = true;
        r.has_emergency_reserve = true;
        assert_eq!(viability_score(Decimal::ZERO, &r), dec!(100));
    }

    #[test]
    fn test_metrics_against_baseline() {
        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let strategy = StrategyParameters::new(dec!(10000), dec!(500), Some(24));
        let run = result(strategy, 400, dec!(900000), 24);
        let s = Scenario::evaluate(&run, &baseline, dec!(300000), &resources(), Objective::Savings);

        assert_eq!(s.savings, dec!(100000));
        assert_eq!(s.term_reduction, 20);
        assert_eq!(s.invested, dec!(22000));
        assert_eq!(s.return_ratio, (dec!(100000) / dec!(22000)).round_dp(4));
        assert_eq!(s.savings_pct, dec!(10));
        assert_eq!(s.viability, ViabilityTier::Medium);
        assert_eq!(s.score, s.savings + s.return_ratio * dec!(10000));
    }

    #[test]
    fn test_savings_and_term_are_clipped() {
        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let worse = result(StrategyParameters::new(Decimal::ZERO, dec!(1), None), 430, dec!(1100000), 420);
        let s = Scenario::evaluate(&worse, &baseline, dec!(300000), &resources(), Objective::Term);
        assert_eq!(s.savings, Decimal::ZERO);
        assert_eq!(s.term_reduction, 0);

        let instant = result(StrategyParameters::new(dec!(300000), Decimal::ZERO, None), 0, dec!(300000), 0);
        let s = Scenario::evaluate(&instant, &baseline, dec!(300000), &resources(), Objective::Term);
        assert_eq!(s.term_reduction, 419);
    }

    #[test]
    fn test_zero_investment_has_zero_return() {
        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let s = Scenario::evaluate(&baseline, &baseline, dec!(300000), &resources(), Objective::Savings);
        assert_eq!(s.invested, Decimal::ZERO);
        assert_eq!(s.return_ratio, Decimal::ZERO);
    }

    #[test]
    fn test_capped_scores_worst() {
        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let mut capped = result(StrategyParameters::new(Decimal::ZERO, dec!(100), None), 600, dec!(900000), 600);
        capped.outcome = SimulationOutcome::Capped;
        let s = Scenario::evaluate(&capped, &baseline, dec!(300000), &resources(), Objective::Balanced);
        assert_eq!(s.score, Decimal::MIN);
    }

    #[test]
    fn test_balanced_blend_range() {
        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let run = result(StrategyParameters::new(Decimal::ZERO, dec!(300), None), 300, dec!(700000), 300);
        let s = Scenario::evaluate(&run, &baseline, dec!(300000), &resources(), Objective::Balanced);
        // 0.4 * 30 + 0.3 * (3.3333 / 5 * 100) + 0.3 * 100
        assert!(s.score > dec!(60) && s.score < dec!(63), "score = {}", s.score);
    }

    #[test]
    fn test_lump_fraction_ignores_amount_above_principal() {
        let rich = Resources {
            available_lump_sum: dec!(1200000),
            ..resources()
        };
        assert_eq!(rich.usable_lump_sum(dec!(300000)), dec!(300000));
        assert_eq!(rich.lump_fraction(dec!(150000), dec!(300000)), dec!(0.5));
        assert_eq!(rich.lump_fraction(dec!(900000), dec!(300000)), Decimal::ONE);

        let baseline = result(StrategyParameters::none(), 420, dec!(1000000), 0);
        let run = result(StrategyParameters::new(dec!(900000), Decimal::ZERO, None), 0, dec!(300000), 0);
        let s = Scenario::evaluate(&run, &baseline, dec!(300000), &rich, Objective::Savings);
        assert_eq!(s.invested, dec!(300000));
        assert_eq!(s.lump_fraction, Decimal::ONE);
    }

    #[test]
    fn test_fractions_with_no_resources() {
        let empty = Resources::default();
        assert!(empty.is_empty());
        assert_eq!(empty.lump_fraction(dec!(100), dec!(300000)), Decimal::ZERO);
        assert_eq!(empty.extra_fraction(dec!(100)), Decimal::ZERO);
    }
}
