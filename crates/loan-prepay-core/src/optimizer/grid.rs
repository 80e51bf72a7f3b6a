//! Strategy grid: lump-sum and recurring-extra axes plus the duration
//! candidates searched per amount pair.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::scoring::Resources;
use crate::error::LoanPrepayError;
use crate::time_value::round_money;
use crate::types::{Money, Months};
use crate::LoanPrepayResult;

/// Lump-sum shares of the available amount on the coarse grid.
pub const COARSE_LUMP_FRACTIONS: [Decimal; 5] = [dec!(0), dec!(0.25), dec!(0.50), dec!(0.75), dec!(1)];

/// Recurring-extra shares of the capacity on the coarse grid, aligned with
/// the viability bands.
pub const COARSE_EXTRA_FRACTIONS: [Decimal; 5] = [dec!(0), dec!(0.30), dec!(0.50), dec!(0.70), dec!(1)];

/// Durations (months) tried for every pair, besides "until payoff".
pub const DEFAULT_DURATION_CANDIDATES: [Months; 12] =
    [12, 24, 36, 48, 60, 72, 84, 96, 108, 120, 180, 240];

pub const DEFAULT_MAX_EVALUATIONS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridResolution {
    /// Fixed fraction sets of the available resources.
    #[default]
    Coarse,
    /// Every `*_step` increment from zero up to the available amount.
    Fine { lump_step: Money, extra_step: Money },
}

/// Diversity filter thresholds used by top-N selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityThresholds {
    /// Maximum difference in lump or extra share for two plans to count as alike.
    pub fraction: Decimal,
    /// Maximum duration gap for two plans with identical amounts to count as alike.
    pub duration_months: Months,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            fraction: dec!(0.20),
            duration_months: 24,
        }
    }
}

/// Parameters of the early-stop probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopSettings {
    /// Minimum savings, as a share of the baseline total paid, before probing.
    pub min_savings_share: Decimal,
    /// Months by which the recurring extra is cut short.
    pub offsets: Vec<Months>,
    /// Share of the full-duration savings an earlier stop must keep.
    pub min_savings_retained: Decimal,
}

impl Default for EarlyStopSettings {
    fn default() -> Self {
        Self {
            min_savings_share: dec!(0.30),
            offsets: vec![12, 24, 36, 48, 60],
            min_savings_retained: dec!(0.90),
        }
    }
}

/// Tunables of one optimisation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    #[serde(default)]
    pub resolution: GridResolution,
    #[serde(default = "default_durations")]
    pub duration_candidates: Vec<Months>,
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
    #[serde(default)]
    pub similarity: SimilarityThresholds,
    #[serde(default)]
    pub early_stop: EarlyStopSettings,
}

fn default_durations() -> Vec<Months> {
    DEFAULT_DURATION_CANDIDATES.to_vec()
}

fn default_max_evaluations() -> usize {
    DEFAULT_MAX_EVALUATIONS
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            resolution: GridResolution::Coarse,
            duration_candidates: default_durations(),
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            similarity: SimilarityThresholds::default(),
            early_stop: EarlyStopSettings::default(),
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> LoanPrepayResult<()> {
        if let GridResolution::Fine { lump_step, extra_step } = &self.resolution {
            if *lump_step <= Decimal::ZERO || *extra_step <= Decimal::ZERO {
                return Err(LoanPrepayError::invalid(
                    "resolution",
                    "Fine grid steps must be positive",
                ));
            }
        }
        if self.duration_candidates.iter().any(|d| *d == 0) {
            return Err(LoanPrepayError::invalid(
                "duration_candidates",
                "Duration candidates must be at least one month",
            ));
        }
        if self.max_evaluations == 0 {
            return Err(LoanPrepayError::invalid(
                "max_evaluations",
                "Evaluation bound must be positive",
            ));
        }
        if self.similarity.fraction < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "similarity.fraction",
                "Similarity threshold cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Amounts tried for one resource axis.
fn amount_axis(available: Money, fractions: &[Decimal], step: Option<Money>) -> Vec<Money> {
    if available <= Decimal::ZERO {
        return vec![Decimal::ZERO];
    }

    let mut values: Vec<Money> = match step {
        None => fractions.iter().map(|f| round_money(available * f)).collect(),
        Some(step) => {
            let mut values = Vec::new();
            let mut current = Decimal::ZERO;
            while current <= available {
                values.push(current);
                current += step;
            }
            // Ensure the full amount is included if the step doesn't land on it
            if values.last().map_or(true, |last| *last < available) {
                values.push(available);
            }
            values
        }
    };
    values.sort();
    values.dedup();
    values
}

/// Length of one axis, computed without building it. Exact for fine
/// steps up to the final partial step; an upper bound for coarse fractions.
fn axis_len(available: Money, fractions: &[Decimal], step: Option<Money>) -> usize {
    if available <= Decimal::ZERO {
        return 1;
    }
    match step {
        None => fractions.len(),
        Some(step) => (available / step)
            .floor()
            .to_usize()
            .map_or(usize::MAX, |n| n.saturating_add(2)),
    }
}

/// Upper bound on the number of amount pairs, so oversized fine grids can
/// be rejected before they are materialised.
pub fn pair_upper_bound(resources: &Resources, resolution: &GridResolution, principal: Money) -> usize {
    let (lump_step, extra_step) = steps(resolution);
    let lumps = axis_len(resources.usable_lump_sum(principal), &COARSE_LUMP_FRACTIONS, lump_step);
    let extras = axis_len(resources.max_recurring_extra, &COARSE_EXTRA_FRACTIONS, extra_step);
    lumps.saturating_mul(extras)
}

fn steps(resolution: &GridResolution) -> (Option<Money>, Option<Money>) {
    match resolution {
        GridResolution::Coarse => (None, None),
        GridResolution::Fine { lump_step, extra_step } => (Some(*lump_step), Some(*extra_step)),
    }
}

/// The (lump sum, recurring extra) pairs of the outer grid, zero pair
/// excluded. Lump sums never exceed `principal`; with a lump sum equal to the
/// principal nothing is left to prepay, so only the zero extra is paired
/// with it.
pub fn amount_pairs(resources: &Resources, resolution: &GridResolution, principal: Money) -> Vec<(Money, Money)> {
    let (lump_step, extra_step) = steps(resolution);
    let usable = resources.usable_lump_sum(principal);
    let lumps = amount_axis(usable, &COARSE_LUMP_FRACTIONS, lump_step);
    let extras = amount_axis(resources.max_recurring_extra, &COARSE_EXTRA_FRACTIONS, extra_step);

    lumps
        .iter()
        .flat_map(|lump| extras.iter().map(move |extra| (*lump, *extra)))
        .filter(|(lump, extra)| !(lump.is_zero() && extra.is_zero()))
        .filter(|(lump, extra)| *lump < principal || extra.is_zero())
        .collect()
}

/// Duration caps searched for a pair. Candidates at or beyond the baseline
/// term behave like "until payoff" and are folded into it.
pub fn durations_for(extra: Money, candidates: &[Months], baseline_term: Months) -> Vec<Option<Months>> {
    if extra.is_zero() {
        return vec![None];
    }
    let mut caps: Vec<Months> = candidates
        .iter()
        .copied()
        .filter(|d| *d < baseline_term)
        .collect();
    caps.sort_unstable();
    caps.dedup();

    let mut durations: Vec<Option<Months>> = caps.into_iter().map(Some).collect();
    durations.push(None);
    durations
}

/// Total simulations the grid asks for.
pub fn evaluation_count(pairs: &[(Money, Money)], candidates: &[Months], baseline_term: Months) -> usize {
    pairs
        .iter()
        .map(|(_, extra)| durations_for(*extra, candidates, baseline_term).len())
        .sum()
}
