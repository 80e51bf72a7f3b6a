//! Early-stop probing: would stopping the recurring extra sooner keep most
//! of the saving for noticeably less money?

use std::time::Instant;

use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::grid::OptimizerSettings;
use super::scoring::{Objective, Resources};
use super::search::ScenarioOptimizer;
use crate::amortization::{LoanConfiguration, StrategyParameters};
use crate::types::{with_metadata, ComputationOutput, Money, Months};
use crate::LoanPrepayResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopProbe {
    /// Months cut from the full extra-payment run.
    pub offset: Months,
    /// Last month in which the extra is paid.
    pub stop_month: Months,
    pub savings: Money,
    pub return_ratio: Decimal,
    /// Probe savings over full-duration savings.
    pub savings_retained: Decimal,
    pub qualifies: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopAnalysis {
    pub strategy: StrategyParameters,
    pub eligible: bool,
    /// Months in which the full plan actually pays the extra.
    pub full_duration_months: Months,
    pub full_savings: Money,
    pub full_return_ratio: Decimal,
    pub probes: Vec<EarlyStopProbe>,
    /// Earliest qualifying stop, if any.
    pub recommended: Option<EarlyStopProbe>,
}

impl EarlyStopAnalysis {
    /// The strategy with the recommended stop applied.
    pub fn recommended_strategy(&self) -> Option<StrategyParameters> {
        self.recommended.as_ref().map(|probe| StrategyParameters {
            duration_cap: Some(probe.stop_month),
            ..self.strategy.clone()
        })
    }
}

impl ScenarioOptimizer {
    /// Probe earlier stop points for `strategy`'s recurring extra.
    ///
    /// A plan is probed only when it pays an extra and its savings exceed the
    /// configured share of the baseline total paid. A stop qualifies when it
    /// keeps the required share of the savings and beats the full run's
    /// return ratio.
    pub fn early_stop(&self, strategy: &StrategyParameters) -> LoanPrepayResult<EarlyStopAnalysis> {
        let settings = &self.settings().early_stop;
        let full = self.evaluate(strategy, Objective::Savings)?;
        let full_months = full.result.extra_months_applied;

        let threshold = self.baseline().total_paid * settings.min_savings_share;
        let eligible = strategy.recurring_extra > Decimal::ZERO
            && full_months > 0
            && !full.result.is_capped()
            && full.savings > threshold;

        let mut analysis = EarlyStopAnalysis {
            strategy: strategy.clone(),
            eligible,
            full_duration_months: full_months,
            full_savings: full.savings,
            full_return_ratio: full.return_ratio,
            probes: Vec::new(),
            recommended: None,
        };
        if !eligible {
            debug!(
                "early stop skipped: savings {} vs threshold {}, {} extra months",
                full.savings, threshold, full_months
            );
            return Ok(analysis);
        }

        let mut offsets = settings.offsets.clone();
        offsets.sort_unstable();
        offsets.dedup();

        for offset in offsets {
            if offset == 0 || offset >= full_months {
                continue;
            }
            let stop_month = full_months - offset;
            let probe_strategy = StrategyParameters {
                duration_cap: Some(stop_month),
                ..strategy.clone()
            };
            let probe = self.evaluate(&probe_strategy, Objective::Savings)?;

            let savings_retained = if full.savings > Decimal::ZERO {
                (probe.savings / full.savings).round_dp(4)
            } else {
                Decimal::ZERO
            };
            let qualifies = !probe.result.is_capped()
                && probe.savings >= full.savings * settings.min_savings_retained
                && probe.return_ratio > full.return_ratio;

            debug!(
                "early stop at month {}: savings {} ({}), return ratio {}, qualifies {}",
                stop_month, probe.savings, savings_retained, probe.return_ratio, qualifies
            );
            analysis.probes.push(EarlyStopProbe {
                offset,
                stop_month,
                savings: probe.savings,
                return_ratio: probe.return_ratio,
                savings_retained,
                qualifies,
            });
        }

        analysis.recommended = analysis
            .probes
            .iter()
            .filter(|p| p.qualifies)
            .min_by_key(|p| p.stop_month)
            .cloned();
        Ok(analysis)
    }
}

/// Early-stop analysis of `strategy` with default settings.
pub fn early_stop(
    config: &LoanConfiguration,
    resources: &Resources,
    strategy: &StrategyParameters,
) -> LoanPrepayResult<EarlyStopAnalysis> {
    ScenarioOptimizer::new(config.clone(), resources.clone(), OptimizerSettings::default())?
        .early_stop(strategy)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyStopInput {
    pub loan: LoanConfiguration,
    #[serde(default)]
    pub resources: Resources,
    pub strategy: StrategyParameters,
    #[serde(default)]
    pub settings: OptimizerSettings,
}

pub fn run_early_stop(input: &EarlyStopInput) -> LoanPrepayResult<ComputationOutput<EarlyStopAnalysis>> {
    let start = Instant::now();
    let optimizer = ScenarioOptimizer::new(
        input.loan.clone(),
        input.resources.clone(),
        input.settings.clone(),
    )?;
    let analysis = optimizer.early_stop(&input.strategy)?;

    let mut warnings = Vec::new();
    if !analysis.eligible {
        warnings.push("Plan not eligible for early-stop probing".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Recurring extra cut short by fixed offsets, compared on savings and return ratio",
        input,
        warnings,
        elapsed,
        analysis,
    ))
}
