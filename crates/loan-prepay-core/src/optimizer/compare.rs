use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::grid::OptimizerSettings;
use super::scoring::{Objective, Resources, Scenario};
use super::search::ScenarioOptimizer;
use crate::amortization::{LoanConfiguration, SimulationResult, StrategyParameters};
use crate::error::LoanPrepayError;
use crate::types::{with_metadata, ComputationOutput};
use crate::LoanPrepayResult;

/// Caller-supplied strategies evaluated side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub baseline: SimulationResult,
    /// Ranked by savings, highest first.
    pub scenarios: Vec<Scenario>,
    pub best_savings: Option<Scenario>,
    pub best_return_ratio: Option<Scenario>,
}

impl ScenarioOptimizer {
    pub fn compare(
        &self,
        strategies: &[StrategyParameters],
        objective: Objective,
    ) -> LoanPrepayResult<StrategyComparison> {
        if strategies.is_empty() {
            return Err(LoanPrepayError::invalid(
                "strategies",
                "At least one strategy is required",
            ));
        }

        let mut scenarios = strategies
            .iter()
            .map(|s| self.evaluate(s, objective))
            .collect::<LoanPrepayResult<Vec<_>>>()?;
        scenarios.sort_by(|a, b| {
            b.savings
                .cmp(&a.savings)
                .then_with(|| b.return_ratio.cmp(&a.return_ratio))
        });

        let terminating = || scenarios.iter().filter(|s| !s.result.is_capped());
        let best_savings = terminating().next().cloned();
        let best_return_ratio = terminating()
            .filter(|s| s.invested > Decimal::ZERO)
            .max_by(|a, b| {
                a.return_ratio
                    .cmp(&b.return_ratio)
                    .then_with(|| a.savings.cmp(&b.savings))
            })
            .cloned();

        Ok(StrategyComparison {
            baseline: self.baseline().summary(),
            scenarios,
            best_savings,
            best_return_ratio,
        })
    }
}

/// Evaluate `strategies` against the baseline of `config`.
pub fn compare_strategies(
    config: &LoanConfiguration,
    resources: &Resources,
    strategies: &[StrategyParameters],
) -> LoanPrepayResult<StrategyComparison> {
    ScenarioOptimizer::new(config.clone(), resources.clone(), OptimizerSettings::default())?
        .compare(strategies, Objective::Savings)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInput {
    pub loan: LoanConfiguration,
    #[serde(default)]
    pub resources: Resources,
    pub strategies: Vec<StrategyParameters>,
    #[serde(default)]
    pub objective: Objective,
}

pub fn run_compare(input: &CompareInput) -> LoanPrepayResult<ComputationOutput<StrategyComparison>> {
    let start = Instant::now();
    let optimizer = ScenarioOptimizer::new(
        input.loan.clone(),
        input.resources.clone(),
        OptimizerSettings::default(),
    )?;
    let comparison = optimizer.compare(&input.strategies, input.objective)?;

    let warnings = comparison
        .scenarios
        .iter()
        .filter(|s| s.result.is_capped())
        .map(|s| format!("Strategy {:?} does not pay off within the safety cap", s.strategy))
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-strategy simulation against the contractual baseline",
        input,
        warnings,
        elapsed,
        comparison,
    ))
}
