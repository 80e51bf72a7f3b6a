//! Two-stage strategy search.
//!
//! The outer grid walks (lump sum, recurring extra) pairs in parallel; for
//! each pair an inner search picks the duration cap with the best return
//! ratio. Every simulation goes through the run's [`SimulationCache`], so
//! objective-specific passes, diversity filtering and early-stop probing
//! reuse earlier evaluations.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cache::{CacheStats, SimulationCache};
use super::early_stop::EarlyStopAnalysis;
use super::grid::{
    amount_pairs, durations_for, evaluation_count, pair_upper_bound, OptimizerSettings,
    SimilarityThresholds,
};
use super::scoring::{Objective, Resources, Scenario};
use crate::amortization::{LoanConfiguration, SimulationEngine, SimulationResult, StrategyParameters};
use crate::error::LoanPrepayError;
use crate::types::{with_metadata, ComputationOutput, Money, Months};
use crate::LoanPrepayResult;

/// Result of [`ScenarioOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationOutcome {
    /// Best plan found on the grid.
    Optimal(Scenario),
    /// Nothing to invest (or no plan terminates): the zero-effort baseline.
    NoViableScenario(Scenario),
}

impl OptimizationOutcome {
    pub fn scenario(&self) -> &Scenario {
        match self {
            OptimizationOutcome::Optimal(s) | OptimizationOutcome::NoViableScenario(s) => s,
        }
    }

    pub fn is_viable(&self) -> bool {
        matches!(self, OptimizationOutcome::Optimal(_))
    }
}

/// Searches prepayment strategies for one loan and one set of resources.
#[derive(Debug)]
pub struct ScenarioOptimizer {
    cache: SimulationCache,
    baseline: Arc<SimulationResult>,
    resources: Resources,
    settings: OptimizerSettings,
}

impl ScenarioOptimizer {
    pub fn new(
        config: LoanConfiguration,
        resources: Resources,
        settings: OptimizerSettings,
    ) -> LoanPrepayResult<Self> {
        resources.validate()?;
        settings.validate()?;
        let cache = SimulationCache::new(SimulationEngine::new(config)?);
        let baseline = cache.get_or_simulate(&StrategyParameters::none())?;
        Ok(Self {
            cache,
            baseline,
            resources,
            settings,
        })
    }

    pub fn baseline(&self) -> &SimulationResult {
        &self.baseline
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    pub fn config(&self) -> &LoanConfiguration {
        self.cache.engine().config()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Score one strategy against the baseline (cached).
    pub fn evaluate(
        &self,
        strategy: &StrategyParameters,
        objective: Objective,
    ) -> LoanPrepayResult<Scenario> {
        let result = self.cache.get_or_simulate(strategy)?;
        Ok(Scenario::evaluate(
            &result,
            &self.baseline,
            self.config().principal,
            &self.resources,
            objective,
        ))
    }

    /// The zero-effort plan as a scenario.
    pub fn baseline_scenario(&self, objective: Objective) -> Scenario {
        Scenario::evaluate(
            &self.baseline,
            &self.baseline,
            self.config().principal,
            &self.resources,
            objective,
        )
    }

    /// Amount pairs of the outer grid, checked against the evaluation bound.
    pub fn grid(&self) -> LoanPrepayResult<Vec<(Money, Money)>> {
        let bound = self.settings.max_evaluations;
        // Every pair but the skipped zero pair costs at least one simulation.
        let principal = self.config().principal;
        let upper = pair_upper_bound(&self.resources, &self.settings.resolution, principal);
        if upper.saturating_sub(1) > bound {
            warn!("grid of up to {} pairs exceeds the bound of {} simulations", upper, bound);
            return Err(evaluation_bound_error(upper.saturating_sub(1), bound));
        }

        let pairs = amount_pairs(&self.resources, &self.settings.resolution, principal);
        let needed = evaluation_count(
            &pairs,
            &self.settings.duration_candidates,
            self.baseline.term_months,
        );
        if needed > bound {
            warn!(
                "grid of {} pairs needs {} simulations, bound is {}",
                pairs.len(),
                needed,
                bound
            );
            return Err(evaluation_bound_error(needed, bound));
        }
        Ok(pairs)
    }

    /// Best scenario of every grid pair, scored for `objective`. Pairs whose
    /// recurring extra is never paid repeat the lump-only plan and are dropped.
    pub fn candidates(&self, objective: Objective) -> LoanPrepayResult<Vec<Scenario>> {
        let pairs = self.grid()?;
        let mut candidates: Vec<Scenario> = pairs
            .par_iter()
            .map(|(lump, extra)| self.best_duration(*lump, *extra, objective))
            .collect::<LoanPrepayResult<_>>()?;
        candidates.retain(|s| s.strategy.recurring_extra.is_zero() || s.result.extra_months_applied > 0);
        Ok(candidates)
    }

    /// Inner search: the duration cap maximising return ratio for one pair.
    /// Ties go to the larger saving, then to the shorter commitment. Under
    /// [`Objective::Term`] durations are ranked by score instead, since a
    /// capped extra never shortens a recalculating schedule.
    fn best_duration(&self, lump: Money, extra: Money, objective: Objective) -> LoanPrepayResult<Scenario> {
        let durations = durations_for(extra, &self.settings.duration_candidates, self.baseline.term_months);

        let mut best: Option<Scenario> = None;
        for cap in durations {
            let scenario = self.evaluate(&StrategyParameters::new(lump, extra, cap), objective)?;
            let better = match &best {
                None => true,
                Some(current) => prefer_duration(&scenario, current, objective),
            };
            if better {
                best = Some(scenario);
            }
        }

        let best = best.ok_or_else(|| {
            LoanPrepayError::InsufficientData(format!("no duration evaluated for ({lump}, {extra})"))
        })?;
        debug!(
            "pair ({}, {}): duration {:?}, return ratio {}",
            lump, extra, best.strategy.duration_cap, best.return_ratio
        );
        Ok(best)
    }

    pub fn optimize(&self, objective: Objective) -> LoanPrepayResult<OptimizationOutcome> {
        if self.resources.is_empty() {
            info!("no prepayment resources; returning baseline");
            return Ok(OptimizationOutcome::NoViableScenario(self.baseline_scenario(objective)));
        }

        let mut candidates = self.candidates(objective)?;
        rank(&mut candidates);

        let stats = self.cache.stats();
        info!(
            "optimised {:?} over {} pairs: {} simulations, {} cache hits",
            objective,
            candidates.len(),
            stats.evaluations,
            stats.hits
        );

        match candidates.into_iter().find(|s| !s.result.is_capped()) {
            Some(best) => Ok(OptimizationOutcome::Optimal(best)),
            None => {
                warn!("every candidate hit the safety cap; returning baseline");
                Ok(OptimizationOutcome::NoViableScenario(self.baseline_scenario(objective)))
            }
        }
    }

    /// Up to `n` best scenarios; with `diversify`, near-duplicates of an
    /// already accepted plan are skipped.
    pub fn top_n(&self, n: usize, objective: Objective, diversify: bool) -> LoanPrepayResult<Vec<Scenario>> {
        if n == 0 {
            return Err(LoanPrepayError::invalid("n", "Must request at least one scenario"));
        }
        if self.resources.is_empty() {
            return Ok(vec![self.baseline_scenario(objective)]);
        }

        let mut candidates = self.candidates(objective)?;
        rank(&mut candidates);

        let thresholds = &self.settings.similarity;
        let term = self.baseline.term_months;
        let mut accepted: Vec<Scenario> = Vec::with_capacity(n);
        for candidate in candidates.into_iter().filter(|s| !s.result.is_capped()) {
            if accepted.len() == n {
                break;
            }
            if diversify && accepted.iter().any(|a| are_similar(a, &candidate, thresholds, term)) {
                continue;
            }
            accepted.push(candidate);
        }
        Ok(accepted)
    }
}

fn evaluation_bound_error(needed: usize, bound: usize) -> LoanPrepayError {
    LoanPrepayError::InvalidInput {
        field: "max_evaluations".into(),
        reason: format!("Grid needs at least {needed} simulations but the bound is {bound}; use a coarser step"),
    }
}

fn prefer_duration(candidate: &Scenario, current: &Scenario, objective: Objective) -> bool {
    match (candidate.result.is_capped(), current.result.is_capped()) {
        (false, true) => return true,
        (true, false) => return false,
        _ => {}
    }
    let by_objective = match objective {
        Objective::Term => candidate.score.cmp(&current.score),
        Objective::Savings | Objective::Balanced => Ordering::Equal,
    };
    match by_objective.then_with(|| candidate.return_ratio.cmp(&current.return_ratio)) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.savings > current.savings,
    }
}

/// Highest score first; ties broken by savings, then by the smaller
/// commitment, then by amounts so the order is deterministic.
fn rank(scenarios: &mut [Scenario]) {
    scenarios.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.savings.cmp(&a.savings))
            .then_with(|| a.invested.cmp(&b.invested))
            .then_with(|| a.strategy.lump_sum.cmp(&b.strategy.lump_sum))
            .then_with(|| a.strategy.recurring_extra.cmp(&b.strategy.recurring_extra))
    });
}

fn effective_duration(strategy: &StrategyParameters, baseline_term: Months) -> Months {
    strategy.duration_cap.map_or(baseline_term, |cap| cap.min(baseline_term))
}

/// Two plans are alike when both their lump-sum and extra shares are within
/// the fraction threshold. Plans with identical amounts are told apart by
/// duration alone.
pub fn are_similar(a: &Scenario, b: &Scenario, thresholds: &SimilarityThresholds, baseline_term: Months) -> bool {
    let lump_close = (a.lump_fraction - b.lump_fraction).abs() <= thresholds.fraction;
    let extra_close = (a.extra_fraction - b.extra_fraction).abs() <= thresholds.fraction;
    if !(lump_close && extra_close) {
        return false;
    }

    let same_amounts = a.strategy.lump_sum == b.strategy.lump_sum
        && a.strategy.recurring_extra == b.strategy.recurring_extra;
    if same_amounts {
        let da = effective_duration(&a.strategy, baseline_term);
        let db = effective_duration(&b.strategy, baseline_term);
        return da.abs_diff(db) <= thresholds.duration_months;
    }
    true
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Best plan for `objective` with default settings.
pub fn optimize(
    config: &LoanConfiguration,
    resources: &Resources,
    objective: Objective,
) -> LoanPrepayResult<OptimizationOutcome> {
    ScenarioOptimizer::new(config.clone(), resources.clone(), OptimizerSettings::default())?
        .optimize(objective)
}

/// Top `n` plans for `objective` with default settings.
pub fn top_n(
    config: &LoanConfiguration,
    resources: &Resources,
    n: usize,
    objective: Objective,
    diversify: bool,
) -> LoanPrepayResult<Vec<Scenario>> {
    ScenarioOptimizer::new(config.clone(), resources.clone(), OptimizerSettings::default())?
        .top_n(n, objective, diversify)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationInput {
    pub loan: LoanConfiguration,
    pub resources: Resources,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default)]
    pub settings: OptimizerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub outcome: OptimizationOutcome,
    /// Baseline summary (no ledger).
    pub baseline: SimulationResult,
    pub grid_pairs: usize,
    pub cache: CacheStats,
    /// Early-stop probe of the winning plan, when it pays a recurring extra.
    pub early_stop: Option<EarlyStopAnalysis>,
}

/// Optimise and report the winner, the baseline and search statistics.
pub fn run_optimization(
    input: &OptimizationInput,
) -> LoanPrepayResult<ComputationOutput<OptimizationReport>> {
    let start = Instant::now();
    let optimizer = ScenarioOptimizer::new(
        input.loan.clone(),
        input.resources.clone(),
        input.settings.clone(),
    )?;

    let outcome = optimizer.optimize(input.objective)?;
    let mut warnings = Vec::new();
    if !outcome.is_viable() {
        warnings.push("No viable prepayment plan; the contractual schedule is returned".into());
    }

    let winner = outcome.scenario();
    let early_stop = if outcome.is_viable() && winner.strategy.recurring_extra > Decimal::ZERO {
        Some(optimizer.early_stop(&winner.strategy)?)
    } else {
        None
    };

    let grid_pairs = if input.resources.is_empty() {
        0
    } else {
        optimizer.grid()?.len()
    };

    let report = OptimizationReport {
        outcome,
        baseline: optimizer.baseline().summary(),
        grid_pairs,
        cache: optimizer.cache_stats(),
        early_stop,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-stage grid search over lump sum, recurring extra and duration",
        input,
        warnings,
        elapsed,
        report,
    ))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNInput {
    pub loan: LoanConfiguration,
    pub resources: Resources,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default = "default_top_n")]
    pub n: usize,
    #[serde(default = "default_diversify")]
    pub diversify: bool,
    #[serde(default)]
    pub settings: OptimizerSettings,
}

fn default_top_n() -> usize {
    3
}

fn default_diversify() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNOutput {
    pub scenarios: Vec<Scenario>,
    pub baseline: SimulationResult,
    pub cache: CacheStats,
}

pub fn run_top_n(input: &TopNInput) -> LoanPrepayResult<ComputationOutput<TopNOutput>> {
    let start = Instant::now();
    let optimizer = ScenarioOptimizer::new(
        input.loan.clone(),
        input.resources.clone(),
        input.settings.clone(),
    )?;
    let scenarios = optimizer.top_n(input.n, input.objective, input.diversify)?;

    let mut warnings = Vec::new();
    if scenarios.len() < input.n {
        warnings.push(format!(
            "Only {} distinct plan(s) found for {} requested",
            scenarios.len(),
            input.n
        ));
    }

    let output = TopNOutput {
        scenarios,
        baseline: optimizer.baseline().summary(),
        cache: optimizer.cache_stats(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Ranked grid search with diversity filter",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::AmortizationSystem;
    use rust_decimal_macros::dec;

    fn loan() -> LoanConfiguration {
        LoanConfiguration {
            principal: dec!(150000),
            annual_rate: dec!(0.10),
            term_months: 180,
            system: AmortizationSystem::FixedInstallment,
            correction_rate: dec!(0.001),
            monthly_insurance: dec!(30),
            monthly_admin_fee: dec!(25),
        }
    }

    fn resources() -> Resources {
        Resources {
            available_lump_sum: dec!(20000),
            max_recurring_extra: dec!(800),
            has_emergency_reserve: true,
            stable_employment: true,
        }
    }

    fn optimizer() -> ScenarioOptimizer {
        ScenarioOptimizer::new(loan(), resources(), OptimizerSettings::default()).unwrap()
    }

    #[test]
    fn test_baseline_goes_through_cache() {
        let opt = optimizer();
        assert_eq!(opt.cache_stats().evaluations, 1);
        assert_eq!(opt.baseline().strategy, StrategyParameters::none());
    }

    #[test]
    fn test_repeated_strategy_simulated_once() {
        let opt = optimizer();
        let strategy = StrategyParameters::new(dec!(5000), dec!(400), Some(36));
        let before = opt.cache_stats().evaluations;
        let a = opt.evaluate(&strategy, Objective::Savings).unwrap();
        let b = opt.evaluate(&strategy, Objective::Term).unwrap();
        assert_eq!(opt.cache_stats().evaluations, before + 1);
        assert_eq!(a.result, b.result);
    }

    #[test]
    fn test_second_objective_pass_is_served_from_cache() {
        let opt = optimizer();
        opt.optimize(Objective::Savings).unwrap();
        let after_first = opt.cache_stats().evaluations;
        opt.optimize(Objective::Term).unwrap();
        opt.top_n(3, Objective::Balanced, true).unwrap();
        assert_eq!(opt.cache_stats().evaluations, after_first);
        assert!(opt.cache_stats().hits > 0);
    }

    #[test]
    fn test_optimize_returns_viable_plan() {
        let outcome = optimizer().optimize(Objective::Savings).unwrap();
        assert!(outcome.is_viable());
        let best = outcome.scenario();
        assert!(best.savings > Decimal::ZERO);
        assert!(!best.strategy.is_zero_effort());
    }

    #[test]
    fn test_best_score_dominates_candidates() {
        let opt = optimizer();
        for objective in [Objective::Savings, Objective::Term, Objective::Balanced] {
            let best = opt.optimize(objective).unwrap();
            let candidates = opt.candidates(objective).unwrap();
            assert!(candidates.iter().all(|c| c.score <= best.scenario().score));
        }
    }

    #[test]
    fn test_zero_resources_degenerate_to_baseline() {
        let opt = ScenarioOptimizer::new(loan(), Resources::default(), OptimizerSettings::default()).unwrap();
        match opt.optimize(Objective::Balanced).unwrap() {
            OptimizationOutcome::NoViableScenario(s) => {
                assert!(s.strategy.is_zero_effort());
                assert_eq!(s.savings, Decimal::ZERO);
                assert_eq!(s.result, opt.baseline().summary());
            }
            other => panic!("expected NoViableScenario, got {other:?}"),
        }
        assert_eq!(opt.top_n(3, Objective::Savings, true).unwrap().len(), 1);
    }

    #[test]
    fn test_top_n_ranked_and_bounded() {
        let top = optimizer().top_n(4, Objective::Savings, false).unwrap();
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_n_diversified_plans_are_distinct() {
        let opt = optimizer();
        let thresholds = opt.settings().similarity.clone();
        let top = opt.top_n(3, Objective::Savings, true).unwrap();
        assert!(!top.is_empty());
        for (i, a) in top.iter().enumerate() {
            for b in &top[i + 1..] {
                let lump_close = (a.lump_fraction - b.lump_fraction).abs() <= thresholds.fraction;
                let extra_close = (a.extra_fraction - b.extra_fraction).abs() <= thresholds.fraction;
                assert!(!(lump_close && extra_close), "{:?} vs {:?}", a.strategy, b.strategy);
            }
        }
    }

    #[test]
    fn test_top_n_rejects_zero() {
        assert!(optimizer().top_n(0, Objective::Savings, true).is_err());
    }

    #[test]
    fn test_evaluation_bound_enforced() {
        let settings = OptimizerSettings {
            max_evaluations: 10,
            ..OptimizerSettings::default()
        };
        let opt = ScenarioOptimizer::new(loan(), resources(), settings).unwrap();
        assert!(matches!(
            opt.optimize(Objective::Savings),
            Err(LoanPrepayError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_inner_search_picks_best_return_ratio() {
        let opt = optimizer();
        let chosen = opt.best_duration(Decimal::ZERO, dec!(800), Objective::Savings).unwrap();
        for cap in durations_for(dec!(800), &opt.settings().duration_candidates, opt.baseline().term_months) {
            let s = opt
                .evaluate(&StrategyParameters::new(Decimal::ZERO, dec!(800), cap), Objective::Savings)
                .unwrap();
            assert!(s.return_ratio <= chosen.return_ratio);
        }
    }

    #[test]
    fn test_similarity_predicate() {
        let opt = optimizer();
        let a = opt.evaluate(&StrategyParameters::new(dec!(10000), dec!(400), Some(24)), Objective::Savings).unwrap();
        let near = opt.evaluate(&StrategyParameters::new(dec!(12000), dec!(480), Some(120)), Objective::Savings).unwrap();
        let far = opt.evaluate(&StrategyParameters::new(dec!(20000), dec!(400), Some(24)), Objective::Savings).unwrap();
        let same_amounts_long = opt.evaluate(&StrategyParameters::new(dec!(10000), dec!(400), Some(96)), Objective::Savings).unwrap();
        let t = SimilarityThresholds::default();
        assert!(are_similar(&a, &near, &t, 180));
        assert!(!are_similar(&a, &far, &t, 180));
        assert!(!are_similar(&a, &same_amounts_long, &t, 180));
    }

    #[test]
    fn test_run_optimization_report() {
        let input = OptimizationInput {
            loan: loan(),
            resources: resources(),
            objective: Objective::Balanced,
            settings: OptimizerSettings::default(),
        };
        let output = run_optimization(&input).unwrap();
        assert!(output.result.outcome.is_viable());
        assert_eq!(output.result.grid_pairs, 24);
        assert!(output.result.baseline.ledger.is_empty());
    }
}
