pub mod cache;
pub mod compare;
pub mod early_stop;
pub mod grid;
pub mod scoring;
pub mod search;

pub use cache::{CacheStats, SimulationCache};
pub use compare::{compare_strategies, run_compare, CompareInput, StrategyComparison};
pub use early_stop::{early_stop, run_early_stop, EarlyStopAnalysis, EarlyStopInput, EarlyStopProbe};
pub use grid::{
    amount_pairs, durations_for, evaluation_count, pair_upper_bound, EarlyStopSettings, GridResolution,
    OptimizerSettings, SimilarityThresholds, DEFAULT_DURATION_CANDIDATES, DEFAULT_MAX_EVALUATIONS,
};
pub use scoring::{viability_score, Objective, Resources, Scenario, ViabilityTier};
pub use search::{
    are_similar, optimize, run_optimization, run_top_n, top_n, OptimizationInput,
    OptimizationOutcome, OptimizationReport, ScenarioOptimizer, TopNInput, TopNOutput,
};
