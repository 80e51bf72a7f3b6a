use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_prepay_core::amortization::StrategyParameters;
use loan_prepay_core::optimizer::{
    run_compare, run_early_stop, run_optimization, run_top_n, CompareInput, EarlyStopInput,
    GridResolution, OptimizationInput, OptimizerSettings, TopNInput,
};

use super::loan::{parse_strategy, LoanArgs, ObjectiveArg, ResourceArgs, StrategyArgs};
use crate::input;

/// Grid tuning flags
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Lump-sum step for a fine grid (requires --extra-step)
    #[arg(long, requires = "extra_step")]
    pub lump_step: Option<Decimal>,

    /// Recurring-extra step for a fine grid (requires --lump-step)
    #[arg(long, requires = "lump_step")]
    pub extra_step: Option<Decimal>,

    /// Upper bound on simulations per run
    #[arg(long)]
    pub max_evaluations: Option<usize>,
}

impl SearchArgs {
    fn to_settings(&self) -> OptimizerSettings {
        let mut settings = OptimizerSettings::default();
        if let (Some(lump_step), Some(extra_step)) = (self.lump_step, self.extra_step) {
            settings.resolution = GridResolution::Fine { lump_step, extra_step };
        }
        if let Some(bound) = self.max_evaluations {
            settings.max_evaluations = bound;
        }
        settings
    }
}

/// Arguments for finding the best prepayment plan
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,

    /// What to optimise for
    #[arg(long, value_enum, default_value = "savings")]
    pub objective: ObjectiveArg,

    #[command(flatten)]
    pub search: SearchArgs,
}

/// Arguments for ranking several distinct plans
#[derive(Args)]
pub struct TopNArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,

    #[arg(long, value_enum, default_value = "savings")]
    pub objective: ObjectiveArg,

    /// Number of plans to return
    #[arg(short, long, default_value_t = 3)]
    pub n: usize,

    /// Keep near-duplicate plans
    #[arg(long)]
    pub no_diversify: bool,

    #[command(flatten)]
    pub search: SearchArgs,
}

/// Arguments for probing an earlier stop of the recurring extra
#[derive(Args)]
pub struct EarlyStopArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,

    #[command(flatten)]
    pub strategy: StrategyArgs,
}

/// Arguments for comparing explicit plans
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    /// Plan as lump:extra[:months]; repeat for each plan
    #[arg(long = "strategy", value_parser = parse_strategy)]
    pub strategies: Vec<StrategyParameters>,

    #[arg(long, value_enum, default_value = "savings")]
    pub objective: ObjectiveArg,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let opt_input = match input::load::<OptimizationInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => OptimizationInput {
            loan: args.loan.to_config()?,
            resources: args.resources.to_resources(),
            objective: args.objective.into(),
            settings: args.search.to_settings(),
        },
    };
    let output = run_optimization(&opt_input)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_top(args: TopNArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let top_input = match input::load::<TopNInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => TopNInput {
            loan: args.loan.to_config()?,
            resources: args.resources.to_resources(),
            objective: args.objective.into(),
            n: args.n,
            diversify: !args.no_diversify,
            settings: args.search.to_settings(),
        },
    };
    let output = run_top_n(&top_input)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_early(args: EarlyStopArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let es_input = match input::load::<EarlyStopInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => EarlyStopInput {
            loan: args.loan.to_config()?,
            resources: args.resources.to_resources(),
            strategy: args.strategy.to_strategy(),
            settings: OptimizerSettings::default(),
        },
    };
    let output = run_early_stop(&es_input)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_comparison(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cmp_input = match input::load::<CompareInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => {
            if args.strategies.is_empty() {
                return Err("at least one --strategy is required (or provide --input)".into());
            }
            CompareInput {
                loan: args.loan.to_config()?,
                resources: Default::default(),
                strategies: args.strategies,
                objective: args.objective.into(),
            }
        }
    };
    let output = run_compare(&cmp_input)?;
    Ok(serde_json::to_value(output)?)
}
