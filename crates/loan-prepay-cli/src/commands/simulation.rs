use clap::Args;
use serde_json::Value;

use loan_prepay_core::amortization::{run_simulation, LedgerMode, SimulationInput, StrategyParameters};

use super::loan::{LoanArgs, StrategyArgs};
use crate::input;

/// Arguments for simulating one prepayment plan
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Omit the month-by-month ledger
    #[arg(long)]
    pub summary_only: bool,
}

/// Arguments for the contractual schedule without prepayment
#[derive(Args)]
pub struct BaselineArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanArgs,

    /// Omit the month-by-month ledger
    #[arg(long)]
    pub summary_only: bool,
}

fn ledger_mode(summary_only: bool) -> LedgerMode {
    if summary_only {
        LedgerMode::SummaryOnly
    } else {
        LedgerMode::Full
    }
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sim_input = match input::load::<SimulationInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => SimulationInput {
            loan: args.loan.to_config()?,
            strategy: args.strategy.to_strategy(),
            ledger: ledger_mode(args.summary_only),
        },
    };
    let output = run_simulation(&sim_input)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_baseline(args: BaselineArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sim_input = match input::load::<SimulationInput>(args.input.as_deref())? {
        Some(from_json) => from_json,
        None => SimulationInput {
            loan: args.loan.to_config()?,
            strategy: StrategyParameters::none(),
            ledger: ledger_mode(args.summary_only),
        },
    };
    // A strategy in the input file is ignored for the baseline
    sim_input.strategy = StrategyParameters::none();
    let output = run_simulation(&sim_input)?;
    Ok(serde_json::to_value(output)?)
}
