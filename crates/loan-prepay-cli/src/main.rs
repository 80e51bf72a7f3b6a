mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::LevelFilter;
use std::process;

use commands::optimizer::{CompareArgs, EarlyStopArgs, OptimizeArgs, TopNArgs};
use commands::simulation::{BaselineArgs, SimulateArgs};

/// Loan amortisation schedules and prepayment strategy optimisation
#[derive(Parser)]
#[command(
    name = "prepay",
    version,
    about = "Loan amortisation schedules and prepayment strategy optimisation",
    long_about = "Simulates fixed-installment and fixed-principal loans with monetary \
                  correction, and searches lump-sum / recurring-extra prepayment plans \
                  for the best savings, shortest term or a balanced trade-off."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a loan with one prepayment plan
    Simulate(SimulateArgs),
    /// Contractual schedule with no prepayment
    Baseline(BaselineArgs),
    /// Find the best prepayment plan for an objective
    Optimize(OptimizeArgs),
    /// Rank the best distinct prepayment plans
    TopN(TopNArgs),
    /// Check whether stopping the recurring extra sooner pays off
    EarlyStop(EarlyStopArgs),
    /// Compare explicit prepayment plans against the baseline
    Compare(CompareArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulation::run_simulate(args),
        Commands::Baseline(args) => commands::simulation::run_baseline(args),
        Commands::Optimize(args) => commands::optimizer::run_optimize(args),
        Commands::TopN(args) => commands::optimizer::run_top(args),
        Commands::EarlyStop(args) => commands::optimizer::run_early(args),
        Commands::Compare(args) => commands::optimizer::run_comparison(args),
        Commands::Version => {
            println!("prepay {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
