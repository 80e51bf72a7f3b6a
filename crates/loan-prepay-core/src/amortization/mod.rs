pub mod engine;
pub mod loan;
pub mod schedule;

pub use engine::{
    run_simulation, simulate, simulate_baseline, SimulationEngine, SimulationInput,
    BALANCE_EPSILON, MAX_BALANCE, MAX_SIMULATION_MONTHS,
};
pub use loan::{AmortizationSystem, LoanConfiguration, StrategyParameters};
pub use schedule::{LedgerMode, MonthRecord, SimulationOutcome, SimulationResult};
