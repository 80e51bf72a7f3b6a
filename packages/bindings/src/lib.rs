use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use loan_prepay_core::amortization::{
    run_simulation, LedgerMode, LoanConfiguration, SimulationInput, StrategyParameters,
};
use loan_prepay_core::optimizer::{
    run_compare, run_early_stop, run_optimization, run_top_n, CompareInput, EarlyStopInput,
    OptimizationInput, TopNInput,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate(input_json: String) -> NapiResult<String> {
    let input: SimulationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_simulation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct BaselineRequest {
    loan: LoanConfiguration,
    #[serde(default)]
    ledger: LedgerMode,
}

#[napi]
pub fn simulate_baseline(input_json: String) -> NapiResult<String> {
    let request: BaselineRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let input = SimulationInput {
        loan: request.loan,
        strategy: StrategyParameters::none(),
        ledger: request.ledger,
    };
    let output = run_simulation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Optimisation
// ---------------------------------------------------------------------------

#[napi]
pub fn optimize(input_json: String) -> NapiResult<String> {
    let input: OptimizationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_optimization(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn top_n(input_json: String) -> NapiResult<String> {
    let input: TopNInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_top_n(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn early_stop(input_json: String) -> NapiResult<String> {
    let input: EarlyStopInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_early_stop(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_strategies(input_json: String) -> NapiResult<String> {
    let input: CompareInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_compare(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
