//! Month-by-month loan simulation.
//!
//! Each month accrues interest on the opening balance, amortises the
//! scheduled principal of the chosen system, applies any recurring extra
//! payment and the monetary correction, then books the installment. The
//! run ends when the balance is extinguished or the safety cap is reached.
//!
//! Correction policy: none in month 1. Afterwards an extra payment absorbs
//! the correction (only `max(0, extra - correction)` reduces the balance);
//! in a month without extra payment the correction is added to the balance.
//!
//! A balance that grows past [`MAX_BALANCE`] ends the run as capped, so
//! runaway corrections never overflow the decimal range.

use log::{debug, warn};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::loan::{AmortizationSystem, LoanConfiguration, StrategyParameters};
use super::schedule::{LedgerMode, MonthRecord, SimulationOutcome, SimulationResult};
use crate::time_value::{fixed_installment, monthly_rate_from_annual, periods_to_payoff, round_money};
use crate::types::{with_metadata, ComputationOutput, Money, Months, Rate};
use crate::LoanPrepayResult;

/// Hard stop for any simulation (50 years).
pub const MAX_SIMULATION_MONTHS: Months = 600;

/// Balance below which the loan is considered repaid.
pub const BALANCE_EPSILON: Money = dec!(0.01);

/// Ceiling on any balance the engine tracks. Principal and fees are
/// validated against it and a run stops once the balance passes it.
pub const MAX_BALANCE: Money = dec!(1000000000000000);

/// Simulator bound to one validated loan configuration.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: LoanConfiguration,
    monthly_rate: Rate,
}

impl SimulationEngine {
    pub fn new(config: LoanConfiguration) -> LoanPrepayResult<Self> {
        config.validate()?;
        let monthly_rate = monthly_rate_from_annual(config.annual_rate)?;
        Ok(Self {
            config,
            monthly_rate,
        })
    }

    pub fn config(&self) -> &LoanConfiguration {
        &self.config
    }

    pub fn monthly_rate(&self) -> Rate {
        self.monthly_rate
    }

    pub fn simulate_baseline(&self, ledger: LedgerMode) -> SimulationResult {
        self.run(&StrategyParameters::none(), ledger)
    }

    pub fn simulate(
        &self,
        strategy: &StrategyParameters,
        ledger: LedgerMode,
    ) -> LoanPrepayResult<SimulationResult> {
        strategy.validate()?;
        Ok(self.run(strategy, ledger))
    }

    /// Run without validating `strategy`.
    pub(crate) fn run(&self, strategy: &StrategyParameters, ledger_mode: LedgerMode) -> SimulationResult {
        let cfg = &self.config;
        let rate = self.monthly_rate;
        let term = i64::from(cfg.term_months);
        let fees = cfg.monthly_insurance + cfg.monthly_admin_fee;

        let lump_sum = strategy.lump_sum.min(cfg.principal);
        let mut balance = cfg.principal - lump_sum;

        let mut total_paid = lump_sum;
        let mut total_interest = Decimal::ZERO;
        let mut total_amortized = lump_sum;
        let mut total_extra = Decimal::ZERO;
        let mut total_correction_added = Decimal::ZERO;
        let mut extra_months: Months = 0;

        // FixedPrincipal: only ever revised upwards.
        let mut carried_principal = round_money(cfg.principal / Decimal::from(cfg.term_months));

        let mut ledger = match ledger_mode {
            LedgerMode::Full => Vec::with_capacity(cfg.term_months.min(MAX_SIMULATION_MONTHS) as usize),
            LedgerMode::SummaryOnly => Vec::new(),
        };

        let mut month: Months = 0;
        while balance >= BALANCE_EPSILON && month < MAX_SIMULATION_MONTHS {
            month += 1;
            let opening = balance;
            let remaining = term - i64::from(month) + 1;

            let interest = round_money(opening * rate);

            let scheduled_principal = if remaining <= 1 {
                opening
            } else {
                match cfg.system {
                    AmortizationSystem::FixedInstallment => {
                        let installment = fixed_installment(rate, remaining, opening);
                        (installment - interest).max(Decimal::ZERO)
                    }
                    AmortizationSystem::FixedPrincipal => {
                        let required = round_money(opening / Decimal::from(remaining));
                        if required > carried_principal {
                            carried_principal = required;
                        }
                        carried_principal
                    }
                }
            };
            let base_principal = scheduled_principal.min(opening);

            let after_base = opening - base_principal;

            let extra = if strategy.extra_applies_in(month) {
                strategy.recurring_extra.min(after_base)
            } else {
                Decimal::ZERO
            };

            let correction = if month == 1 {
                Decimal::ZERO
            } else {
                round_money(opening * cfg.correction_rate)
            };

            let (net_extra, correction_added) = if extra > Decimal::ZERO {
                ((extra - correction).max(Decimal::ZERO), Decimal::ZERO)
            } else if after_base > Decimal::ZERO {
                (Decimal::ZERO, correction)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };

            let (mut closing, runaway) = match after_base
                .checked_sub(net_extra)
                .and_then(|b| b.checked_add(correction_added))
            {
                Some(b) if b <= MAX_BALANCE => (b, false),
                _ => (MAX_BALANCE, true),
            };
            if closing < BALANCE_EPSILON {
                closing = Decimal::ZERO;
            }

            let base_installment = interest + base_principal;
            let total_installment = base_installment + extra + fees;

            total_paid += total_installment;
            total_interest += interest;
            total_amortized += base_principal + extra;
            total_extra += extra;
            total_correction_added += correction_added;
            if extra > Decimal::ZERO {
                extra_months += 1;
            }

            if ledger_mode == LedgerMode::Full {
                let percent_paid_off = ((cfg.principal - closing) / cfg.principal * dec!(100))
                    .max(Decimal::ZERO)
                    .round_dp(2);
                let projected_remaining_months = if closing.is_zero() {
                    0
                } else {
                    periods_to_payoff(rate, base_installment, closing)
                };

                ledger.push(MonthRecord {
                    month,
                    year: (month - 1) / 12 + 1,
                    opening_balance: opening,
                    interest,
                    base_principal,
                    extra_principal: extra,
                    correction,
                    correction_added,
                    insurance: cfg.monthly_insurance,
                    admin_fee: cfg.monthly_admin_fee,
                    base_installment,
                    total_installment,
                    closing_balance: closing,
                    cumulative_interest: total_interest,
                    cumulative_amortized: total_amortized,
                    cumulative_paid: total_paid,
                    percent_paid_off,
                    projected_remaining_months,
                });
            }

            balance = closing;
            if runaway {
                break;
            }
        }

        let outcome = if balance >= BALANCE_EPSILON {
            warn!(
                "simulation capped after {} months with balance {} (lump {}, extra {}, cap {:?})",
                month,
                balance,
                strategy.lump_sum,
                strategy.recurring_extra,
                strategy.duration_cap
            );
            SimulationOutcome::Capped
        } else {
            SimulationOutcome::Extinguished
        };

        debug!(
            "simulated {} months, total paid {}, interest {}",
            month, total_paid, total_interest
        );

        SimulationResult {
            strategy: strategy.clone(),
            outcome,
            term_months: month,
            total_paid,
            total_interest,
            total_amortized,
            total_extra_principal: total_extra,
            extra_months_applied: extra_months,
            total_correction_added,
            final_balance: balance,
            term_years: (Decimal::from(month) / dec!(12)).round_dp(2),
            average_monthly_cost: if month > 0 {
                round_money(total_paid / Decimal::from(month))
            } else {
                Decimal::ZERO
            },
            effective_annual_rate: effective_annual_rate(total_paid, cfg.principal, month),
            ledger,
        }
    }
}

fn effective_annual_rate(total_paid: Money, principal: Money, months: Months) -> Rate {
    if months == 0 || principal <= Decimal::ZERO || total_paid <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = total_paid / principal;
    let exponent = dec!(12) / Decimal::from(months);
    ratio
        .checked_powd(exponent)
        .map(|f| (f - Decimal::ONE).round_dp(6))
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `strategy` against `config`, keeping the full ledger.
pub fn simulate(
    config: &LoanConfiguration,
    strategy: &StrategyParameters,
) -> LoanPrepayResult<SimulationResult> {
    SimulationEngine::new(config.clone())?.simulate(strategy, LedgerMode::Full)
}

/// Contractual schedule with no prepayment.
pub fn simulate_baseline(config: &LoanConfiguration) -> LoanPrepayResult<SimulationResult> {
    Ok(SimulationEngine::new(config.clone())?.simulate_baseline(LedgerMode::Full))
}

/// Input for [`run_simulation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub loan: LoanConfiguration,
    #[serde(default)]
    pub strategy: StrategyParameters,
    #[serde(default)]
    pub ledger: LedgerMode,
}

/// Simulate one strategy and wrap the result with metadata and warnings.
pub fn run_simulation(
    input: &SimulationInput,
) -> LoanPrepayResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let engine = SimulationEngine::new(input.loan.clone())?;
    let result = engine.simulate(&input.strategy, input.ledger)?;

    let mut warnings = Vec::new();
    if result.is_capped() {
        warnings.push(format!(
            "Balance of {} still outstanding after the {}-month safety cap",
            result.final_balance, MAX_SIMULATION_MONTHS
        ));
    }
    if input.strategy.lump_sum > input.loan.principal {
        warnings.push(format!(
            "Lump sum {} exceeds the principal; only {} was applied",
            input.strategy.lump_sum, input.loan.principal
        ));
    }
    if input.strategy.recurring_extra > Decimal::ZERO && result.extra_months_applied == 0 {
        warnings.push("Recurring extra payment was never applied".into());
    }

    let methodology = match input.loan.system {
        AmortizationSystem::FixedInstallment => "Fixed-installment (Price) amortisation with monetary correction",
        AmortizationSystem::FixedPrincipal => "Fixed-principal (SAC) amortisation with monetary correction",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, result))
}
