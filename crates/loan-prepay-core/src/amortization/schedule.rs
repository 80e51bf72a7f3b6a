//! Ledger rows and simulation results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::loan::StrategyParameters;
use crate::types::{Money, Months, Rate};

/// One month of the amortisation ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    /// 1-based month index.
    pub month: Months,
    /// 1-based contract year.
    pub year: Months,
    pub opening_balance: Money,
    pub interest: Money,
    /// Scheduled principal under the amortisation system.
    pub base_principal: Money,
    /// Recurring extra principal paid this month, before correction.
    pub extra_principal: Money,
    /// Monetary correction computed on the opening balance.
    pub correction: Money,
    /// Amount the correction added to the balance (zero when an extra
    /// payment absorbed it).
    pub correction_added: Money,
    pub insurance: Money,
    pub admin_fee: Money,
    /// Interest plus scheduled principal.
    pub base_installment: Money,
    /// Everything paid this month, fees and extra included.
    pub total_installment: Money,
    pub closing_balance: Money,
    pub cumulative_interest: Money,
    pub cumulative_amortized: Money,
    pub cumulative_paid: Money,
    /// Share of the original principal repaid, in percent.
    pub percent_paid_off: Decimal,
    /// Months still needed at this month's base installment.
    pub projected_remaining_months: Months,
}

/// How a simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationOutcome {
    /// Balance fell to zero.
    Extinguished,
    /// The safety cap was reached with a balance still outstanding.
    Capped,
}

/// Whether the month-by-month ledger is retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    #[default]
    Full,
    SummaryOnly,
}

/// Result of stepping one loan under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub strategy: StrategyParameters,
    pub outcome: SimulationOutcome,
    /// Months until payoff (or until the cap).
    pub term_months: Months,
    /// Installments plus the upfront lump sum.
    pub total_paid: Money,
    pub total_interest: Money,
    /// Principal repaid, lump sum included.
    pub total_amortized: Money,
    pub total_extra_principal: Money,
    /// Months in which a recurring extra payment was actually made.
    pub extra_months_applied: Months,
    /// Sum of corrections that increased the balance.
    pub total_correction_added: Money,
    /// Balance left when the simulation stopped (non-zero only if capped).
    pub final_balance: Money,
    pub term_years: Decimal,
    pub average_monthly_cost: Money,
    /// (total_paid / principal)^(12 / term) - 1
    pub effective_annual_rate: Rate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ledger: Vec<MonthRecord>,
}

impl SimulationResult {
    pub fn is_capped(&self) -> bool {
        self.outcome == SimulationOutcome::Capped
    }

    /// Copy of the result without the ledger.
    pub fn summary(&self) -> SimulationResult {
        SimulationResult {
            ledger: Vec::new(),
            ..self.clone()
        }
    }
}
