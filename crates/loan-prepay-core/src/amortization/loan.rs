//! Loan terms and prepayment strategy inputs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::engine::MAX_BALANCE;
use crate::error::LoanPrepayError;
use crate::types::{Money, Months, Rate};
use crate::LoanPrepayResult;

/// Monthly monetary correction applied when none is supplied (0.15%/month).
pub const DEFAULT_CORRECTION_RATE: Rate = dec!(0.0015);

/// How the scheduled principal of each installment is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationSystem {
    /// Level payment recomputed every month over the remaining term (Price).
    #[default]
    FixedInstallment,
    /// Constant principal portion, declining installment (SAC).
    FixedPrincipal,
}

/// Terms of the financed loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanConfiguration {
    /// Outstanding principal at the start of the simulation.
    pub principal: Money,
    /// Nominal annual rate (e.g., 0.12 = 12% a.a.).
    pub annual_rate: Rate,
    /// Contractual term in months.
    pub term_months: Months,
    #[serde(default)]
    pub system: AmortizationSystem,
    /// Monetary correction index per month, applied to the balance.
    #[serde(default = "default_correction_rate")]
    pub correction_rate: Rate,
    /// Flat monthly insurance charge.
    #[serde(default)]
    pub monthly_insurance: Money,
    /// Flat monthly administration fee.
    #[serde(default)]
    pub monthly_admin_fee: Money,
}

fn default_correction_rate() -> Rate {
    DEFAULT_CORRECTION_RATE
}

impl LoanConfiguration {
    pub fn new(principal: Money, annual_rate: Rate, term_months: Months) -> Self {
        Self {
            principal,
            annual_rate,
            term_months,
            system: AmortizationSystem::default(),
            correction_rate: DEFAULT_CORRECTION_RATE,
            monthly_insurance: Decimal::ZERO,
            monthly_admin_fee: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> LoanPrepayResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "principal",
                "Principal must be positive",
            ));
        }
        if self.principal > MAX_BALANCE {
            return Err(LoanPrepayError::invalid(
                "principal",
                format!("Principal cannot exceed {MAX_BALANCE}"),
            ));
        }
        if self.annual_rate <= Decimal::ZERO || self.annual_rate >= Decimal::ONE {
            return Err(LoanPrepayError::invalid(
                "annual_rate",
                "Annual rate must be between 0 and 1 (exclusive)",
            ));
        }
        if self.term_months == 0 {
            return Err(LoanPrepayError::invalid(
                "term_months",
                "Term must be greater than zero",
            ));
        }
        if self.correction_rate < Decimal::ZERO || self.correction_rate >= Decimal::ONE {
            return Err(LoanPrepayError::invalid(
                "correction_rate",
                "Monthly correction rate must be between 0 and 1",
            ));
        }
        if self.monthly_insurance < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "monthly_insurance",
                "Insurance cannot be negative",
            ));
        }
        if self.monthly_admin_fee < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "monthly_admin_fee",
                "Admin fee cannot be negative",
            ));
        }
        let fees = self.monthly_insurance.checked_add(self.monthly_admin_fee);
        if fees.map_or(true, |f| f > MAX_BALANCE) {
            return Err(LoanPrepayError::invalid(
                "monthly_insurance",
                format!("Monthly fees cannot exceed {MAX_BALANCE}"),
            ));
        }
        Ok(())
    }
}

/// A prepayment plan: an upfront lump sum plus a recurring extra principal
/// payment for a limited number of months.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyParameters {
    #[serde(default)]
    pub lump_sum: Money,
    #[serde(default)]
    pub recurring_extra: Money,
    /// Last month (1-based) in which the recurring extra is paid.
    /// `None` keeps paying until the loan is extinguished.
    #[serde(default)]
    pub duration_cap: Option<Months>,
}

impl StrategyParameters {
    /// The zero-effort plan: contractual installments only.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(lump_sum: Money, recurring_extra: Money, duration_cap: Option<Months>) -> Self {
        Self {
            lump_sum,
            recurring_extra,
            duration_cap,
        }
    }

    pub fn is_zero_effort(&self) -> bool {
        self.lump_sum.is_zero() && self.recurring_extra.is_zero()
    }

    /// Whether the recurring extra is scheduled in `month` (1-based).
    pub fn extra_applies_in(&self, month: Months) -> bool {
        self.recurring_extra > Decimal::ZERO && self.duration_cap.map_or(true, |cap| month <= cap)
    }

    pub fn validate(&self) -> LoanPrepayResult<()> {
        if self.lump_sum < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "lump_sum",
                "Lump sum cannot be negative",
            ));
        }
        if self.recurring_extra < Decimal::ZERO {
            return Err(LoanPrepayError::invalid(
                "recurring_extra",
                "Recurring extra payment cannot be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_loan() -> LoanConfiguration {
        LoanConfiguration::new(dec!(300000), dec!(0.12), 420)
    }

    #[test]
    fn test_valid_loan_passes() {
        assert!(sample_loan().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_principal() {
        let mut loan = sample_loan();
        loan.principal = Decimal::ZERO;
        match loan.validate() {
            Err(LoanPrepayError::InvalidInput { field, .. }) => assert_eq!(field, "principal"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_rate_out_of_range() {
        let mut loan = sample_loan();
        loan.annual_rate = Decimal::ZERO;
        assert!(loan.validate().is_err());
        loan.annual_rate = Decimal::ONE;
        assert!(loan.validate().is_err());
    }

    #[test]
    fn test_rejects_principal_above_balance_ceiling() {
        let mut loan = sample_loan();
        loan.principal = MAX_BALANCE + Decimal::ONE;
        match loan.validate() {
            Err(LoanPrepayError::InvalidInput { field, .. }) => assert_eq!(field, "principal"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        loan.principal = MAX_BALANCE;
        assert!(loan.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_term() {
        let mut loan = sample_loan();
        loan.term_months = 0;
        assert!(loan.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let json = r#"{"principal": "100000", "annual_rate": "0.1", "term_months": 240}"#;
        let loan: LoanConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(loan.system, AmortizationSystem::FixedInstallment);
        assert_eq!(loan.correction_rate, DEFAULT_CORRECTION_RATE);
        assert_eq!(loan.monthly_insurance, Decimal::ZERO);
    }

    #[test]
    fn test_extra_window() {
        let s = StrategyParameters::new(Decimal::ZERO, dec!(500), Some(12));
        assert!(s.extra_applies_in(1));
        assert!(s.extra_applies_in(12));
        assert!(!s.extra_applies_in(13));

        let open_ended = StrategyParameters::new(Decimal::ZERO, dec!(500), None);
        assert!(open_ended.extra_applies_in(599));

        assert!(!StrategyParameters::none().extra_applies_in(1));
    }

    #[test]
    fn test_negative_strategy_rejected() {
        let s = StrategyParameters::new(dec!(-1), Decimal::ZERO, None);
        assert!(s.validate().is_err());
    }
}
