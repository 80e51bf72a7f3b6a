use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::LoanPrepayError;
use crate::types::{Money, Months, Rate};
use crate::LoanPrepayResult;

/// Returned by [`periods_to_payoff`] when the loan can never be repaid with
/// the given installment.
pub const PAYOFF_SENTINEL: Months = 999;

/// Decimal places kept on a converted monthly rate.
const MONTHLY_RATE_DP: u32 = 10;

const MONEY_DP: u32 = 2;

/// Round to cents, half-up.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Equivalent monthly rate of an annual effective rate: (1 + r)^(1/12) - 1
pub fn monthly_rate_from_annual(annual_rate: Rate) -> LoanPrepayResult<Rate> {
    if annual_rate <= dec!(-1) {
        return Err(LoanPrepayError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate must be greater than -100%".into(),
        });
    }
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let one_plus_r = Decimal::ONE + annual_rate;
    let monthly_factor = one_plus_r
        .checked_powd(Decimal::ONE / dec!(12))
        .ok_or_else(|| LoanPrepayError::InvalidInput {
            field: "annual_rate".into(),
            reason: format!("Cannot convert {annual_rate} to a monthly rate"),
        })?;

    Ok((monthly_factor - Decimal::ONE)
        .round_dp_with_strategy(MONTHLY_RATE_DP, RoundingStrategy::MidpointAwayFromZero))
}

/// Level installment that repays `present_value` over `periods` at
/// `monthly_rate`, rounded to cents.
///
/// PMT = PV * r * (1 + r)^n / ((1 + r)^n - 1)
///
/// Returns zero when there is nothing to amortise or no period left, and
/// falls back to straight-line repayment at a zero rate.
pub fn fixed_installment(monthly_rate: Rate, periods: i64, present_value: Money) -> Money {
    if periods <= 0 || present_value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let n = Decimal::from(periods);
    if monthly_rate.is_zero() {
        return round_money(present_value / n);
    }

    // (1 + r)^n overflows only for absurd rate/term pairs; the payment then
    // tends to the perpetuity PV * r.
    let perpetuity = present_value * monthly_rate;
    let factor = match (Decimal::ONE + monthly_rate).checked_powi(periods) {
        Some(f) => f,
        None => return round_money(perpetuity),
    };

    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return round_money(present_value / n);
    }

    match perpetuity.checked_mul(factor) {
        Some(numerator) => round_money(numerator / denominator),
        None => round_money(perpetuity),
    }
}

/// Number of installments needed to repay `present_value` (Excel NPER).
///
/// NPER = ln(pmt / (pmt - PV * r)) / ln(1 + r), rounded up.
///
/// Never fails: any input that cannot be repaid (installment not covering
/// the accruing interest, non-positive amounts, non-finite logarithm) maps
/// to [`PAYOFF_SENTINEL`].
pub fn periods_to_payoff(monthly_rate: Rate, installment: Money, present_value: Money) -> Months {
    if installment <= Decimal::ZERO || present_value <= Decimal::ZERO || monthly_rate < Decimal::ZERO
    {
        return PAYOFF_SENTINEL;
    }

    if monthly_rate.is_zero() {
        return clamp_periods((present_value / installment).ceil());
    }

    let denominator = installment - present_value * monthly_rate;
    if denominator <= Decimal::ZERO {
        return PAYOFF_SENTINEL;
    }

    let numerator_ln = match (installment / denominator).checked_ln() {
        Some(v) => v,
        None => return PAYOFF_SENTINEL,
    };
    let denominator_ln = match (Decimal::ONE + monthly_rate).checked_ln() {
        Some(v) if !v.is_zero() => v,
        _ => return PAYOFF_SENTINEL,
    };

    clamp_periods((numerator_ln / denominator_ln).ceil())
}

fn clamp_periods(periods: Decimal) -> Months {
    match periods.to_u32() {
        Some(0) => 1,
        Some(p) if p < PAYOFF_SENTINEL => p,
        _ => PAYOFF_SENTINEL,
    }
}
