use loan_prepay_core::amortization::{
    run_simulation, simulate, simulate_baseline, AmortizationSystem, LedgerMode, LoanConfiguration,
    SimulationEngine, SimulationInput, SimulationOutcome, StrategyParameters, MAX_BALANCE,
};
use loan_prepay_core::optimizer::{optimize, top_n, Objective, Resources};
use loan_prepay_core::LoanPrepayError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {expected} ± {tolerance}, got {actual} (diff {diff})"
    );
}

/// 300k at 12% a.a. over 35 years with correction and fees.
fn reference_loan() -> LoanConfiguration {
    LoanConfiguration {
        principal: dec!(300000.00),
        annual_rate: dec!(0.12),
        term_months: 420,
        system: AmortizationSystem::FixedInstallment,
        correction_rate: dec!(0.0015),
        monthly_insurance: dec!(50.00),
        monthly_admin_fee: dec!(25.00),
    }
}

// ===========================================================================
// Reference scenarios
// ===========================================================================

#[test]
fn test_reference_baseline_interest_and_term() {
    let baseline = simulate_baseline(&reference_loan()).unwrap();

    assert_eq!(baseline.outcome, SimulationOutcome::Extinguished);
    assert_eq!(baseline.term_months, 420);
    // Within 1% of 1,206,017.72
    let expected = dec!(1206017.72);
    assert_close(baseline.total_interest, expected, expected * dec!(0.01));
}

#[test]
fn test_reference_recurring_extra_reduces_cost() {
    let loan = reference_loan();
    let baseline = simulate_baseline(&loan).unwrap();
    let plan = StrategyParameters::new(Decimal::ZERO, dec!(500.00), Some(120));
    let result = simulate(&loan, &plan).unwrap();

    assert_eq!(result.outcome, SimulationOutcome::Extinguished);
    assert!(result.total_paid < baseline.total_paid);
    assert!(result.total_interest < baseline.total_interest);
    assert!(result.term_months <= baseline.term_months);
    assert_eq!(result.extra_months_applied, 120);
    assert_eq!(result.total_extra_principal, dec!(60000));
}

#[test]
fn test_ledger_totals_reconcile() {
    let loan = reference_loan();
    let plan = StrategyParameters::new(dec!(20000), dec!(300), Some(48));
    let result = simulate(&loan, &plan).unwrap();

    assert_eq!(result.ledger.len() as u32, result.term_months);
    let interest: Decimal = result.ledger.iter().map(|m| m.interest).sum();
    let installments: Decimal = result.ledger.iter().map(|m| m.total_installment).sum();
    assert_eq!(interest, result.total_interest);
    assert_eq!(installments + dec!(20000), result.total_paid);

    let last = result.ledger.last().unwrap();
    assert_eq!(last.closing_balance, Decimal::ZERO);
    assert_eq!(last.cumulative_paid + dec!(20000), result.total_paid);
    assert_eq!(last.percent_paid_off, dec!(100));
    assert_eq!(last.projected_remaining_months, 0);
}

#[test]
fn test_first_month_has_no_correction() {
    let result = simulate_baseline(&reference_loan()).unwrap();
    let first = &result.ledger[0];
    assert_eq!(first.correction, Decimal::ZERO);
    assert_eq!(first.correction_added, Decimal::ZERO);
    assert!(result.ledger[1].correction > Decimal::ZERO);
}

#[test]
fn test_fees_are_charged_every_month() {
    let result = simulate_baseline(&reference_loan()).unwrap();
    assert!(result
        .ledger
        .iter()
        .all(|m| m.total_installment == m.base_installment + m.extra_principal + dec!(75)));
}

// ===========================================================================
// Edge cases
// ===========================================================================

#[test]
fn test_lump_sum_covering_principal_ends_immediately() {
    let loan = reference_loan();
    let result = simulate(&loan, &StrategyParameters::new(dec!(500000), Decimal::ZERO, None)).unwrap();
    assert_eq!(result.term_months, 0);
    assert_eq!(result.total_paid, dec!(300000));
    assert_eq!(result.total_interest, Decimal::ZERO);
    assert!(result.ledger.is_empty());
}

#[test]
fn test_extra_larger_than_balance_pays_off_next_month() {
    let loan = LoanConfiguration::new(dec!(10000), dec!(0.10), 120);
    let result = simulate(&loan, &StrategyParameters::new(Decimal::ZERO, dec!(50000), None)).unwrap();
    assert_eq!(result.term_months, 1);
    assert_eq!(result.total_amortized, dec!(10000));
    assert_eq!(result.final_balance, Decimal::ZERO);
}

#[test]
fn test_single_month_term() {
    let loan = LoanConfiguration::new(dec!(1000), dec!(0.12), 1);
    let result = simulate_baseline(&loan).unwrap();
    assert_eq!(result.term_months, 1);
    assert_eq!(result.ledger[0].base_principal, dec!(1000));
}

#[test]
fn test_runaway_correction_is_capped_not_fatal() {
    let mut loan = reference_loan();
    loan.term_months = 720;
    loan.correction_rate = dec!(0.12);

    let baseline = simulate_baseline(&loan).unwrap();
    assert_eq!(baseline.outcome, SimulationOutcome::Capped);
    assert_eq!(baseline.final_balance, MAX_BALANCE);

    let small_effort = StrategyParameters::new(dec!(1000), Decimal::ZERO, None);
    assert!(simulate(&loan, &small_effort).unwrap().is_capped());

    let resources = Resources {
        available_lump_sum: dec!(1000),
        max_recurring_extra: dec!(100),
        ..Resources::default()
    };
    let outcome = optimize(&loan, &resources, Objective::Savings).unwrap();
    assert!(!outcome.is_viable());
    assert!(top_n(&loan, &resources, 3, Objective::Balanced, true).is_ok());
}

#[test]
fn test_runaway_correction_warns_in_envelope() {
    let mut loan = reference_loan();
    loan.term_months = 720;
    loan.correction_rate = dec!(0.12);
    let input = SimulationInput {
        loan,
        strategy: StrategyParameters::none(),
        ledger: LedgerMode::SummaryOnly,
    };
    let output = run_simulation(&input).unwrap();
    assert!(output.warnings.iter().any(|w| w.contains("correction outpaces repayment")));
}

#[test]
fn test_fixed_principal_installments_decline() {
    let mut loan = LoanConfiguration::new(dec!(120000), dec!(0.09), 120);
    loan.system = AmortizationSystem::FixedPrincipal;
    loan.correction_rate = Decimal::ZERO;
    let result = simulate_baseline(&loan).unwrap();

    assert_eq!(result.term_months, 120);
    assert!(result.ledger.iter().all(|m| m.base_principal == dec!(1000)));
    assert!(result
        .ledger
        .windows(2)
        .all(|w| w[1].base_installment <= w[0].base_installment));
}

#[test]
fn test_fixed_principal_pays_less_interest_than_fixed_installment() {
    let price = LoanConfiguration::new(dec!(200000), dec!(0.10), 240);
    let sac = LoanConfiguration {
        system: AmortizationSystem::FixedPrincipal,
        ..price.clone()
    };
    let price_run = simulate_baseline(&price).unwrap();
    let sac_run = simulate_baseline(&sac).unwrap();
    assert!(sac_run.total_interest < price_run.total_interest);
}

#[test]
fn test_summary_only_matches_full_totals() {
    let engine = SimulationEngine::new(reference_loan()).unwrap();
    let plan = StrategyParameters::new(dec!(5000), dec!(250), Some(60));
    let full = engine.simulate(&plan, LedgerMode::Full).unwrap();
    let summary = engine.simulate(&plan, LedgerMode::SummaryOnly).unwrap();
    assert!(summary.ledger.is_empty());
    assert_eq!(summary, full.summary());
}

#[test]
fn test_invalid_configuration_rejected() {
    let mut loan = reference_loan();
    loan.annual_rate = dec!(-0.05);
    match simulate_baseline(&loan) {
        Err(LoanPrepayError::InvalidInput { field, .. }) => assert_eq!(field, "annual_rate"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

// ===========================================================================
// Envelope
// ===========================================================================

#[test]
fn test_run_simulation_from_json() {
    let json = r#"{
        "loan": {
            "principal": "300000.00",
            "annual_rate": "0.12",
            "term_months": 420,
            "monthly_insurance": "50.00",
            "monthly_admin_fee": "25.00"
        },
        "strategy": { "recurring_extra": "500", "duration_cap": 120 },
        "ledger": "summary_only"
    }"#;
    let input: SimulationInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.loan, reference_loan());

    let output = run_simulation(&input).unwrap();
    assert!(output.result.ledger.is_empty());
    assert!(output.warnings.is_empty());
    assert!(output.methodology.contains("Fixed-installment"));
    assert_eq!(output.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_run_simulation_warns_on_oversized_lump_sum() {
    let input = SimulationInput {
        loan: LoanConfiguration::new(dec!(50000), dec!(0.08), 60),
        strategy: StrategyParameters::new(dec!(80000), Decimal::ZERO, None),
        ledger: LedgerMode::SummaryOnly,
    };
    let output = run_simulation(&input).unwrap();
    assert!(output.warnings.iter().any(|w| w.contains("exceeds the principal")));
}
