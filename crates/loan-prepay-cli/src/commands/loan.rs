use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use loan_prepay_core::amortization::{AmortizationSystem, LoanConfiguration, StrategyParameters};
use loan_prepay_core::optimizer::{Objective, Resources};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SystemArg {
    /// Constant installment recalculated over the remaining term (Price)
    FixedInstallment,
    /// Constant principal portion, declining installment (SAC)
    FixedPrincipal,
}

impl From<SystemArg> for AmortizationSystem {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::FixedInstallment => AmortizationSystem::FixedInstallment,
            SystemArg::FixedPrincipal => AmortizationSystem::FixedPrincipal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ObjectiveArg {
    Savings,
    Term,
    Balanced,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Savings => Objective::Savings,
            ObjectiveArg::Term => Objective::Term,
            ObjectiveArg::Balanced => Objective::Balanced,
        }
    }
}

/// Loan contract flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct LoanArgs {
    /// Outstanding principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate (0.12 or 12%)
    #[arg(long, value_parser = parse_rate)]
    pub annual_rate: Option<Decimal>,

    /// Remaining term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Amortisation system
    #[arg(long, value_enum, default_value = "fixed-installment")]
    pub system: SystemArg,

    /// Monthly monetary correction rate (0.0015 or 0.15%)
    #[arg(long, value_parser = parse_rate)]
    pub correction_rate: Option<Decimal>,

    /// Monthly insurance charge
    #[arg(long, default_value = "0")]
    pub insurance: Decimal,

    /// Monthly administration fee
    #[arg(long, default_value = "0")]
    pub admin_fee: Decimal,
}

impl LoanArgs {
    pub fn to_config(&self) -> Result<LoanConfiguration, Box<dyn std::error::Error>> {
        let mut config = LoanConfiguration::new(
            self.principal
                .ok_or("--principal is required (or provide --input)")?,
            self.annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            self.term_months
                .ok_or("--term-months is required (or provide --input)")?,
        );
        config.system = self.system.into();
        if let Some(rate) = self.correction_rate {
            config.correction_rate = rate;
        }
        config.monthly_insurance = self.insurance;
        config.monthly_admin_fee = self.admin_fee;
        Ok(config)
    }
}

/// What the borrower can put towards prepayment
#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    /// Cash available for an upfront lump sum
    #[arg(long, default_value = "0")]
    pub available_lump_sum: Decimal,

    /// Largest sustainable monthly extra payment
    #[arg(long, default_value = "0")]
    pub max_extra: Decimal,

    /// Borrower keeps an emergency reserve besides the lump sum
    #[arg(long)]
    pub emergency_reserve: bool,

    /// Borrower has stable employment income
    #[arg(long)]
    pub stable_employment: bool,
}

impl ResourceArgs {
    pub fn to_resources(&self) -> Resources {
        Resources {
            available_lump_sum: self.available_lump_sum,
            max_recurring_extra: self.max_extra,
            has_emergency_reserve: self.emergency_reserve,
            stable_employment: self.stable_employment,
        }
    }
}

/// One prepayment plan
#[derive(Args, Debug, Clone)]
pub struct StrategyArgs {
    /// Lump sum applied before the first month
    #[arg(long, default_value = "0")]
    pub lump_sum: Decimal,

    /// Recurring monthly extra payment
    #[arg(long, default_value = "0")]
    pub extra: Decimal,

    /// Months during which the extra is paid (default: until payoff)
    #[arg(long)]
    pub duration: Option<u32>,
}

impl StrategyArgs {
    pub fn to_strategy(&self) -> StrategyParameters {
        StrategyParameters::new(self.lump_sum, self.extra, self.duration)
    }
}

/// Accept a plain decimal or a percentage with a trailing `%`.
pub fn parse_rate(raw: &str) -> Result<Decimal, String> {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('%') {
        Some(pct) => pct
            .trim()
            .parse::<Decimal>()
            .map(|v| v / dec!(100))
            .map_err(|e| format!("invalid percentage '{raw}': {e}")),
        None => trimmed
            .parse::<Decimal>()
            .map_err(|e| format!("invalid rate '{raw}': {e}")),
    }
}

/// Parse `lump:extra[:months]`, e.g. `10000:500:36`.
pub fn parse_strategy(raw: &str) -> Result<StrategyParameters, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("strategy must be lump:extra[:months], got '{raw}'"));
    }
    let lump = parts[0]
        .parse::<Decimal>()
        .map_err(|e| format!("invalid lump sum '{}': {e}", parts[0]))?;
    let extra = parts[1]
        .parse::<Decimal>()
        .map_err(|e| format!("invalid extra '{}': {e}", parts[1]))?;
    let duration = match parts.get(2) {
        Some(months) if !months.is_empty() => Some(
            months
                .parse::<u32>()
                .map_err(|e| format!("invalid duration '{months}': {e}"))?,
        ),
        _ => None,
    };
    Ok(StrategyParameters::new(lump, extra, duration))
}
