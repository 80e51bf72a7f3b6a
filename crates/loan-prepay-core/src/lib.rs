pub mod amortization;
pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "optimizer")]
pub mod optimizer;

pub use error::LoanPrepayError;
pub use types::*;

/// Standard result type for all loan-prepay operations
pub type LoanPrepayResult<T> = Result<T, LoanPrepayError>;
