use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanPrepayError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LoanPrepayError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanPrepayError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LoanPrepayError {
    fn from(e: serde_json::Error) -> Self {
        LoanPrepayError::SerializationError(e.to_string())
    }
}
