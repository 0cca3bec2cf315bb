use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioDoctorError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Matrix is not positive definite: {context}")]
    NotPositiveDefinite { context: String },

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioDoctorError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PortfolioDoctorError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the numerical failure raised by covariance factorization.
    pub fn is_numerical(&self) -> bool {
        matches!(self, PortfolioDoctorError::NotPositiveDefinite { .. })
    }
}

impl From<serde_json::Error> for PortfolioDoctorError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioDoctorError::SerializationError(e.to_string())
    }
}
