//! Application-wide error types.
//!
//! Every layer converts its own errors into `AppError` at the boundary, so
//! callers always see one of these stable kinds.

use thiserror::Error;

use crate::types::MoneyError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller identity is missing or malformed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate in-flight request or invalid state transition.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business-rule rejection: not enough money to cover the request.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Outbound provider call returned non-success or timed out.
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// Ledger imbalance detected by reconciliation.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::InsufficientFunds(_) => 422,
            Self::ProviderFailure(_) => 502,
            Self::InvariantViolation(_) | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::ProviderFailure(_) => "PROVIDER_FAILURE",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to API callers.
    ///
    /// Database and internal details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ProviderFailure(_) => {
                "The payment provider could not complete the request".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
