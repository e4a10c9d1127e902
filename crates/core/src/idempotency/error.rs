//! Idempotency error types.

use kudi_shared::AppError;
use thiserror::Error;

/// Errors raised by the idempotency layer.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// Request carried no idempotency key.
    #[error("Idempotency key is required")]
    MissingKey,

    /// Key is empty, too long, or contains non-visible characters.
    #[error("Invalid idempotency key: {0}")]
    InvalidKey(String),

    /// A record already exists for this key and actor.
    #[error("Idempotency key {key} was already used")]
    DuplicateKey {
        /// The colliding key.
        key: String,
    },

    /// A concurrent request holds the key and its response never became visible.
    #[error("Request with idempotency key {key} is still in progress")]
    InProgress {
        /// The contended key.
        key: String,
    },

    /// Cached response could not be encoded or decoded.
    #[error("Cached response is not valid JSON: {0}")]
    Serialization(String),
}

impl IdempotencyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingKey => "IDEMPOTENCY_KEY_REQUIRED",
            Self::InvalidKey(_) => "INVALID_IDEMPOTENCY_KEY",
            Self::DuplicateKey { .. } => "DUPLICATE_IDEMPOTENCY_KEY",
            Self::InProgress { .. } => "REQUEST_IN_PROGRESS",
            Self::Serialization(_) => "CACHED_RESPONSE_INVALID",
        }
    }
}

impl From<IdempotencyError> for AppError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::MissingKey | IdempotencyError::InvalidKey(_) => {
                Self::Validation(err.to_string())
            }
            IdempotencyError::DuplicateKey { .. } | IdempotencyError::InProgress { .. } => {
                Self::Conflict(err.to_string())
            }
            IdempotencyError::Serialization(_) => Self::Internal(err.to_string()),
        }
    }
}
