//! Repository error type shared by every repository.

use kudi_core::idempotency::IdempotencyError;
use kudi_core::ledger::LedgerError;
use kudi_core::loan::LoanError;
use kudi_core::provider::ProviderError;
use kudi_core::wallet::WalletError;
use kudi_shared::{AppError, MoneyError};
use sea_orm::DbErr;

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Ledger rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Loan rule violated.
    #[error(transparent)]
    Loan(#[from] LoanError),

    /// Wallet rule violated.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Idempotency rule violated.
    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Money arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Optimistic version check failed.
    #[error("Concurrent modification detected for {0}, please retry")]
    ConcurrentModification(String),

    /// Row not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Stored row holds a value the domain rejects.
    #[error("Stored row could not be decoded: {0}")]
    Decode(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Ledger(e) => e.into(),
            RepositoryError::Loan(e) => e.into(),
            RepositoryError::Wallet(e) => e.into(),
            RepositoryError::Idempotency(e) => e.into(),
            RepositoryError::Provider(e) => e.into(),
            RepositoryError::Money(e) => e.into(),
            RepositoryError::ConcurrentModification(_) => Self::Conflict(err.to_string()),
            RepositoryError::NotFound(_) => Self::NotFound(err.to_string()),
            RepositoryError::Decode(_) => Self::Internal(err.to_string()),
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}
