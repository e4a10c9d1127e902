//! Wallet error types.

use kudi_shared::AppError;
use kudi_shared::types::{Money, MoneyError, UserId};
use thiserror::Error;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Balance does not cover the requested amount.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available.
        available: Money,
        /// Amount requested.
        requested: Money,
    },

    /// Amount must be positive.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Provider account reference is blank.
    #[error("Provider account reference is required")]
    MissingAccountRef,

    /// Transfer destination is blank.
    #[error("Destination account is required")]
    MissingDestination,

    /// User already has a wallet.
    #[error("User {0} already has a wallet")]
    AlreadyExists(UserId),

    /// User has no wallet.
    #[error("Wallet not found for user {0}")]
    NotFound(UserId),

    /// Balance arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::MissingAccountRef => "ACCOUNT_REF_REQUIRED",
            Self::MissingDestination => "DESTINATION_REQUIRED",
            Self::AlreadyExists(_) => "WALLET_EXISTS",
            Self::NotFound(_) => "WALLET_NOT_FOUND",
            Self::Money(_) => "INVALID_AMOUNT",
        }
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds { .. } => Self::InsufficientFunds(err.to_string()),
            WalletError::ZeroAmount
            | WalletError::MissingAccountRef
            | WalletError::MissingDestination
            | WalletError::Money(_) => Self::Validation(err.to_string()),
            WalletError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            WalletError::NotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}
