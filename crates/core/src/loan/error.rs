//! Loan error types.

use chrono::NaiveDate;
use kudi_shared::types::{LoanId, Money, MoneyError};
use kudi_shared::AppError;
use thiserror::Error;

use super::types::LoanStatus;

/// Longest term a loan may have, in days.
pub const MAX_DURATION_DAYS: u32 = 365;

/// Errors that can occur during loan operations.
#[derive(Debug, Error)]
pub enum LoanError {
    // ========== Validation Errors ==========
    /// Principal must be positive.
    #[error("Loan principal must be greater than zero")]
    InvalidPrincipal,

    /// Term outside 1..=365 days.
    #[error("Loan duration must be between 1 and {MAX_DURATION_DAYS} days, got {0}")]
    InvalidDuration(u32),

    /// Repayment amount must be positive.
    #[error("Repayment amount must be greater than zero")]
    ZeroRepayment,

    /// Rejection requires a reason.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Money arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    // ========== State Errors ==========
    /// Attempted an invalid status transition.
    #[error("Invalid loan status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: LoanStatus,
        /// Attempted target status.
        to: LoanStatus,
    },

    /// Loan is not accepted or nothing is owed.
    #[error("Loan is not repayable: status {status}, outstanding {outstanding}")]
    NotRepayable {
        /// Current status.
        status: LoanStatus,
        /// Current outstanding balance.
        outstanding: Money,
    },

    /// Loan is not past its repayment date with a balance owed.
    #[error("Loan is not overdue")]
    NotOverdue,

    /// Penalty already charged for this calendar day.
    #[error("Penalty already charged on {0}")]
    AlreadyPenalized(NaiveDate),

    /// One-time overdue fee already charged.
    #[error("Overdue fee already charged")]
    OverdueFeeAlreadyCharged,

    /// Borrower already has a pending loan or an unpaid accepted loan.
    #[error("User already has an active loan {0}")]
    ActiveLoanExists(LoanId),

    // ========== Lookup Errors ==========
    /// Loan not found.
    #[error("Loan {0} not found")]
    LoanNotFound(LoanId),
}

impl LoanError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPrincipal => "INVALID_PRINCIPAL",
            Self::InvalidDuration(_) => "INVALID_DURATION",
            Self::ZeroRepayment => "ZERO_REPAYMENT",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::Money(_) => "INVALID_AMOUNT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotRepayable { .. } => "LOAN_NOT_REPAYABLE",
            Self::NotOverdue => "LOAN_NOT_OVERDUE",
            Self::AlreadyPenalized(_) => "ALREADY_PENALIZED",
            Self::OverdueFeeAlreadyCharged => "OVERDUE_FEE_ALREADY_CHARGED",
            Self::ActiveLoanExists(_) => "ACTIVE_LOAN_EXISTS",
            Self::LoanNotFound(_) => "LOAN_NOT_FOUND",
        }
    }
}

impl From<LoanError> for AppError {
    fn from(err: LoanError) -> Self {
        match err {
            LoanError::InvalidPrincipal
            | LoanError::InvalidDuration(_)
            | LoanError::ZeroRepayment
            | LoanError::RejectionReasonRequired
            | LoanError::Money(_) => Self::Validation(err.to_string()),
            LoanError::InvalidTransition { .. }
            | LoanError::NotRepayable { .. }
            | LoanError::NotOverdue
            | LoanError::AlreadyPenalized(_)
            | LoanError::OverdueFeeAlreadyCharged
            | LoanError::ActiveLoanExists(_) => Self::Conflict(err.to_string()),
            LoanError::LoanNotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}
