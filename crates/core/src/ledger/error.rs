//! Ledger error types.

use kudi_shared::AppError;
use kudi_shared::types::{LedgerEntryId, TraceId};
use thiserror::Error;

use super::types::EntryStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry amount must be a positive number of minor units.
    #[error("Entry amount must be greater than zero")]
    ZeroAmount,

    /// Both sides of a double entry name the same account.
    #[error("Debit and credit accounts must differ, both were {0}")]
    SameAccount(String),

    /// Account string is not a known ledger account.
    #[error("Unknown ledger account: {0}")]
    InvalidAccount(String),

    // ========== State Errors ==========
    /// Entry already reached COMPLETED or FAILED.
    #[error("Ledger entry {entry_id} is already {status}")]
    AlreadyFinalized {
        /// The entry.
        entry_id: LedgerEntryId,
        /// Its terminal status.
        status: EntryStatus,
    },

    /// Requested transition is not PENDING to a terminal status.
    #[error("Invalid entry status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: EntryStatus,
        /// Requested status.
        to: EntryStatus,
    },

    // ========== Lookup Errors ==========
    /// Entry not found.
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(LedgerEntryId),

    /// No entries recorded under the trace.
    #[error("No ledger entries for trace {0}")]
    TraceNotFound(TraceId),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::SameAccount(_) => "SAME_ACCOUNT",
            Self::InvalidAccount(_) => "INVALID_ACCOUNT",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::TraceNotFound(_) => "TRACE_NOT_FOUND",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ZeroAmount
            | LedgerError::SameAccount(_)
            | LedgerError::InvalidAccount(_) => Self::Validation(err.to_string()),
            LedgerError::AlreadyFinalized { .. } | LedgerError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            LedgerError::EntryNotFound(_) | LedgerError::TraceNotFound(_) => {
                Self::NotFound(err.to_string())
            }
        }
    }
}
