//! Loan lifecycle and pricing.
//!
//! States: `pending → accepted` or `pending → rejected`. `payment_status`
//! independently tracks `not-started → in-progress → complete`.

pub mod account;
pub mod error;
pub mod pricing;
pub mod types;

#[cfg(test)]
mod account_props;

pub use error::{LoanError, MAX_DURATION_DAYS};
pub use pricing::LoanPricing;
pub use types::{
    DisbursementOverrides, DisbursementReceipt, HistoryAction, LoanAccount, LoanApplication,
    LoanCategory, LoanQuote, LoanStatus, NewLoanRequest, PaymentStatus, PenaltyRunSummary,
    RepaymentHistoryEntry, RepaymentReceipt,
};
