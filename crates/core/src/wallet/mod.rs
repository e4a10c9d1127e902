//! Wallet balance rules.
//!
//! A wallet mirrors the user's provider-held balance. Its balance only moves
//! together with the ledger entries that justify it.

pub mod error;
pub mod types;

pub use error::WalletError;
pub use types::{FundingReceipt, TransferOutcome, TransferReceipt, TransferRequest, Wallet};
