//! Core money-movement logic for Kudi.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry rules, entry lifecycle, balance checks
//! - `idempotency` - Idempotency keys and cached-response records
//! - `loan` - Loan lifecycle state machine and pricing
//! - `wallet` - Wallet balance rules
//! - `reconciliation` - Ledger health reports
//! - `provider` - Port for the external wallet/bill-payment provider

pub mod idempotency;
pub mod ledger;
pub mod loan;
pub mod provider;
pub mod reconciliation;
pub mod wallet;
