//! Double-entry ledger rules.
//!
//! This module implements the core ledger functionality:
//! - Ledger entry and account types
//! - Double-entry splitting and validation
//! - Entry status transitions
//! - Per-trace balance checks used by reconciliation

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::LedgerError;
pub use service::LedgerService;
pub use types::{
    DoubleEntry, DoubleEntryInput, EntryCategory, EntryStatus, EntryType, LedgerAccount,
    LedgerEntry, NewLedgerEntry, TraceImbalance, TraceTotals,
};
