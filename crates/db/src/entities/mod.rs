//! `SeaORM` entity definitions.

pub mod idempotency_keys;
pub mod ledger_entries;
pub mod loan_history;
pub mod loans;
pub mod sea_orm_active_enums;
pub mod wallets;
