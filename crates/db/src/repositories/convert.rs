//! Row ↔ domain conversions.
//!
//! Stored values are re-validated on the way out; a row the domain would
//! reject surfaces as `RepositoryError::Decode`.

use chrono::{DateTime, FixedOffset, Utc};
use kudi_core::ledger::{LedgerAccount, LedgerEntry};
use kudi_core::loan::{LoanAccount, RepaymentHistoryEntry};
use kudi_core::wallet::Wallet;
use kudi_shared::types::{Currency, LedgerEntryId, LoanId, Money, TraceId, UserId, WalletId};

use super::error::RepositoryError;
use crate::entities::{ledger_entries, loan_history, loans, wallets};

pub(crate) fn money(minor: i64) -> Result<Money, RepositoryError> {
    Money::new(minor).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn currency(code: &str) -> Result<Currency, RepositoryError> {
    code.parse().map_err(RepositoryError::Decode)
}

pub(crate) fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn ledger_entry(model: ledger_entries::Model) -> Result<LedgerEntry, RepositoryError> {
    let account: LedgerAccount = model
        .account
        .parse()
        .map_err(|e: kudi_core::ledger::LedgerError| RepositoryError::Decode(e.to_string()))?;

    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        trace_id: TraceId::from_uuid(model.trace_id),
        actor_id: model.actor_id.map(UserId::from_uuid),
        account,
        entry_type: model.entry_type.into(),
        category: model.category.into(),
        subtype: model.subtype,
        amount: money(model.amount)?,
        currency: currency(&model.currency)?,
        status: model.status.into(),
        idempotency_key: model.idempotency_key,
        meta: model.meta,
        created_at: utc(model.created_at),
        processed_at: model.processed_at.map(utc),
    })
}

pub(crate) fn wallet(model: wallets::Model) -> Result<Wallet, RepositoryError> {
    Ok(Wallet {
        id: WalletId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        account_ref: model.account_ref,
        currency: currency(&model.currency)?,
        balance: money(model.balance)?,
        held: money(model.held)?,
        version: model.version,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn history_entry(
    model: loan_history::Model,
) -> Result<RepaymentHistoryEntry, RepositoryError> {
    Ok(RepaymentHistoryEntry {
        sequence: model.sequence,
        amount: money(model.amount)?,
        resulting_outstanding: money(model.resulting_outstanding)?,
        action: model.action.into(),
        trace_id: TraceId::from_uuid(model.trace_id),
        recorded_at: utc(model.recorded_at),
    })
}

/// Builds a loan from its row and its history rows (already ordered by sequence).
pub(crate) fn loan(
    model: loans::Model,
    history: Vec<loan_history::Model>,
) -> Result<LoanAccount, RepositoryError> {
    let duration_days = u32::try_from(model.duration_days)
        .map_err(|_| RepositoryError::Decode(format!("duration_days {}", model.duration_days)))?;
    let history = history
        .into_iter()
        .map(history_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoanAccount {
        id: LoanId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        principal: money(model.principal)?,
        outstanding: money(model.outstanding)?,
        total_repayment: money(model.total_repayment)?,
        status: model.status.into(),
        payment_status: model.payment_status.into(),
        category: model.category.into(),
        duration_days,
        disbursed_at: model.disbursed_at.map(utc),
        repayment_date: model.repayment_date.map(utc),
        last_penalty_date: model.last_penalty_date,
        rejection_reason: model.rejection_reason,
        trace_id: TraceId::from_uuid(model.trace_id),
        history,
        version: model.version,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn duration_days(days: u32) -> Result<i32, RepositoryError> {
    i32::try_from(days).map_err(|_| RepositoryError::Decode(format!("duration_days {days}")))
}
