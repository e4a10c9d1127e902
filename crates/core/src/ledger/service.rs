//! Ledger service for entry validation and balance checks.
//!
//! Pure rules only; persistence lives in the db crate's ledger repository.

use std::collections::BTreeMap;

use kudi_shared::types::{Money, TraceId};

use super::error::LedgerError;
use super::types::{
    DoubleEntryInput, EntryStatus, EntryType, LedgerEntry, NewLedgerEntry, TraceImbalance,
    TraceTotals,
};

/// Stateless ledger rules.
pub struct LedgerService;

impl LedgerService {
    /// Validates a single entry before it is written.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ZeroAmount` if the amount is not positive.
    pub fn validate_entry(entry: &NewLedgerEntry) -> Result<(), LedgerError> {
        if !entry.amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        Ok(())
    }

    /// Splits a double-entry input into its DEBIT and CREDIT entries.
    ///
    /// Both sides share trace, amount, currency, category, subtype, status,
    /// actor, idempotency key and metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero or both sides name the same account.
    pub fn split_double_entry(
        input: DoubleEntryInput,
    ) -> Result<(NewLedgerEntry, NewLedgerEntry), LedgerError> {
        if !input.amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        if input.debit_account == input.credit_account {
            return Err(LedgerError::SameAccount(input.debit_account.to_string()));
        }

        let debit = NewLedgerEntry {
            trace_id: input.trace_id,
            actor_id: input.actor_id,
            account: input.debit_account,
            entry_type: EntryType::Debit,
            category: input.category,
            subtype: input.subtype.clone(),
            amount: input.amount,
            currency: input.currency,
            status: input.status,
            idempotency_key: input.idempotency_key.clone(),
            meta: input.meta.clone(),
        };
        let credit = NewLedgerEntry {
            account: input.credit_account,
            entry_type: EntryType::Credit,
            subtype: input.subtype,
            idempotency_key: input.idempotency_key,
            meta: input.meta,
            ..debit.clone()
        };

        Ok((debit, credit))
    }

    /// Validates an entry status transition.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFinalized` if the entry is terminal, or
    /// `InvalidTransition` if the target is not terminal.
    pub fn transition(entry: &LedgerEntry, to: EntryStatus) -> Result<EntryStatus, LedgerError> {
        if entry.status.is_terminal() {
            return Err(LedgerError::AlreadyFinalized {
                entry_id: entry.id,
                status: entry.status,
            });
        }
        if !to.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                from: entry.status,
                to,
            });
        }
        Ok(to)
    }

    /// Groups COMPLETED `(trace, type, amount)` rows by trace and returns the
    /// traces whose debits and credits differ, ordered by trace id.
    ///
    /// Callers must pass COMPLETED rows only.
    #[must_use]
    pub fn find_imbalances<I>(rows: I) -> Vec<TraceImbalance>
    where
        I: IntoIterator<Item = (TraceId, EntryType, Money)>,
    {
        let mut totals: BTreeMap<uuid::Uuid, TraceTotals> = BTreeMap::new();

        for (trace_id, entry_type, amount) in rows {
            totals
                .entry(trace_id.into_inner())
                .or_default()
                .add(entry_type, amount);
        }

        totals
            .into_iter()
            .filter(|(_, t)| !t.is_balanced())
            .map(|(trace_id, t)| TraceImbalance {
                trace_id: TraceId::from_uuid(trace_id),
                total_debits: t.total_debits,
                total_credits: t.total_credits,
            })
            .collect()
    }
}
