//! Ledger repository: the only writer of `ledger_entries`.
//!
//! Writes take an explicit connection so callers can post entries inside the
//! same database transaction as the balance change they justify.

use chrono::Utc;
use kudi_core::ledger::{
    DoubleEntry, DoubleEntryInput, EntryCategory, EntryStatus, EntryType, LedgerAccount,
    LedgerEntry, LedgerError, LedgerService, NewLedgerEntry, TraceImbalance,
};
use kudi_shared::types::{LedgerEntryId, Money, PageRequest, PageResponse, TraceId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use crate::entities::ledger_entries;
use crate::entities::sea_orm_active_enums as db_enums;

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a single entry.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for a non-positive amount or a database error.
    pub async fn create_entry<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, RepositoryError> {
        LedgerService::validate_entry(&entry)?;
        let now = Utc::now();
        let processed_at = entry.status.is_terminal().then(|| now.into());

        let model = ledger_entries::ActiveModel {
            id: Set(LedgerEntryId::new().into_inner()),
            trace_id: Set(entry.trace_id.into_inner()),
            actor_id: Set(entry.actor_id.map(|a| a.into_inner())),
            account: Set(entry.account.to_string()),
            entry_type: Set(entry.entry_type.into()),
            category: Set(entry.category.into()),
            subtype: Set(entry.subtype),
            amount: Set(entry.amount.minor()),
            currency: Set(entry.currency.code().to_string()),
            status: Set(entry.status.into()),
            idempotency_key: Set(entry.idempotency_key),
            meta: Set(entry.meta),
            created_at: Set(now.into()),
            processed_at: Set(processed_at),
        }
        .insert(conn)
        .await?;

        convert::ledger_entry(model)
    }

    /// Records a balanced DEBIT/CREDIT pair under one trace.
    ///
    /// This is the only sanctioned balance-affecting ledger write.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero amount, identical accounts, or a database error.
    pub async fn create_double_entry<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: DoubleEntryInput,
    ) -> Result<DoubleEntry, RepositoryError> {
        let (debit, credit) = LedgerService::split_double_entry(input)?;
        let debit = self.create_entry(conn, debit).await?;
        let credit = self.create_entry(conn, credit).await?;
        Ok(DoubleEntry { debit, credit })
    }

    /// Moves one PENDING entry to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` for an unknown id and `AlreadyFinalized` if the
    /// entry is already terminal.
    pub async fn update_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry_id: LedgerEntryId,
        status: EntryStatus,
    ) -> Result<LedgerEntry, RepositoryError> {
        let model = ledger_entries::Entity::find_by_id(entry_id.into_inner())
            .one(conn)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let entry = convert::ledger_entry(model)?;
        let status = LedgerService::transition(&entry, status)?;
        let processed_at = Utc::now();

        let result = ledger_entries::Entity::update_many()
            .col_expr(
                ledger_entries::Column::Status,
                Expr::value(db_enums::EntryStatus::from(status)),
            )
            .col_expr(
                ledger_entries::Column::ProcessedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(processed_at))),
            )
            .filter(ledger_entries::Column::Id.eq(entry_id.into_inner()))
            .filter(ledger_entries::Column::Status.eq(db_enums::EntryStatus::Pending))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(LedgerError::AlreadyFinalized {
                entry_id,
                status: entry.status,
            }
            .into());
        }

        Ok(LedgerEntry {
            status,
            processed_at: Some(processed_at),
            ..entry
        })
    }

    /// Moves every entry of a PENDING trace to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns `TraceNotFound` for an empty trace and `AlreadyFinalized` if any
    /// entry is already terminal.
    pub async fn update_trace_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        trace_id: TraceId,
        status: EntryStatus,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let entries = Self::trace_entries(conn, trace_id).await?;
        if entries.is_empty() {
            return Err(LedgerError::TraceNotFound(trace_id).into());
        }
        for entry in &entries {
            LedgerService::transition(entry, status)?;
        }

        let processed_at = Utc::now();
        let result = ledger_entries::Entity::update_many()
            .col_expr(
                ledger_entries::Column::Status,
                Expr::value(db_enums::EntryStatus::from(status)),
            )
            .col_expr(
                ledger_entries::Column::ProcessedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(processed_at))),
            )
            .filter(ledger_entries::Column::TraceId.eq(trace_id.into_inner()))
            .filter(ledger_entries::Column::Status.eq(db_enums::EntryStatus::Pending))
            .exec(conn)
            .await?;

        if result.rows_affected != u64::try_from(entries.len()).unwrap_or(u64::MAX) {
            return Err(RepositoryError::ConcurrentModification(format!("trace {trace_id}")));
        }

        Ok(entries
            .into_iter()
            .map(|e| LedgerEntry {
                status,
                processed_at: Some(processed_at),
                ..e
            })
            .collect())
    }

    /// Returns all entries of a trace in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_trace_id(
        &self,
        trace_id: TraceId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Self::trace_entries(&self.db, trace_id).await
    }

    /// Same as [`Self::get_by_trace_id`] on an explicit connection.
    pub(crate) async fn trace_entries<C: ConnectionTrait>(
        conn: &C,
        trace_id: TraceId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TraceId.eq(trace_id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(conn)
            .await?
            .into_iter()
            .map(convert::ledger_entry)
            .collect()
    }

    /// Returns the entries recorded under an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Self::key_entries(&self.db, key).await
    }

    /// Same as [`Self::find_by_idempotency_key`] on an explicit connection.
    pub(crate) async fn key_entries<C: ConnectionTrait>(
        conn: &C,
        key: &str,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::IdempotencyKey.eq(key))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(conn)
            .await?
            .into_iter()
            .map(convert::ledger_entry)
            .collect()
    }

    /// Lists an account's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_account(
        &self,
        account: &LedgerAccount,
        category: Option<EntryCategory>,
        page: &PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, RepositoryError> {
        let page = page.normalized();
        let mut query = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::Account.eq(account.to_string()));
        if let Some(category) = category {
            query = query.filter(
                ledger_entries::Column::Category.eq(db_enums::EntryCategory::from(category)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let entries = query
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::ledger_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(entries, page.page, page.per_page, total))
    }

    /// Returns every trace whose COMPLETED debits and credits differ.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_inconsistencies(&self) -> Result<Vec<TraceImbalance>, RepositoryError> {
        let rows: Vec<(Uuid, db_enums::EntryType, i64)> = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::TraceId)
            .column(ledger_entries::Column::EntryType)
            .column(ledger_entries::Column::Amount)
            .filter(ledger_entries::Column::Status.eq(db_enums::EntryStatus::Completed))
            .into_tuple()
            .all(&self.db)
            .await?;

        let rows = rows
            .into_iter()
            .map(|(trace_id, entry_type, amount)| {
                Ok((
                    TraceId::from_uuid(trace_id),
                    EntryType::from(entry_type),
                    convert::money(amount)?,
                ))
            })
            .collect::<Result<Vec<(TraceId, EntryType, Money)>, RepositoryError>>()?;

        Ok(LedgerService::find_imbalances(rows))
    }
}
