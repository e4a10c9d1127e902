//! Loan repository.
//!
//! Every loan mutation reads the row under lock, applies one of the named
//! `LoanAccount` transitions, then writes the row back with an optimistic
//! version check and appends the new history rows. The ledger pair and any
//! wallet change ride in the same database transaction.

use chrono::{DateTime, Utc};
use kudi_core::idempotency::IdempotencyKey;
use kudi_core::ledger::{DoubleEntryInput, EntryCategory, LedgerAccount};
use kudi_core::loan::{
    DisbursementOverrides, DisbursementReceipt, LoanAccount, LoanApplication, LoanError,
    LoanPricing, NewLoanRequest, RepaymentReceipt,
};
use kudi_core::wallet::{Wallet, WalletError};
use kudi_shared::config::LoanConfig;
use kudi_shared::types::{Currency, LoanId, Money, TraceId, UserId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use super::idempotency::IdempotencyRepository;
use super::ledger::LedgerRepository;
use super::wallet::WalletRepository;
use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::{loan_history, loans};

/// Loan repository.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    db: DatabaseConnection,
    ledger: LedgerRepository,
    idempotency: IdempotencyRepository,
    pricing: LoanPricing,
    currency: Currency,
}

impl LoanRepository {
    /// Creates a new loan repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured fees are negative.
    pub fn new(
        db: DatabaseConnection,
        idempotency: IdempotencyRepository,
        config: &LoanConfig,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            ledger: LedgerRepository::new(db.clone()),
            db,
            idempotency,
            pricing: LoanPricing::from_config(config)?,
            currency: config.currency,
        })
    }

    /// Applies for a loan.
    ///
    /// # Errors
    ///
    /// Returns `ActiveLoanExists` if the user has a pending or unpaid loan,
    /// or a validation error for the request.
    pub async fn create_loan(
        &self,
        user_id: UserId,
        request: &NewLoanRequest,
    ) -> Result<LoanApplication, RepositoryError> {
        let loan = LoanAccount::open(user_id, request, Utc::now())?;

        let txn = self.db.begin().await?;
        let existing = loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id.into_inner()))
            .lock_exclusive()
            .all(&txn)
            .await?;
        for model in existing {
            let other = convert::loan(model, Vec::new())?;
            if other.is_active() {
                return Err(LoanError::ActiveLoanExists(other.id).into());
            }
        }

        loans::ActiveModel {
            id: Set(loan.id.into_inner()),
            user_id: Set(user_id.into_inner()),
            principal: Set(loan.principal.minor()),
            outstanding: Set(loan.outstanding.minor()),
            total_repayment: Set(loan.total_repayment.minor()),
            currency: Set(self.currency.code().to_string()),
            status: Set(loan.status.into()),
            payment_status: Set(loan.payment_status.into()),
            category: Set(loan.category.into()),
            duration_days: Set(convert::duration_days(loan.duration_days)?),
            disbursed_at: Set(None),
            repayment_date: Set(None),
            last_penalty_date: Set(None),
            rejection_reason: Set(None),
            trace_id: Set(loan.trace_id.into_inner()),
            version: Set(loan.version),
            created_at: Set(loan.created_at.into()),
            updated_at: Set(loan.updated_at.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            loan_id = %loan.id,
            user_id = %user_id,
            principal = %loan.principal,
            "Loan application created"
        );
        Ok(LoanApplication {
            loan_id: loan.id,
            status: loan.status,
            trace_id: loan.trace_id,
        })
    }

    /// Disburses a pending loan into the borrower's wallet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown loan or a borrower without a wallet,
    /// and `Conflict` unless the loan is pending.
    pub async fn disburse_loan(
        &self,
        loan_id: LoanId,
        admin_id: UserId,
        overrides: DisbursementOverrides,
    ) -> Result<DisbursementReceipt, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut loan = Self::find_for_update(&txn, loan_id).await?;
        let mut wallet = WalletRepository::lock_by_user(&txn, loan.user_id)
            .await?
            .ok_or(WalletError::NotFound(loan.user_id))?;

        let recorded = loan.history.len();
        let trace_id = TraceId::new();
        let now = Utc::now();
        let quote = loan.disburse(&self.pricing, overrides, trace_id, now)?;

        self.ledger
            .create_double_entry(
                &txn,
                DoubleEntryInput::completed(
                    trace_id,
                    LedgerAccount::PlatformDisbursement,
                    LedgerAccount::UserWallet(loan.user_id),
                    quote.principal,
                    self.currency,
                    EntryCategory::Loan,
                    "disbursement",
                )
                .with_actor(admin_id)
                .with_meta(json!({
                    "loan_id": loan.id,
                    "fee": quote.fee,
                    "interest": quote.interest,
                    "total_repayment": quote.total_repayment,
                })),
            )
            .await?;
        wallet.credit(quote.principal, now)?;
        WalletRepository::save(&txn, &mut wallet).await?;
        Self::save(&txn, &mut loan, recorded).await?;
        txn.commit().await?;

        info!(
            loan_id = %loan.id,
            trace_id = %trace_id,
            total_repayment = %quote.total_repayment,
            "Loan disbursed"
        );
        Ok(DisbursementReceipt {
            loan_id: loan.id,
            trace_id,
            total_repayment: quote.total_repayment,
            repayment_date: loan.repayment_date.unwrap_or(now),
        })
    }

    /// Rejects a pending loan.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown loan, `Conflict` unless it is
    /// pending, and a validation error for a blank reason.
    pub async fn reject_loan(
        &self,
        loan_id: LoanId,
        reason: &str,
    ) -> Result<LoanAccount, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut loan = Self::find_for_update(&txn, loan_id).await?;
        let recorded = loan.history.len();
        loan.mark_rejected(reason, Utc::now())?;
        Self::save(&txn, &mut loan, recorded).await?;
        txn.commit().await?;

        info!(loan_id = %loan.id, "Loan rejected");
        Ok(loan)
    }

    /// Repays a loan from the borrower's wallet.
    ///
    /// Pays `min(amount, outstanding)`; the wallet must cover the full
    /// requested amount.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown loan, a loan of another user, or no wallet
    /// - `Conflict` unless the loan is accepted with a balance owed
    /// - `InsufficientFunds` if the wallet is short
    pub async fn repay_loan(
        &self,
        loan_id: LoanId,
        amount: Money,
        key: &IdempotencyKey,
        actor_id: UserId,
    ) -> Result<RepaymentReceipt, RepositoryError> {
        if let Some(receipt) = self.idempotency.cached(key, actor_id).await? {
            return Ok(receipt);
        }

        let txn = self.db.begin().await?;
        let mut loan = Self::find_for_update(&txn, loan_id).await?;
        if let Some(receipt) = self.idempotency.cached_in(&txn, key, actor_id).await? {
            txn.rollback().await?;
            return Ok(receipt);
        }
        if loan.user_id != actor_id {
            return Err(LoanError::LoanNotFound(loan_id).into());
        }

        let recorded = loan.history.len();
        let trace_id = TraceId::new();
        let now = Utc::now();
        let amount_paid = loan.apply_repayment(amount, trace_id, now)?;

        let mut wallet = WalletRepository::lock_by_user(&txn, actor_id)
            .await?
            .ok_or(WalletError::NotFound(actor_id))?;
        wallet.ensure_covers(amount)?;

        self.post_repayment(
            &txn,
            &loan,
            &mut wallet,
            amount_paid,
            trace_id,
            Some((actor_id, key)),
            json!({ "loan_id": loan.id }),
        )
        .await?;
        Self::save(&txn, &mut loan, recorded).await?;

        let receipt = RepaymentReceipt {
            trace_id,
            amount_paid,
            remaining_outstanding: loan.outstanding,
        };
        let receipt = self
            .idempotency
            .commit_with_response(txn, key, actor_id, receipt)
            .await?;

        info!(
            loan_id = %loan_id,
            trace_id = %receipt.trace_id,
            amount_paid = %receipt.amount_paid,
            remaining = %receipt.remaining_outstanding,
            "Loan repayment recorded"
        );
        Ok(receipt)
    }

    /// Returns a loan with its full history.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown loan.
    pub async fn get_loan(&self, loan_id: LoanId) -> Result<LoanAccount, RepositoryError> {
        let model = loans::Entity::find_by_id(loan_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(LoanError::LoanNotFound(loan_id))?;
        let history = Self::history(&self.db, loan_id).await?;
        convert::loan(model, history)
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    pub(crate) fn pricing(&self) -> &LoanPricing {
        &self.pricing
    }

    pub(crate) fn currency(&self) -> Currency {
        self.currency
    }

    /// Posts a repayment pair and debits the wallet by `amount_paid`.
    ///
    /// The caller has already applied the repayment to `loan`. `actor` is
    /// absent for system-initiated collections.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn post_repayment<C: ConnectionTrait>(
        &self,
        conn: &C,
        loan: &LoanAccount,
        wallet: &mut Wallet,
        amount_paid: Money,
        trace_id: TraceId,
        actor: Option<(UserId, &IdempotencyKey)>,
        meta: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut pair = DoubleEntryInput::completed(
            trace_id,
            LedgerAccount::UserWallet(loan.user_id),
            LedgerAccount::PlatformRevenue,
            amount_paid,
            self.currency,
            EntryCategory::Loan,
            "repayment",
        )
        .with_meta(meta);
        if let Some((actor_id, key)) = actor {
            pair = pair
                .with_actor(actor_id)
                .with_idempotency_key(Some(key.to_string()));
        }

        self.ledger.create_double_entry(conn, pair).await?;
        wallet.debit(amount_paid, Utc::now())?;
        WalletRepository::save(conn, wallet).await
    }

    /// Reads a loan and its history under a row lock.
    pub(crate) async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        loan_id: LoanId,
    ) -> Result<LoanAccount, RepositoryError> {
        let model = loans::Entity::find_by_id(loan_id.into_inner())
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or(LoanError::LoanNotFound(loan_id))?;
        let history = Self::history(conn, loan_id).await?;
        convert::loan(model, history)
    }

    /// Writes the loan back if the version still matches, appends history
    /// from index `recorded` on, then bumps the version.
    pub(crate) async fn save<C: ConnectionTrait>(
        conn: &C,
        loan: &mut LoanAccount,
        recorded: usize,
    ) -> Result<(), RepositoryError> {
        let update = loans::ActiveModel {
            principal: Set(loan.principal.minor()),
            outstanding: Set(loan.outstanding.minor()),
            total_repayment: Set(loan.total_repayment.minor()),
            status: Set(loan.status.into()),
            payment_status: Set(loan.payment_status.into()),
            duration_days: Set(convert::duration_days(loan.duration_days)?),
            disbursed_at: Set(loan.disbursed_at.map(Into::into)),
            repayment_date: Set(loan.repayment_date.map(Into::into)),
            last_penalty_date: Set(loan.last_penalty_date),
            rejection_reason: Set(loan.rejection_reason.clone()),
            trace_id: Set(loan.trace_id.into_inner()),
            version: Set(loan.version + 1),
            updated_at: Set(loan.updated_at.into()),
            ..Default::default()
        };

        let result = loans::Entity::update_many()
            .set(update)
            .filter(loans::Column::Id.eq(loan.id.into_inner()))
            .filter(loans::Column::Version.eq(loan.version))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::ConcurrentModification(format!(
                "loan {}",
                loan.id
            )));
        }

        let new_rows: Vec<loan_history::ActiveModel> = loan
            .history
            .get(recorded..)
            .unwrap_or_default()
            .iter()
            .map(|h| loan_history::ActiveModel {
                id: Set(Uuid::now_v7()),
                loan_id: Set(loan.id.into_inner()),
                sequence: Set(h.sequence),
                amount: Set(h.amount.minor()),
                resulting_outstanding: Set(h.resulting_outstanding.minor()),
                action: Set(h.action.into()),
                trace_id: Set(h.trace_id.into_inner()),
                recorded_at: Set(h.recorded_at.into()),
            })
            .collect();
        if !new_rows.is_empty() {
            loan_history::Entity::insert_many(new_rows).exec(conn).await?;
        }

        loan.version += 1;
        Ok(())
    }

    /// Ids of accepted loans with a balance owed that fell due before `now`.
    pub(crate) async fn overdue_loan_ids(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<LoanId>, RepositoryError> {
        let ids: Vec<Uuid> = loans::Entity::find()
            .select_only()
            .column(loans::Column::Id)
            .filter(loans::Column::Status.eq(db_enums::LoanStatus::Accepted))
            .filter(loans::Column::Outstanding.gt(0))
            .filter(loans::Column::RepaymentDate.lt(DateTimeWithTimeZone::from(now)))
            .order_by_asc(loans::Column::RepaymentDate)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().map(LoanId::from_uuid).collect())
    }

    async fn history<C: ConnectionTrait>(
        conn: &C,
        loan_id: LoanId,
    ) -> Result<Vec<loan_history::Model>, RepositoryError> {
        Ok(loan_history::Entity::find()
            .filter(loan_history::Column::LoanId.eq(loan_id.into_inner()))
            .order_by_asc(loan_history::Column::Sequence)
            .all(conn)
            .await?)
    }
}
