//! Wallet repository and provider-backed transfers.
//!
//! The wallet balance only changes inside the same database transaction as
//! the ledger pair that justifies it.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use kudi_core::idempotency::{IdempotencyError, IdempotencyKey};
use kudi_core::ledger::{
    DoubleEntryInput, EntryCategory, EntryStatus, EntryType, LedgerAccount, LedgerEntry,
    LedgerError,
};
use kudi_core::provider::{ProviderClient, ProviderError, ProviderTransfer};
use kudi_core::wallet::{
    FundingReceipt, TransferOutcome, TransferReceipt, TransferRequest, Wallet, WalletError,
};
use kudi_shared::config::ProviderConfig;
use kudi_shared::types::{Currency, Money, TraceId, UserId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde_json::json;
use tracing::{error, info, warn};

use super::convert;
use super::error::RepositoryError;
use super::idempotency::IdempotencyRepository;
use super::ledger::LedgerRepository;
use crate::entities::wallets;

/// Wallet repository.
#[derive(Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
    ledger: LedgerRepository,
    idempotency: IdempotencyRepository,
    provider: Arc<dyn ProviderClient>,
    provider_timeout: StdDuration,
    success_code: String,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        idempotency: IdempotencyRepository,
        provider: Arc<dyn ProviderClient>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            ledger: LedgerRepository::new(db.clone()),
            db,
            idempotency,
            provider,
            provider_timeout: StdDuration::from_millis(config.timeout_ms),
            success_code: config.success_code.clone(),
        }
    }

    /// Opens the user's wallet.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the user already has one.
    pub async fn open_wallet(
        &self,
        user_id: UserId,
        account_ref: &str,
        currency: Currency,
    ) -> Result<Wallet, RepositoryError> {
        let wallet = Wallet::open(user_id, account_ref, currency, Utc::now())?;

        let insert = wallets::ActiveModel {
            id: Set(wallet.id.into_inner()),
            user_id: Set(user_id.into_inner()),
            account_ref: Set(wallet.account_ref.clone()),
            currency: Set(currency.code().to_string()),
            balance: Set(wallet.balance.minor()),
            held: Set(wallet.held.minor()),
            version: Set(wallet.version),
            created_at: Set(wallet.created_at.into()),
            updated_at: Set(wallet.updated_at.into()),
        }
        .insert(&self.db)
        .await;

        match insert {
            Ok(_) => {
                info!(user_id = %user_id, wallet_id = %wallet.id, "Wallet opened");
                Ok(wallet)
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(WalletError::AlreadyExists(user_id).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the user's wallet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user has no wallet.
    pub async fn get_wallet(&self, user_id: UserId) -> Result<Wallet, RepositoryError> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id.into_inner()))
            .one(&self.db)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;
        convert::wallet(model)
    }

    /// Credits the wallet from the settlement account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` without a wallet, or a validation error for a zero amount.
    pub async fn fund_wallet(
        &self,
        user_id: UserId,
        amount: Money,
        key: &IdempotencyKey,
    ) -> Result<FundingReceipt, RepositoryError> {
        if let Some(receipt) = self.idempotency.cached(key, user_id).await? {
            return Ok(receipt);
        }

        let txn = self.db.begin().await?;
        let mut wallet = Self::lock_by_user(&txn, user_id)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;
        if let Some(receipt) = self.idempotency.cached_in(&txn, key, user_id).await? {
            txn.rollback().await?;
            return Ok(receipt);
        }

        let trace_id = TraceId::new();
        let now = Utc::now();
        wallet.credit(amount, now)?;
        self.ledger
            .create_double_entry(
                &txn,
                DoubleEntryInput::completed(
                    trace_id,
                    LedgerAccount::Settlement,
                    LedgerAccount::UserWallet(user_id),
                    amount,
                    wallet.currency,
                    EntryCategory::Settlement,
                    "funding",
                )
                .with_actor(user_id)
                .with_idempotency_key(Some(key.to_string())),
            )
            .await?;
        Self::save(&txn, &mut wallet).await?;

        let receipt = FundingReceipt {
            trace_id,
            amount,
            balance: wallet.balance,
        };
        let receipt = self
            .idempotency
            .commit_with_response(txn, key, user_id, receipt)
            .await?;

        info!(user_id = %user_id, trace_id = %receipt.trace_id, amount = %amount, "Wallet funded");
        Ok(receipt)
    }

    /// Sends money from the wallet to an external account through the provider.
    ///
    /// The amount is put on hold and a PENDING ledger pair is written under
    /// the wallet lock before the provider is called. Success settles the
    /// hold and completes the pair. A decline releases the hold and marks the
    /// pair FAILED. An unknown outcome keeps both for requery.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a transfer under the same key is still pending
    /// - `InsufficientFunds` if the provider or available balance is short
    /// - `ProviderFailure` on a decline, timeout, or transport error
    pub async fn transfer_funds(
        &self,
        user_id: UserId,
        request: TransferRequest,
        key: &IdempotencyKey,
    ) -> Result<TransferReceipt, RepositoryError> {
        request.validate()?;
        if let Some(receipt) = self.idempotency.cached(key, user_id).await? {
            return Ok(receipt);
        }

        let txn = self.db.begin().await?;
        let mut wallet = Self::lock_by_user(&txn, user_id)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;
        if let Some(receipt) = self.idempotency.cached_in(&txn, key, user_id).await? {
            txn.rollback().await?;
            return Ok(receipt);
        }
        let in_flight = LedgerRepository::key_entries(&txn, key.as_str())
            .await?
            .into_iter()
            .any(|e| e.status == EntryStatus::Pending && e.actor_id == Some(user_id));
        if in_flight {
            return Err(IdempotencyError::InProgress {
                key: key.to_string(),
            }
            .into());
        }

        let enquiry = self
            .call_provider(self.provider.account_enquiry(&wallet.account_ref))
            .await?;
        if enquiry.balance < request.amount {
            return Err(WalletError::InsufficientFunds {
                available: enquiry.balance,
                requested: request.amount,
            }
            .into());
        }

        let trace_id = TraceId::new();
        wallet.hold(request.amount, Utc::now())?;
        let pair = self.transfer_pair(trace_id, user_id, &wallet, &request, key);
        self.ledger
            .create_double_entry(&txn, pair.with_status(EntryStatus::Pending))
            .await?;
        Self::save(&txn, &mut wallet).await?;

        let instruction = ProviderTransfer {
            reference: trace_id,
            source_account: wallet.account_ref.clone(),
            destination_account: request.destination_account.clone(),
            destination_bank: request.destination_bank.clone(),
            amount: request.amount,
            currency: wallet.currency,
            narration: request.narration.clone(),
        };

        match self.call_provider(self.provider.transfer(&instruction)).await {
            Ok(response) if response.is_success(&self.success_code) => {
                wallet.settle_hold(request.amount, Utc::now())?;
                Self::save(&txn, &mut wallet).await?;
                self.ledger
                    .update_trace_status(&txn, trace_id, EntryStatus::Completed)
                    .await?;
                let receipt = TransferReceipt {
                    trace_id,
                    status: EntryStatus::Completed,
                    provider_txn_id: response.provider_txn_id,
                    session_id: response.session_id,
                    balance: wallet.balance,
                };
                let receipt = self
                    .idempotency
                    .commit_with_response(txn, key, user_id, receipt)
                    .await?;
                info!(
                    user_id = %user_id,
                    trace_id = %receipt.trace_id,
                    amount = %request.amount,
                    provider = self.provider.name(),
                    "Transfer completed"
                );
                Ok(receipt)
            }
            Ok(response) => {
                warn!(
                    trace_id = %trace_id,
                    status = %response.status,
                    "Provider declined transfer"
                );
                self.abandon(txn, wallet, trace_id, request.amount).await;
                Err(ProviderError::Declined {
                    status: response.status,
                }
                .into())
            }
            Err(err) if err.is_indeterminate() => {
                warn!(
                    trace_id = %trace_id,
                    error = %err,
                    held = %request.amount,
                    "Transfer outcome unknown, funds held for requery"
                );
                if let Err(commit_err) = txn.commit().await {
                    error!(
                        trace_id = %trace_id,
                        error = %commit_err,
                        "Failed to record pending transfer"
                    );
                }
                Err(err.into())
            }
            Err(err) => {
                warn!(trace_id = %trace_id, error = %err, "Transfer not completed");
                self.abandon(txn, wallet, trace_id, request.amount).await;
                Err(err.into())
            }
        }
    }

    /// Settles a transfer left PENDING by a provider timeout.
    ///
    /// `Succeeded` takes the held amount out of the balance, completes the
    /// pair, and caches the transfer receipt under the original key.
    /// `Failed` releases the hold and marks the pair FAILED.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown or non-transfer trace and
    /// `Conflict` if the trace is already settled.
    pub async fn resolve_pending_transfer(
        &self,
        trace_id: TraceId,
        outcome: TransferOutcome,
        provider_txn_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let txn = self.db.begin().await?;
        let entries = LedgerRepository::trace_entries(&txn, trace_id).await?;
        if entries.is_empty() {
            return Err(LedgerError::TraceNotFound(trace_id).into());
        }
        if let Some(settled) = entries.iter().find(|e| e.status.is_terminal()) {
            return Err(LedgerError::AlreadyFinalized {
                entry_id: settled.id,
                status: settled.status,
            }
            .into());
        }
        let debit = entries
            .iter()
            .find(|e| e.category == EntryCategory::Transfer && e.entry_type == EntryType::Debit)
            .ok_or_else(|| RepositoryError::NotFound(format!("Pending transfer {trace_id}")))?;
        let LedgerAccount::UserWallet(user_id) = debit.account else {
            return Err(RepositoryError::NotFound(format!("Pending transfer {trace_id}")));
        };
        let amount = debit.amount;
        let original_key = debit.idempotency_key.clone();
        let actor_id = debit.actor_id;

        let mut wallet = Self::lock_by_user(&txn, user_id)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;

        let resolved = match outcome {
            TransferOutcome::Succeeded => {
                wallet.settle_hold(amount, Utc::now())?;
                Self::save(&txn, &mut wallet).await?;
                let resolved = self
                    .ledger
                    .update_trace_status(&txn, trace_id, EntryStatus::Completed)
                    .await?;

                if let (Some(raw), Some(actor_id)) = (original_key, actor_id) {
                    let key = IdempotencyKey::parse(Some(&raw))?;
                    let receipt = TransferReceipt {
                        trace_id,
                        status: EntryStatus::Completed,
                        provider_txn_id: provider_txn_id.unwrap_or_default(),
                        session_id: session_id.unwrap_or_default(),
                        balance: wallet.balance,
                    };
                    self.idempotency
                        .save_response(&txn, &key, actor_id, &receipt)
                        .await?;
                }
                resolved
            }
            TransferOutcome::Failed => {
                wallet.release(amount, Utc::now())?;
                Self::save(&txn, &mut wallet).await?;
                self.ledger
                    .update_trace_status(&txn, trace_id, EntryStatus::Failed)
                    .await?
            }
        };

        txn.commit().await?;
        info!(trace_id = %trace_id, outcome = ?outcome, "Pending transfer resolved");
        Ok(resolved)
    }

    /// Reads the user's wallet under a row lock.
    pub(crate) async fn lock_by_user<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<Wallet>, RepositoryError> {
        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id.into_inner()))
            .lock_exclusive()
            .one(conn)
            .await?
            .map(convert::wallet)
            .transpose()
    }

    /// Writes the balance back if the version still matches, then bumps it.
    pub(crate) async fn save<C: ConnectionTrait>(
        conn: &C,
        wallet: &mut Wallet,
    ) -> Result<(), RepositoryError> {
        let result = wallets::Entity::update_many()
            .col_expr(wallets::Column::Balance, Expr::value(wallet.balance.minor()))
            .col_expr(wallets::Column::Held, Expr::value(wallet.held.minor()))
            .col_expr(
                wallets::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(wallet.updated_at)),
            )
            .col_expr(wallets::Column::Version, Expr::value(wallet.version + 1))
            .filter(wallets::Column::Id.eq(wallet.id.into_inner()))
            .filter(wallets::Column::Version.eq(wallet.version))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::ConcurrentModification(format!(
                "wallet {}",
                wallet.id
            )));
        }
        wallet.version += 1;
        Ok(())
    }

    fn transfer_pair(
        &self,
        trace_id: TraceId,
        user_id: UserId,
        wallet: &Wallet,
        request: &TransferRequest,
        key: &IdempotencyKey,
    ) -> DoubleEntryInput {
        DoubleEntryInput::completed(
            trace_id,
            LedgerAccount::UserWallet(user_id),
            LedgerAccount::Settlement,
            request.amount,
            wallet.currency,
            EntryCategory::Transfer,
            "transfer",
        )
        .with_actor(user_id)
        .with_idempotency_key(Some(key.to_string()))
        .with_meta(json!({
            "destination_account": request.destination_account,
            "destination_bank": request.destination_bank,
            "narration": request.narration,
            "provider": self.provider.name(),
        }))
    }

    /// Releases the hold of a transfer that definitely did not happen and
    /// commits its pair as FAILED for audit.
    async fn abandon(
        &self,
        txn: DatabaseTransaction,
        mut wallet: Wallet,
        trace_id: TraceId,
        amount: Money,
    ) {
        let result = async move {
            wallet.release(amount, Utc::now())?;
            Self::save(&txn, &mut wallet).await?;
            self.ledger
                .update_trace_status(&txn, trace_id, EntryStatus::Failed)
                .await?;
            txn.commit().await?;
            Ok::<_, RepositoryError>(())
        }
        .await;

        if let Err(err) = result {
            error!(trace_id = %trace_id, error = %err, "Failed to record transfer audit entries");
        }
    }

    async fn call_provider<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let limit_ms = u64::try_from(self.provider_timeout.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(self.provider_timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(limit_ms))?
    }
}
