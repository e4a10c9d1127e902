//! Wallet domain types.

use chrono::{DateTime, Utc};
use kudi_shared::types::{Currency, Money, TraceId, UserId, WalletId};
use serde::{Deserialize, Serialize};

use super::error::WalletError;
use crate::ledger::EntryStatus;

/// A user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet ID.
    pub id: WalletId,
    /// Owner (one wallet per user).
    pub user_id: UserId,
    /// Account reference at the provider.
    pub account_ref: String,
    /// Currency of the balance.
    pub currency: Currency,
    /// Locally tracked balance in minor units.
    pub balance: Money,
    /// Part of the balance reserved for transfers awaiting requery.
    pub held: Money,
    /// Optimistic-lock version.
    pub version: i64,
    /// When the wallet was opened.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Opens an empty wallet.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccountRef` for a blank provider reference.
    pub fn open(
        user_id: UserId,
        account_ref: &str,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        let account_ref = account_ref.trim();
        if account_ref.is_empty() {
            return Err(WalletError::MissingAccountRef);
        }
        Ok(Self {
            id: WalletId::new(),
            user_id,
            account_ref: account_ref.to_string(),
            currency,
            balance: Money::ZERO,
            held: Money::ZERO,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Balance that is not on hold.
    #[must_use]
    pub const fn available(&self) -> Money {
        self.balance.saturating_sub(self.held)
    }

    /// Fails unless the available balance covers `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the available balance is short.
    pub fn ensure_covers(&self, amount: Money) -> Result<(), WalletError> {
        if self.available() < amount {
            return Err(WalletError::InsufficientFunds {
                available: self.available(),
                requested: amount,
            });
        }
        Ok(())
    }

    /// Adds `amount` to the balance.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for a zero amount or an overflow error.
    pub fn credit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        self.balance = self.balance.checked_add(amount)?;
        self.updated_at = now;
        Ok(self.balance)
    }

    /// Removes `amount` from the balance.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for a zero amount or `InsufficientFunds` if the
    /// balance is short.
    pub fn debit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        self.ensure_covers(amount)?;
        self.balance = self.balance.checked_sub(amount)?;
        self.updated_at = now;
        Ok(self.balance)
    }

    /// Reserves `amount` of the available balance. The balance itself is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for a zero amount or `InsufficientFunds` if the
    /// available balance is short.
    pub fn hold(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        self.ensure_covers(amount)?;
        self.held = self.held.checked_add(amount)?;
        self.updated_at = now;
        Ok(self.held)
    }

    /// Returns a held amount to the available balance.
    ///
    /// # Errors
    ///
    /// Returns an error if less than `amount` is on hold.
    pub fn release(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, WalletError> {
        self.held = self.held.checked_sub(amount)?;
        self.updated_at = now;
        Ok(self.available())
    }

    /// Takes a held amount out of the balance.
    ///
    /// # Errors
    ///
    /// Returns an error if less than `amount` is on hold.
    pub fn settle_hold(
        &mut self,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Money, WalletError> {
        self.held = self.held.checked_sub(amount)?;
        self.balance = self.balance.checked_sub(amount)?;
        self.updated_at = now;
        Ok(self.balance)
    }
}

/// Outbound transfer instruction from a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in minor units.
    pub amount: Money,
    /// Destination account number.
    pub destination_account: String,
    /// Destination bank code.
    pub destination_bank: String,
    /// Free-text narration.
    #[serde(default)]
    pub narration: Option<String>,
}

impl TransferRequest {
    /// Validates the instruction.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero amount or a blank destination.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        if self.destination_account.trim().is_empty() || self.destination_bank.trim().is_empty() {
            return Err(WalletError::MissingDestination);
        }
        Ok(())
    }
}

/// Response to a completed wallet transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Ledger trace of the transfer.
    pub trace_id: TraceId,
    /// Entry status (COMPLETED for a settled transfer).
    pub status: EntryStatus,
    /// Provider's transaction reference.
    pub provider_txn_id: String,
    /// Provider's session reference.
    pub session_id: String,
    /// Wallet balance after the transfer.
    pub balance: Money,
}

/// Response to a wallet funding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReceipt {
    /// Ledger trace of the funding.
    pub trace_id: TraceId,
    /// Amount credited.
    pub amount: Money,
    /// Wallet balance after the funding.
    pub balance: Money,
}

/// Operator verdict for a transfer left PENDING by a provider timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    /// The provider confirmed the transfer.
    Succeeded,
    /// The provider never executed it.
    Failed,
}

impl TransferOutcome {
    /// Terminal entry status for this verdict.
    #[must_use]
    pub fn entry_status(&self) -> EntryStatus {
        match self {
            Self::Succeeded => EntryStatus::Completed,
            Self::Failed => EntryStatus::Failed,
        }
    }
}
