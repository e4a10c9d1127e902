//! Ledger domain types.
//!
//! Every balance-affecting event is recorded as a pair of entries sharing a
//! trace id: a DEBIT on the account funds leave and a CREDIT on the account
//! funds arrive at.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kudi_shared::types::{Currency, LedgerEntryId, Money, TraceId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;

/// Entry type: either Debit or Credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// Funds leave the account.
    Debit,
    /// Funds arrive at the account.
    Credit,
}

impl EntryType {
    /// Returns the string representation of the entry type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a ledger entry.
///
/// The only valid transitions are:
/// - Pending → Completed
/// - Pending → Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    /// Recorded but not yet settled.
    #[default]
    Pending,
    /// Settled; counts toward balances.
    Completed,
    /// Abandoned; kept for audit only.
    Failed,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns true if the entry can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryCategory {
    /// Wallet transfer to an external account.
    Transfer,
    /// Loan disbursement, repayment, or penalty.
    Loan,
    /// Bill payment through the provider.
    BillPayment,
    /// Savings movement.
    Savings,
    /// Standalone fee.
    Fee,
    /// Refund of an earlier debit.
    Refund,
    /// Movement between the settlement account and a wallet.
    Settlement,
}

impl EntryCategory {
    /// Returns the string representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Loan => "loan",
            Self::BillPayment => "bill-payment",
            Self::Savings => "savings",
            Self::Fee => "fee",
            Self::Refund => "refund",
            Self::Settlement => "settlement",
        }
    }

    /// Parses a category from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(Self::Transfer),
            "loan" => Some(Self::Loan),
            "bill-payment" => Some(Self::BillPayment),
            "savings" => Some(Self::Savings),
            "fee" => Some(Self::Fee),
            "refund" => Some(Self::Refund),
            "settlement" => Some(Self::Settlement),
            _ => None,
        }
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger account.
///
/// Rendered as `user_wallet:<user_id>`, `platform_revenue`,
/// `platform_disbursement`, or `settlement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LedgerAccount {
    /// A user's wallet.
    UserWallet(UserId),
    /// Income from fees, interest, penalties, and repayments.
    PlatformRevenue,
    /// Source of loan principal.
    PlatformDisbursement,
    /// Counterparty for provider-side movements.
    Settlement,
}

const USER_WALLET_PREFIX: &str = "user_wallet:";

impl fmt::Display for LedgerAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserWallet(user_id) => write!(f, "{USER_WALLET_PREFIX}{user_id}"),
            Self::PlatformRevenue => f.write_str("platform_revenue"),
            Self::PlatformDisbursement => f.write_str("platform_disbursement"),
            Self::Settlement => f.write_str("settlement"),
        }
    }
}

impl FromStr for LedgerAccount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform_revenue" => Ok(Self::PlatformRevenue),
            "platform_disbursement" => Ok(Self::PlatformDisbursement),
            "settlement" => Ok(Self::Settlement),
            other => other
                .strip_prefix(USER_WALLET_PREFIX)
                .and_then(|id| Uuid::parse_str(id).ok())
                .map(|id| Self::UserWallet(UserId::from_uuid(id)))
                .ok_or_else(|| LedgerError::InvalidAccount(s.to_string())),
        }
    }
}

impl From<LedgerAccount> for String {
    fn from(account: LedgerAccount) -> Self {
        account.to_string()
    }
}

impl TryFrom<String> for LedgerAccount {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID (time-ordered).
    pub id: LedgerEntryId,
    /// Business event this entry belongs to.
    pub trace_id: TraceId,
    /// User who initiated the event, if any.
    pub actor_id: Option<UserId>,
    /// Account the entry posts to.
    pub account: LedgerAccount,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Business category.
    pub category: EntryCategory,
    /// Free-form subtype such as `repayment` or `penalty`.
    pub subtype: String,
    /// Amount in minor units (always positive).
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Idempotency key of the request that produced the entry.
    pub idempotency_key: Option<String>,
    /// Arbitrary metadata object.
    pub meta: serde_json::Value,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// When the entry reached a terminal status.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Input for a single ledger entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    /// Business event this entry belongs to.
    pub trace_id: TraceId,
    /// User who initiated the event, if any.
    pub actor_id: Option<UserId>,
    /// Account the entry posts to.
    pub account: LedgerAccount,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Business category.
    pub category: EntryCategory,
    /// Free-form subtype.
    pub subtype: String,
    /// Amount in minor units (must be positive).
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Initial status (PENDING unless stated).
    pub status: EntryStatus,
    /// Idempotency key of the originating request.
    pub idempotency_key: Option<String>,
    /// Arbitrary metadata object.
    pub meta: serde_json::Value,
}

/// Input for a balanced DEBIT/CREDIT pair.
#[derive(Debug, Clone)]
pub struct DoubleEntryInput {
    /// Business event both entries belong to.
    pub trace_id: TraceId,
    /// Account funds leave.
    pub debit_account: LedgerAccount,
    /// Account funds arrive at.
    pub credit_account: LedgerAccount,
    /// Amount in minor units (must be positive).
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Business category.
    pub category: EntryCategory,
    /// Free-form subtype.
    pub subtype: String,
    /// Initial status of both entries.
    pub status: EntryStatus,
    /// User who initiated the event, if any.
    pub actor_id: Option<UserId>,
    /// Idempotency key of the originating request.
    pub idempotency_key: Option<String>,
    /// Metadata copied onto both entries.
    pub meta: serde_json::Value,
}

impl DoubleEntryInput {
    /// Creates a COMPLETED pair input with empty metadata.
    #[must_use]
    pub fn completed(
        trace_id: TraceId,
        debit_account: LedgerAccount,
        credit_account: LedgerAccount,
        amount: Money,
        currency: Currency,
        category: EntryCategory,
        subtype: impl Into<String>,
    ) -> Self {
        Self {
            trace_id,
            debit_account,
            credit_account,
            amount,
            currency,
            category,
            subtype: subtype.into(),
            status: EntryStatus::Completed,
            actor_id: None,
            idempotency_key: None,
            meta: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the initial status.
    #[must_use]
    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the actor.
    #[must_use]
    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }

    /// Sets the metadata object.
    #[must_use]
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// A persisted DEBIT/CREDIT pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubleEntry {
    /// The debit side.
    pub debit: LedgerEntry,
    /// The credit side.
    pub credit: LedgerEntry,
}

impl DoubleEntry {
    /// Trace shared by both sides.
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.debit.trace_id
    }
}

/// A trace whose COMPLETED debits and credits disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceImbalance {
    /// The offending trace.
    pub trace_id: TraceId,
    /// Sum of COMPLETED debits in minor units.
    pub total_debits: i64,
    /// Sum of COMPLETED credits in minor units.
    pub total_credits: i64,
}

/// COMPLETED totals for one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraceTotals {
    /// Sum of COMPLETED debits in minor units.
    pub total_debits: i64,
    /// Sum of COMPLETED credits in minor units.
    pub total_credits: i64,
}

impl TraceTotals {
    /// Returns true if debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debits == self.total_credits
    }

    /// Adds one entry's amount to the matching side.
    pub fn add(&mut self, entry_type: EntryType, amount: Money) {
        match entry_type {
            EntryType::Debit => {
                self.total_debits = self.total_debits.saturating_add(amount.minor());
            }
            EntryType::Credit => {
                self.total_credits = self.total_credits.saturating_add(amount.minor());
            }
        }
    }
}
