//! Port for the external wallet/bill-payment provider.
//!
//! The core only sees this trait; the HTTP implementation lives in the
//! provider crate and tests substitute scripted fakes.

use async_trait::async_trait;
use kudi_shared::AppError;
use kudi_shared::types::{Currency, Money, TraceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No answer within the configured bound.
    #[error("Provider call timed out after {0} ms")]
    Timeout(u64),
    /// Network or HTTP-level failure.
    #[error("Provider transport error: {0}")]
    Transport(String),
    /// Provider answered with a body we could not read.
    #[error("Provider response could not be parsed: {0}")]
    InvalidResponse(String),
    /// Provider answered with a non-success code.
    #[error("Provider declined with status {status}")]
    Declined {
        /// The provider's status code.
        status: String,
    },
}

impl ProviderError {
    /// Returns true if the outcome at the provider is unknown.
    ///
    /// Unknown outcomes leave the ledger PENDING for requery instead of FAILED.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_) | Self::InvalidResponse(_))
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "PROVIDER_TIMEOUT",
            Self::Transport(_) => "PROVIDER_UNAVAILABLE",
            Self::InvalidResponse(_) => "PROVIDER_BAD_RESPONSE",
            Self::Declined { .. } => "PROVIDER_DECLINED",
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        Self::ProviderFailure(err.to_string())
    }
}

/// Transfer instruction sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransfer {
    /// Our reference; the ledger trace of the transfer.
    pub reference: TraceId,
    /// Source account at the provider.
    pub source_account: String,
    /// Destination account number.
    pub destination_account: String,
    /// Destination bank code.
    pub destination_bank: String,
    /// Amount in minor units.
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Free-text narration.
    pub narration: Option<String>,
}

/// Provider's answer to a transfer instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransferResponse {
    /// Provider status code.
    pub status: String,
    /// Provider's transaction reference.
    #[serde(default)]
    pub provider_txn_id: String,
    /// Provider's session reference.
    #[serde(default)]
    pub session_id: String,
}

impl ProviderTransferResponse {
    /// The status code is the sole success signal.
    #[must_use]
    pub fn is_success(&self, success_code: &str) -> bool {
        self.status == success_code
    }
}

/// Provider-side view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEnquiry {
    /// Balance held at the provider, in minor units.
    pub balance: Money,
    /// Provider account identifier.
    pub account_id: String,
    /// Provider client identifier.
    pub client_id: String,
    /// Account holder name.
    pub account_name: String,
}

/// Outbound provider operations used by the money flows.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Sends a transfer instruction.
    async fn transfer(
        &self,
        request: &ProviderTransfer,
    ) -> Result<ProviderTransferResponse, ProviderError>;

    /// Looks up an account's provider-held balance.
    async fn account_enquiry(&self, account_ref: &str) -> Result<AccountEnquiry, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
