//! Loan domain types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use kudi_shared::types::{LoanId, Money, TraceId, UserId};
use serde::{Deserialize, Serialize};

/// Approval status of a loan.
///
/// The valid transitions are:
/// - Pending → Accepted (disburse)
/// - Pending → Rejected (reject)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Applied for, awaiting a decision.
    Pending,
    /// Disbursed.
    Accepted,
    /// Declined.
    Rejected,
}

impl LoanStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repayment progress of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    /// Nothing disbursed yet.
    NotStarted,
    /// Disbursed with a balance still owed.
    InProgress,
    /// Fully repaid.
    Complete,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan product category; drives the interest rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanCategory {
    /// Working-capital loan (discounted rate).
    Working,
    /// Personal loan.
    Personal,
    /// Business loan.
    Business,
    /// Emergency loan.
    Emergency,
}

impl LoanCategory {
    /// Returns the string representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Personal => "personal",
            Self::Business => "business",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What moved the outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Loan paid out; sets the amount owed.
    Disbursement,
    /// Money received; reduces the amount owed.
    Repayment,
    /// Daily late penalty.
    Penalty,
    /// One-time fee on first becoming overdue.
    OverdueFee,
}

impl HistoryAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disbursement => "disbursement",
            Self::Repayment => "repayment",
            Self::Penalty => "penalty",
            Self::OverdueFee => "overdue_fee",
        }
    }

    /// Returns true if the action increases the amount owed.
    #[must_use]
    pub fn increases_outstanding(&self) -> bool {
        !matches!(self, Self::Repayment)
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only entry of a loan's repayment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentHistoryEntry {
    /// Position in the history (1-based).
    pub sequence: i32,
    /// Amount that moved.
    pub amount: Money,
    /// Outstanding balance after this entry.
    pub resulting_outstanding: Money,
    /// What moved it.
    pub action: HistoryAction,
    /// Ledger trace of the event.
    pub trace_id: TraceId,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

/// A loan account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAccount {
    /// Loan ID.
    pub id: LoanId,
    /// Borrower.
    pub user_id: UserId,
    /// Amount lent.
    pub principal: Money,
    /// Amount currently owed.
    pub outstanding: Money,
    /// Amount owed at disbursement (principal + fee + interest).
    pub total_repayment: Money,
    /// Approval status.
    pub status: LoanStatus,
    /// Repayment progress.
    pub payment_status: PaymentStatus,
    /// Product category.
    pub category: LoanCategory,
    /// Term in days.
    pub duration_days: u32,
    /// When the principal was paid out.
    pub disbursed_at: Option<DateTime<Utc>>,
    /// When the loan falls due.
    pub repayment_date: Option<DateTime<Utc>>,
    /// Calendar day of the last penalty.
    pub last_penalty_date: Option<NaiveDate>,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Most recent ledger trace touching this loan.
    pub trace_id: TraceId,
    /// Ordered repayment history.
    pub history: Vec<RepaymentHistoryEntry>,
    /// Optimistic-lock version.
    pub version: i64,
    /// When the loan was applied for.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for a loan application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoanRequest {
    /// Amount requested in minor units.
    pub principal: Money,
    /// Product category.
    pub category: LoanCategory,
    /// Term in days.
    pub duration_days: u32,
}

/// Optional admin overrides applied at disbursement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DisbursementOverrides {
    /// Replaces the requested principal.
    pub amount: Option<Money>,
    /// Replaces the requested term.
    pub duration_days: Option<u32>,
}

/// Price breakdown of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    /// Amount lent.
    pub principal: Money,
    /// Flat fee.
    pub fee: Money,
    /// Interest, floored to the minor unit.
    pub interest: Money,
    /// `principal + fee + interest`.
    pub total_repayment: Money,
}

/// Summary of one penalty accrual run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRunSummary {
    /// Overdue loans examined.
    pub scanned: u32,
    /// Loans charged a penalty.
    pub penalized: u32,
    /// Loans already charged today.
    pub skipped: u32,
    /// Loans whose penalty posting failed.
    pub failed: u32,
    /// Loans with a successful mandatory collection.
    pub collected: u32,
}

/// Response to a loan application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    /// The new loan.
    pub loan_id: LoanId,
    /// Always `pending`.
    pub status: LoanStatus,
    /// Correlation trace of the application.
    pub trace_id: TraceId,
}

/// Response to a disbursement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementReceipt {
    /// The disbursed loan.
    pub loan_id: LoanId,
    /// Ledger trace of the disbursement.
    pub trace_id: TraceId,
    /// Amount now owed.
    pub total_repayment: Money,
    /// When the loan falls due.
    pub repayment_date: DateTime<Utc>,
}

/// Response to a repayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentReceipt {
    /// Ledger trace of the repayment.
    pub trace_id: TraceId,
    /// Amount applied to the loan.
    pub amount_paid: Money,
    /// Amount still owed.
    pub remaining_outstanding: Money,
}
