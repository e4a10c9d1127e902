//! `SeaORM` active enums, stored as short strings.
//!
//! Each enum converts to and from its `kudi-core` counterpart so repositories
//! never leak storage types into business logic.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use kudi_core::ledger;
use kudi_core::loan;

/// Ledger entry side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum EntryType {
    /// Funds leave the account.
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    /// Funds arrive at the account.
    #[sea_orm(string_value = "CREDIT")]
    Credit,
}

/// Ledger entry lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum EntryStatus {
    /// Recorded, not settled.
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Settled.
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Abandoned.
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

/// Ledger entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum EntryCategory {
    /// Wallet transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Loan movement.
    #[sea_orm(string_value = "loan")]
    Loan,
    /// Bill payment.
    #[sea_orm(string_value = "bill-payment")]
    BillPayment,
    /// Savings movement.
    #[sea_orm(string_value = "savings")]
    Savings,
    /// Standalone fee.
    #[sea_orm(string_value = "fee")]
    Fee,
    /// Refund.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Settlement movement.
    #[sea_orm(string_value = "settlement")]
    Settlement,
}

/// Loan approval status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LoanStatus {
    /// Awaiting a decision.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Disbursed.
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Declined.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Loan repayment progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentStatus {
    /// Nothing disbursed.
    #[sea_orm(string_value = "not-started")]
    NotStarted,
    /// Balance owed.
    #[sea_orm(string_value = "in-progress")]
    InProgress,
    /// Fully repaid.
    #[sea_orm(string_value = "complete")]
    Complete,
}

/// Loan product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LoanCategory {
    /// Working capital.
    #[sea_orm(string_value = "working")]
    Working,
    /// Personal.
    #[sea_orm(string_value = "personal")]
    Personal,
    /// Business.
    #[sea_orm(string_value = "business")]
    Business,
    /// Emergency.
    #[sea_orm(string_value = "emergency")]
    Emergency,
}

/// Loan history action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum HistoryAction {
    /// Disbursement.
    #[sea_orm(string_value = "disbursement")]
    Disbursement,
    /// Repayment.
    #[sea_orm(string_value = "repayment")]
    Repayment,
    /// Daily penalty.
    #[sea_orm(string_value = "penalty")]
    Penalty,
    /// One-time overdue fee.
    #[sea_orm(string_value = "overdue_fee")]
    OverdueFee,
}

/// Implements both conversions between a storage enum and its core enum.
macro_rules! mirror_enum {
    ($db:ident <=> $module:ident :: $core:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$module::$core> for $db {
            fn from(value: $module::$core) -> Self {
                match value {
                    $($module::$core::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$db> for $module::$core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(EntryType <=> ledger::EntryType { Debit, Credit });
mirror_enum!(EntryStatus <=> ledger::EntryStatus { Pending, Completed, Failed });
mirror_enum!(EntryCategory <=> ledger::EntryCategory {
    Transfer,
    Loan,
    BillPayment,
    Savings,
    Fee,
    Refund,
    Settlement,
});
mirror_enum!(LoanStatus <=> loan::LoanStatus { Pending, Accepted, Rejected });
mirror_enum!(PaymentStatus <=> loan::PaymentStatus { NotStarted, InProgress, Complete });
mirror_enum!(LoanCategory <=> loan::LoanCategory {
    Working,
    Personal,
    Business,
    Emergency,
});
mirror_enum!(HistoryAction <=> loan::HistoryAction {
    Disbursement,
    Repayment,
    Penalty,
    OverdueFee,
});
