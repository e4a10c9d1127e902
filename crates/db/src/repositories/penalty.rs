//! Daily penalty accrual and mandatory collection.
//!
//! Each overdue loan is charged in its own database transaction. Collection
//! from the borrower's wallet runs afterwards as a separate transaction, so a
//! failed collection never undoes a posted penalty. Per-loan failures are
//! logged and counted; they never stop the batch.

use chrono::{DateTime, Utc};
use kudi_core::ledger::{DoubleEntryInput, EntryCategory, LedgerAccount};
use kudi_core::loan::{LoanAccount, LoanError, LoanStatus, PenaltyRunSummary};
use kudi_shared::types::{LoanId, Money, TraceId};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::error::RepositoryError;
use super::loan::LoanRepository;
use super::wallet::WalletRepository;

/// Result of charging one loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charge {
    /// Today's penalty (and the first-time overdue fee, if due) was posted.
    Posted(Money),
    /// Already charged today, or no longer overdue.
    Skipped,
}

/// Penalty accrual job.
#[derive(Debug, Clone)]
pub struct PenaltyJob {
    loans: LoanRepository,
}

impl PenaltyJob {
    /// Creates a new penalty job.
    #[must_use]
    pub const fn new(loans: LoanRepository) -> Self {
        Self { loans }
    }

    /// Charges every overdue loan once for the calendar day of `now`, then
    /// collects what each borrower's wallet can cover.
    ///
    /// # Errors
    ///
    /// Returns an error only if the overdue scan itself fails.
    pub async fn accrue_penalties(
        &self,
        now: DateTime<Utc>,
    ) -> Result<PenaltyRunSummary, RepositoryError> {
        let overdue = self.loans.overdue_loan_ids(now).await?;
        let mut summary = PenaltyRunSummary::default();

        for loan_id in overdue {
            summary.scanned += 1;

            match self.charge(loan_id, now).await {
                Ok(Charge::Posted(amount)) => {
                    summary.penalized += 1;
                    debug!(loan_id = %loan_id, amount = %amount, "Penalty posted");
                }
                Ok(Charge::Skipped) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(loan_id = %loan_id, error = %err, "Penalty posting failed");
                    continue;
                }
            }

            match self.collect(loan_id, now).await {
                Ok(Some(collected)) => {
                    summary.collected += 1;
                    info!(loan_id = %loan_id, amount = %collected, "Mandatory collection applied");
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(loan_id = %loan_id, error = %err, "Mandatory collection failed");
                }
            }
        }

        info!(
            scanned = summary.scanned,
            penalized = summary.penalized,
            skipped = summary.skipped,
            failed = summary.failed,
            collected = summary.collected,
            "Penalty run finished"
        );
        Ok(summary)
    }

    async fn charge(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Charge, RepositoryError> {
        let pricing = self.loans.pricing();
        let today = now.date_naive();

        let txn = self.loans.db().begin().await?;
        let mut loan = LoanRepository::find_for_update(&txn, loan_id).await?;
        let recorded = loan.history.len();
        let trace_id = TraceId::new();

        let penalty = match loan.apply_penalty(pricing, today, trace_id, now) {
            Ok(penalty) => penalty,
            Err(LoanError::AlreadyPenalized(_) | LoanError::NotOverdue) => {
                txn.rollback().await?;
                return Ok(Charge::Skipped);
            }
            Err(err) => return Err(err.into()),
        };
        self.post_charge(&txn, &loan, penalty, trace_id, "penalty").await?;

        let mut charged = penalty;
        if pricing.overdue_fee.is_positive() && !loan.overdue_fee_charged() {
            let fee = loan.apply_overdue_fee(pricing.overdue_fee, trace_id, now)?;
            self.post_charge(&txn, &loan, fee, trace_id, "overdue_fee").await?;
            charged = charged.checked_add(fee)?;
        }

        LoanRepository::save(&txn, &mut loan, recorded).await?;
        txn.commit().await?;
        Ok(Charge::Posted(charged))
    }

    /// Posts a loan charge pair; a zero amount posts nothing.
    async fn post_charge<C: ConnectionTrait>(
        &self,
        conn: &C,
        loan: &LoanAccount,
        amount: Money,
        trace_id: TraceId,
        subtype: &str,
    ) -> Result<(), RepositoryError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.loans
            .ledger()
            .create_double_entry(
                conn,
                DoubleEntryInput::completed(
                    trace_id,
                    LedgerAccount::UserWallet(loan.user_id),
                    LedgerAccount::PlatformRevenue,
                    amount,
                    self.loans.currency(),
                    EntryCategory::Loan,
                    subtype,
                )
                .with_meta(json!({ "loan_id": loan.id })),
            )
            .await?;
        Ok(())
    }

    /// Collects `min(available wallet balance, outstanding)` as a repayment.
    ///
    /// Returns `None` when there is nothing to collect.
    async fn collect(
        &self,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> Result<Option<Money>, RepositoryError> {
        let txn = self.loans.db().begin().await?;
        let mut loan = LoanRepository::find_for_update(&txn, loan_id).await?;
        if loan.status != LoanStatus::Accepted || loan.outstanding.is_zero() {
            return Ok(None);
        }
        let Some(mut wallet) = WalletRepository::lock_by_user(&txn, loan.user_id).await? else {
            return Ok(None);
        };

        let amount = wallet.available().min(loan.outstanding);
        if amount.is_zero() {
            return Ok(None);
        }

        let recorded = loan.history.len();
        let trace_id = TraceId::new();
        let paid = loan.apply_repayment(amount, trace_id, now)?;
        self.loans
            .post_repayment(
                &txn,
                &loan,
                &mut wallet,
                paid,
                trace_id,
                None,
                json!({ "loan_id": loan.id, "collection": "mandatory" }),
            )
            .await?;
        LoanRepository::save(&txn, &mut loan, recorded).await?;
        txn.commit().await?;

        Ok(Some(paid))
    }
}
