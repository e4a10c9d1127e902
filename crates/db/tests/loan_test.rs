//! Integration tests for the loan lifecycle.

mod common;

use common::{key, money, setup};
use kudi_core::ledger::{EntryCategory, EntryStatus, EntryType, LedgerAccount};
use kudi_core::loan::{
    DisbursementOverrides, HistoryAction, LoanCategory, LoanError, LoanStatus, NewLoanRequest,
    PaymentStatus,
};
use kudi_core::wallet::WalletError;
use kudi_db::RepositoryError;
use kudi_shared::types::{LoanId, PageRequest, UserId};

fn working(principal: i64, days: u32) -> NewLoanRequest {
    NewLoanRequest {
        principal: money(principal),
        category: LoanCategory::Working,
        duration_days: days,
    }
}

#[tokio::test]
async fn test_application_starts_pending_with_nothing_owed() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;

    let application = ctx.loans.create_loan(user, &working(100_000, 30)).await.unwrap();
    assert_eq!(application.status, LoanStatus::Pending);

    let loan = ctx.loans.get_loan(application.loan_id).await.unwrap();
    assert_eq!(loan.outstanding, money(0));
    assert_eq!(loan.payment_status, PaymentStatus::NotStarted);
    assert!(loan.history.is_empty());
}

#[tokio::test]
async fn test_second_application_while_active_is_rejected() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let first = ctx.loans.create_loan(user, &working(50_000, 30)).await.unwrap();

    let second = ctx.loans.create_loan(user, &working(10_000, 30)).await;
    assert!(matches!(
        second,
        Err(RepositoryError::Loan(LoanError::ActiveLoanExists(id))) if id == first.loan_id
    ));
}

#[tokio::test]
async fn test_disbursement_prices_and_credits_wallet() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let application = ctx.loans.create_loan(user, &working(100_000, 30)).await.unwrap();
    let admin = UserId::new();

    let receipt = ctx
        .loans
        .disburse_loan(application.loan_id, admin, DisbursementOverrides::default())
        .await
        .unwrap();
    assert_eq!(receipt.total_repayment, money(104_500));

    let loan = ctx.loans.get_loan(application.loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Accepted);
    assert_eq!(loan.payment_status, PaymentStatus::InProgress);
    assert_eq!(loan.outstanding, money(104_500));
    assert_eq!(loan.history.len(), 1);
    assert_eq!(loan.history[0].action, HistoryAction::Disbursement);
    assert_eq!(loan.history[0].resulting_outstanding, money(104_500));
    assert!(loan.repayment_date.is_some());

    let wallet = ctx.wallets.get_wallet(user).await.unwrap();
    assert_eq!(wallet.balance, money(100_000));

    let entries = ctx.ledger.get_by_trace_id(receipt.trace_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    let debit = entries.iter().find(|e| e.entry_type == EntryType::Debit).unwrap();
    assert_eq!(debit.account, LedgerAccount::PlatformDisbursement);
    assert_eq!(debit.amount, money(100_000));
    assert_eq!(debit.actor_id, Some(admin));
    assert_eq!(debit.category, EntryCategory::Loan);
    assert_eq!(debit.meta["total_repayment"], 104_500);
}

#[tokio::test]
async fn test_disbursement_overrides_replace_terms() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let application = ctx.loans.create_loan(user, &working(100_000, 30)).await.unwrap();

    let receipt = ctx
        .loans
        .disburse_loan(
            application.loan_id,
            UserId::new(),
            DisbursementOverrides {
                amount: Some(money(50_000)),
                duration_days: Some(60),
            },
        )
        .await
        .unwrap();

    // 50_000 + 500 fee + floor(50_000 * 0.04 * 2)
    assert_eq!(receipt.total_repayment, money(54_500));
    let loan = ctx.loans.get_loan(application.loan_id).await.unwrap();
    assert_eq!(loan.principal, money(50_000));
    assert_eq!(loan.duration_days, 60);
}

#[tokio::test]
async fn test_disbursement_requires_a_wallet() {
    let ctx = setup().await;
    let user = UserId::new();
    let application = ctx.loans.create_loan(user, &working(10_000, 30)).await.unwrap();

    let result = ctx
        .loans
        .disburse_loan(application.loan_id, UserId::new(), DisbursementOverrides::default())
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Wallet(WalletError::NotFound(_)))
    ));

    let loan = ctx.loans.get_loan(application.loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);
}

#[tokio::test]
async fn test_disbursing_twice_conflicts() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 10_000, 30).await;

    let again = ctx
        .loans
        .disburse_loan(loan_id, UserId::new(), DisbursementOverrides::default())
        .await;
    assert!(matches!(
        again,
        Err(RepositoryError::Loan(LoanError::InvalidTransition { .. }))
    ));
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(10_000));
}

#[tokio::test]
async fn test_reject_keeps_nothing_owed_and_frees_the_borrower() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let application = ctx.loans.create_loan(user, &working(10_000, 30)).await.unwrap();

    let blank = ctx.loans.reject_loan(application.loan_id, "   ").await;
    assert!(matches!(
        blank,
        Err(RepositoryError::Loan(LoanError::RejectionReasonRequired))
    ));

    let rejected = ctx
        .loans
        .reject_loan(application.loan_id, "income not verified")
        .await
        .unwrap();
    assert_eq!(rejected.status, LoanStatus::Rejected);
    assert_eq!(rejected.outstanding, money(0));
    assert_eq!(rejected.rejection_reason.as_deref(), Some("income not verified"));

    ctx.loans.create_loan(user, &working(5_000, 30)).await.unwrap();
}

#[tokio::test]
async fn test_partial_then_full_repayment() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    ctx.fund(user, 10_000).await;

    let first = ctx
        .loans
        .repay_loan(loan_id, money(20_000), &key("repay-1"), user)
        .await
        .unwrap();
    assert_eq!(first.amount_paid, money(20_000));
    assert_eq!(first.remaining_outstanding, money(84_500));

    // Overpayment is capped at what is owed.
    let second = ctx
        .loans
        .repay_loan(loan_id, money(90_000), &key("repay-2"), user)
        .await
        .unwrap();
    assert_eq!(second.amount_paid, money(84_500));
    assert_eq!(second.remaining_outstanding, money(0));

    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.payment_status, PaymentStatus::Complete);
    assert_eq!(loan.history.len(), 3);
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(5_500));

    let repayments = ctx
        .ledger
        .list_by_account(&LedgerAccount::PlatformRevenue, None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(repayments.meta.total, 2);
    assert!(repayments.data.iter().all(|e| e.status == EntryStatus::Completed));

    let paid_off = ctx
        .loans
        .repay_loan(loan_id, money(1), &key("repay-3"), user)
        .await;
    assert!(matches!(
        paid_off,
        Err(RepositoryError::Loan(LoanError::NotRepayable { .. }))
    ));

    ctx.loans.create_loan(user, &working(1_000, 30)).await.unwrap();
}

#[tokio::test]
async fn test_repayment_replay_returns_first_receipt() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    let k = key("repay-replay");

    let first = ctx
        .loans
        .repay_loan(loan_id, money(20_000), &k, user)
        .await
        .unwrap();
    let replay = ctx
        .loans
        .repay_loan(loan_id, money(30_000), &k, user)
        .await
        .unwrap();

    assert_eq!(replay, first);
    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.outstanding, money(84_500));
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(80_000));
}

#[tokio::test]
async fn test_repayment_by_another_user_is_not_found() {
    let ctx = setup().await;
    let owner = ctx.user_with_wallet().await;
    let stranger = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(owner, 10_000, 30).await;

    let result = ctx
        .loans
        .repay_loan(loan_id, money(1_000), &key("stranger"), stranger)
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Loan(LoanError::LoanNotFound(id))) if id == loan_id
    ));
}

#[tokio::test]
async fn test_repayment_short_wallet_changes_nothing() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;

    let result = ctx
        .loans
        .repay_loan(loan_id, money(100_001), &key("short"), user)
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Wallet(WalletError::InsufficientFunds { .. }))
    ));

    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.outstanding, money(104_500));
    assert_eq!(loan.history.len(), 1);
    assert!(ctx.idempotency.check_key(&key("short"), user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_loan_is_not_found() {
    let ctx = setup().await;
    let result = ctx.loans.get_loan(LoanId::new()).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Loan(LoanError::LoanNotFound(_)))
    ));
}

#[tokio::test]
async fn test_single_full_repayment_closes_loan_with_one_balanced_trace() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    ctx.fund(user, 4_500).await;

    let receipt = ctx
        .loans
        .repay_loan(loan_id, money(104_500), &key("payoff"), user)
        .await
        .unwrap();
    assert_eq!(receipt.remaining_outstanding, money(0));

    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.payment_status, PaymentStatus::Complete);

    let entries = ctx.ledger.get_by_trace_id(receipt.trace_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.amount == money(104_500)));
    assert!(entries.iter().all(|e| e.status == EntryStatus::Completed));
    assert!(ctx.ledger.find_inconsistencies().await.unwrap().is_empty());
}
