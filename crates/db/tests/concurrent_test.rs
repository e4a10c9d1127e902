//! Concurrency tests for idempotent money flows.
//!
//! Two requests racing under the same key must apply the side effect once
//! and both observe the same response.

mod common;

use common::{key, money, setup};
use futures::future::join_all;
use kudi_core::ledger::{EntryCategory, LedgerAccount};
use kudi_core::loan::PaymentStatus;
use kudi_core::wallet::TransferRequest;
use kudi_shared::types::PageRequest;

#[tokio::test]
async fn test_concurrent_repayments_with_same_key_apply_once() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    let k = key("race-repay");

    let (a, b) = futures::join!(
        ctx.loans.repay_loan(loan_id, money(20_000), &k, user),
        ctx.loans.repay_loan(loan_id, money(20_000), &k, user),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a, b);
    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.outstanding, money(84_500));
    assert_eq!(loan.history.len(), 2);
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(80_000));
}

#[tokio::test]
async fn test_concurrent_full_payoffs_with_same_key_apply_once() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    ctx.fund(user, 4_500).await;
    let k = key("race-payoff");

    let (a, b) = futures::join!(
        ctx.loans.repay_loan(loan_id, money(104_500), &k, user),
        ctx.loans.repay_loan(loan_id, money(104_500), &k, user),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a, b);
    assert_eq!(a.remaining_outstanding, money(0));
    let loan = ctx.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.payment_status, PaymentStatus::Complete);
    assert_eq!(loan.history.len(), 2);
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(0));

    let repayments = ctx
        .ledger
        .list_by_account(
            &LedgerAccount::PlatformRevenue,
            Some(EntryCategory::Loan),
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(repayments.meta.total, 1);
}

#[tokio::test]
async fn test_concurrent_repayments_draining_wallet_with_same_key_apply_once() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let loan_id = ctx.disbursed_loan(user, 100_000, 30).await;
    let k = key("race-drain");

    // Either request alone fits the wallet; both together would not.
    let (a, b) = futures::join!(
        ctx.loans.repay_loan(loan_id, money(60_000), &k, user),
        ctx.loans.repay_loan(loan_id, money(60_000), &k, user),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a, b);
    assert_eq!(ctx.loans.get_loan(loan_id).await.unwrap().outstanding, money(44_500));
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(40_000));
}

#[tokio::test]
async fn test_concurrent_transfers_with_same_key_send_once() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    ctx.fund(user, 30_000).await;
    let k = key("race-xfer");
    let request = TransferRequest {
        amount: money(20_000),
        destination_account: "0123456789".to_string(),
        destination_bank: "058".to_string(),
        narration: None,
    };

    let (a, b) = futures::join!(
        ctx.wallets.transfer_funds(user, request.clone(), &k),
        ctx.wallets.transfer_funds(user, request.clone(), &k),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a, b);
    assert_eq!(ctx.provider.transfers(), 1);
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(10_000));
}

#[tokio::test]
async fn test_concurrent_fundings_with_distinct_keys_all_apply() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let keys: Vec<_> = (0..10).map(|i| key(&format!("fund-{i}"))).collect();

    let results = join_all(
        keys.iter()
            .map(|k| ctx.wallets.fund_wallet(user, money(1_000), k)),
    )
    .await;
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(10_000));
    let credits = ctx
        .ledger
        .list_by_account(&LedgerAccount::UserWallet(user), None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(credits.meta.total, 10);
    assert!(ctx.ledger.find_inconsistencies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_fundings_with_same_key_credit_once() {
    let ctx = setup().await;
    let user = ctx.user_with_wallet().await;
    let k = key("fund-once");

    let results = join_all((0..5).map(|_| ctx.wallets.fund_wallet(user, money(2_500), &k))).await;
    let receipts: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    assert!(receipts.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ctx.wallets.get_wallet(user).await.unwrap().balance, money(2_500));
}
