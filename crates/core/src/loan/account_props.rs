//! Property-based tests for the loan state machine.
//!
//! Feature: loan-lifecycle
//! - Property 1: Outstanding is fully explained by history
//! - Property 2: Repayment monotonicity
//! - Property 3: Penalty idempotence per day

use chrono::{Duration, Utc};
use proptest::prelude::*;

use kudi_shared::config::LoanConfig;
use kudi_shared::types::{Money, TraceId, UserId};

use super::pricing::LoanPricing;
use super::types::{
    DisbursementOverrides, HistoryAction, LoanAccount, LoanCategory, NewLoanRequest,
    PaymentStatus,
};

fn pricing() -> LoanPricing {
    LoanPricing::from_config(&LoanConfig::default()).unwrap()
}

fn arb_category() -> impl Strategy<Value = LoanCategory> {
    prop_oneof![
        Just(LoanCategory::Working),
        Just(LoanCategory::Personal),
        Just(LoanCategory::Business),
        Just(LoanCategory::Emergency),
    ]
}

fn disbursed(principal: i64, category: LoanCategory, days: u32) -> LoanAccount {
    let mut loan = LoanAccount::open(
        UserId::new(),
        &NewLoanRequest {
            principal: Money::new(principal).unwrap(),
            category,
            duration_days: days,
        },
        Utc::now(),
    )
    .unwrap();
    loan.disburse(
        &pricing(),
        DisbursementOverrides::default(),
        TraceId::new(),
        Utc::now(),
    )
    .unwrap();
    loan
}

/// Replays history: increases add, repayments subtract.
fn replay(loan: &LoanAccount) -> i64 {
    loan.history.iter().fold(0i64, |acc, h| {
        if h.action.increases_outstanding() {
            acc + h.amount.minor()
        } else {
            acc - h.amount.minor()
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Outstanding is fully explained by history
    // =========================================================================

    /// After any mix of repayments and penalties, replaying history yields outstanding.
    #[test]
    fn prop_history_replays_to_outstanding(
        principal in 1_000i64..10_000_000,
        category in arb_category(),
        days in 1u32..=365,
        repayments in prop::collection::vec(1i64..5_000_000, 0..8),
        penalty_days in 0u32..5,
    ) {
        let mut loan = disbursed(principal, category, days);
        let p = pricing();
        let mut when = Utc::now() + Duration::days(i64::from(days) + 1);

        for _ in 0..penalty_days {
            if loan.outstanding.is_zero() {
                break;
            }
            loan.apply_penalty(&p, when.date_naive(), TraceId::new(), when).unwrap();
            when += Duration::days(1);
        }
        for amount in repayments {
            if loan.outstanding.is_zero() {
                break;
            }
            loan.apply_repayment(Money::new(amount).unwrap(), TraceId::new(), when).unwrap();
        }

        prop_assert_eq!(replay(&loan), loan.outstanding.minor());
        prop_assert_eq!(
            loan.history.last().map(|h| h.resulting_outstanding),
            Some(loan.outstanding)
        );
        let sequences: Vec<i32> = loan.history.iter().map(|h| h.sequence).collect();
        let expected: Vec<i32> = (1..=i32::try_from(sequences.len()).unwrap()).collect();
        prop_assert_eq!(sequences, expected);
    }

    // =========================================================================
    // Property 2: Repayment monotonicity
    // =========================================================================

    /// Partial repayments strictly decrease outstanding and keep the loan in progress;
    /// repayments covering the balance complete it.
    #[test]
    fn prop_repayment_monotonicity(
        principal in 1_000i64..10_000_000,
        category in arb_category(),
        parts in prop::collection::vec(1i64..1_000_000, 1..10),
    ) {
        let mut loan = disbursed(principal, category, 30);

        for part in parts {
            if loan.outstanding.is_zero() {
                break;
            }
            let before = loan.outstanding;
            let paid = loan
                .apply_repayment(Money::new(part).unwrap(), TraceId::new(), Utc::now())
                .unwrap();
            prop_assert!(loan.outstanding < before);
            prop_assert_eq!(paid, Money::new(part).unwrap().min(before));
            if loan.outstanding.is_zero() {
                prop_assert_eq!(loan.payment_status, PaymentStatus::Complete);
            } else {
                prop_assert_eq!(loan.payment_status, PaymentStatus::InProgress);
            }
        }

        if loan.outstanding.is_positive() {
            let rest = loan.outstanding;
            loan.apply_repayment(rest, TraceId::new(), Utc::now()).unwrap();
        }
        prop_assert!(loan.outstanding.is_zero());
        prop_assert_eq!(loan.payment_status, PaymentStatus::Complete);
    }

    // =========================================================================
    // Property 3: Penalty idempotence per day
    // =========================================================================

    /// Charging the same calendar day repeatedly changes outstanding only once.
    #[test]
    fn prop_penalty_once_per_day(
        principal in 1_000i64..10_000_000,
        attempts in 2usize..6,
    ) {
        let mut loan = disbursed(principal, LoanCategory::Personal, 7);
        let p = pricing();
        let when = Utc::now() + Duration::days(10);
        let today = when.date_naive();
        let before = loan.outstanding;

        let mut charged = 0;
        for _ in 0..attempts {
            if loan.apply_penalty(&p, today, TraceId::new(), when).is_ok() {
                charged += 1;
            }
        }

        prop_assert_eq!(charged, 1);
        let expected = before.checked_add(p.daily_penalty(loan.principal).unwrap()).unwrap();
        prop_assert_eq!(loan.outstanding, expected);
        let penalties = loan
            .history
            .iter()
            .filter(|h| h.action == HistoryAction::Penalty)
            .count();
        prop_assert_eq!(penalties, 1);
    }
}
