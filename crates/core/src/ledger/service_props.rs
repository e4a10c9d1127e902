//! Property-based tests for LedgerService.
//!
//! Feature: ledger-core
//! - Property 1: Double entries are balanced
//! - Property 2: Imbalance detection is exact

use proptest::prelude::*;

use kudi_shared::types::{Currency, Money, TraceId, UserId};

use super::service::LedgerService;
use super::types::{DoubleEntryInput, EntryCategory, EntryStatus, EntryType, LedgerAccount};

/// Strategy to generate positive minor-unit amounts.
fn positive_amount() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64).prop_map(|minor| Money::new(minor).unwrap())
}

fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        Just(EntryStatus::Pending),
        Just(EntryStatus::Completed),
        Just(EntryStatus::Failed),
    ]
}

fn arb_category() -> impl Strategy<Value = EntryCategory> {
    prop_oneof![
        Just(EntryCategory::Transfer),
        Just(EntryCategory::Loan),
        Just(EntryCategory::BillPayment),
        Just(EntryCategory::Settlement),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Double entries are balanced
    // =========================================================================

    /// A split pair always carries one debit and one credit of the same amount.
    #[test]
    fn prop_split_pair_is_balanced(
        amount in positive_amount(),
        status in arb_status(),
        category in arb_category(),
    ) {
        let input = DoubleEntryInput::completed(
            TraceId::new(),
            LedgerAccount::UserWallet(UserId::new()),
            LedgerAccount::Settlement,
            amount,
            Currency::Ngn,
            category,
            "transfer",
        )
        .with_status(status);

        let (debit, credit) = LedgerService::split_double_entry(input).unwrap();

        prop_assert_eq!(debit.entry_type, EntryType::Debit);
        prop_assert_eq!(credit.entry_type, EntryType::Credit);
        prop_assert_eq!(debit.amount, credit.amount);
        prop_assert_eq!(debit.trace_id, credit.trace_id);
        prop_assert_eq!(debit.status, status);
        prop_assert_eq!(credit.status, status);

        let rows = vec![
            (debit.trace_id, debit.entry_type, debit.amount),
            (credit.trace_id, credit.entry_type, credit.amount),
        ];
        prop_assert!(LedgerService::find_imbalances(rows).is_empty());
    }

    // =========================================================================
    // Property 2: Imbalance detection is exact
    // =========================================================================

    /// Any set of balanced pairs plus one dangling debit reports exactly that trace.
    #[test]
    fn prop_single_dangling_entry_detected(
        pairs in prop::collection::vec(positive_amount(), 0..20),
        dangling in positive_amount(),
    ) {
        let mut rows = Vec::new();
        for amount in &pairs {
            let trace = TraceId::new();
            rows.push((trace, EntryType::Debit, *amount));
            rows.push((trace, EntryType::Credit, *amount));
        }
        let broken = TraceId::new();
        rows.push((broken, EntryType::Debit, dangling));

        let imbalances = LedgerService::find_imbalances(rows);

        prop_assert_eq!(imbalances.len(), 1);
        prop_assert_eq!(imbalances[0].trace_id, broken);
        prop_assert_eq!(imbalances[0].total_debits, dangling.minor());
        prop_assert_eq!(imbalances[0].total_credits, 0);
    }

    /// Splitting one trace's credit into several parts keeps it balanced.
    #[test]
    fn prop_split_credits_stay_balanced(parts in prop::collection::vec(1i64..1_000_000i64, 1..10)) {
        let trace = TraceId::new();
        let total: i64 = parts.iter().sum();
        let mut rows = vec![(trace, EntryType::Debit, Money::new(total).unwrap())];
        rows.extend(
            parts
                .iter()
                .map(|p| (trace, EntryType::Credit, Money::new(*p).unwrap())),
        );

        prop_assert!(LedgerService::find_imbalances(rows).is_empty());
    }
}
