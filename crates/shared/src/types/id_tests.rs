use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_v7() {
    assert_eq!(LedgerEntryId::new().into_inner().get_version_num(), 7);
    assert_eq!(TraceId::default().into_inner().get_version_num(), 7);
}

#[test]
fn test_entry_ids_sort_by_creation() {
    let first = LedgerEntryId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = LedgerEntryId::new();
    assert!(first.into_inner() < second.into_inner());
}

#[test]
fn test_round_trips_through_text() {
    let uuid = Uuid::now_v7();
    let loan = LoanId::from_uuid(uuid);
    assert_eq!(loan.to_string(), uuid.to_string());
    assert_eq!(LoanId::from_str(&loan.to_string()).unwrap(), loan);
}

#[test]
fn test_rejects_malformed_text() {
    assert!(UserId::from_str("alice").is_err());
    assert!(TraceId::from_str("").is_err());
}

#[test]
fn test_serializes_as_bare_uuid() {
    let uuid = Uuid::now_v7();
    let wallet = WalletId::from_uuid(uuid);
    assert_eq!(
        serde_json::to_string(&wallet).unwrap(),
        format!("\"{uuid}\"")
    );
    let back: WalletId = serde_json::from_str(&format!("\"{uuid}\"")).unwrap();
    assert_eq!(back, wallet);
}
