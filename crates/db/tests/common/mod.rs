//! Shared fixtures for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database with the real migration
//! applied. The pool holds a single connection so the database lives as long
//! as the test.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kudi_core::idempotency::IdempotencyKey;
use kudi_core::loan::{DisbursementOverrides, LoanCategory, NewLoanRequest};
use kudi_core::provider::{
    AccountEnquiry, ProviderClient, ProviderError, ProviderTransfer, ProviderTransferResponse,
};
use kudi_db::migration::{Migrator, MigratorTrait};
use kudi_db::{
    IdempotencyRepository, LedgerRepository, LoanRepository, PenaltyJob, ReconciliationJob,
    WalletRepository,
};
use kudi_shared::config::{IdempotencyConfig, LoanConfig, ProviderConfig};
use kudi_shared::types::{Currency, LoanId, Money, UserId};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Provider call bound used by the fixtures.
pub const PROVIDER_TIMEOUT_MS: u64 = 100;

/// How the fake provider answers a transfer.
#[derive(Debug, Clone)]
pub enum TransferScript {
    /// Answers with status "00".
    Succeed,
    /// Answers with the given non-success status.
    Decline(&'static str),
    /// Sleeps past the provider timeout.
    Hang,
    /// Fails at the transport level.
    Unreachable,
    /// Accepts the request but answers with an unreadable body.
    Garble,
}

/// Scripted provider double.
#[derive(Debug)]
pub struct FakeProvider {
    balance: Mutex<i64>,
    script: Mutex<TransferScript>,
    transfers: AtomicUsize,
}

impl FakeProvider {
    pub fn new(balance: i64) -> Self {
        Self {
            balance: Mutex::new(balance),
            script: Mutex::new(TransferScript::Succeed),
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, script: TransferScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn set_balance(&self, balance: i64) {
        *self.balance.lock().unwrap() = balance;
    }

    /// Number of transfer instructions received.
    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn transfer(
        &self,
        request: &ProviderTransfer,
    ) -> Result<ProviderTransferResponse, ProviderError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        match script {
            TransferScript::Succeed => Ok(ProviderTransferResponse {
                status: "00".to_string(),
                provider_txn_id: format!("PRV-{}", request.reference),
                session_id: "SESSION-1".to_string(),
            }),
            TransferScript::Decline(status) => Ok(ProviderTransferResponse {
                status: status.to_string(),
                provider_txn_id: String::new(),
                session_id: String::new(),
            }),
            TransferScript::Hang => {
                tokio::time::sleep(Duration::from_millis(PROVIDER_TIMEOUT_MS * 5)).await;
                Ok(ProviderTransferResponse {
                    status: "00".to_string(),
                    provider_txn_id: "late".to_string(),
                    session_id: "late".to_string(),
                })
            }
            TransferScript::Unreachable => {
                Err(ProviderError::Transport("connection refused".to_string()))
            }
            TransferScript::Garble => Err(ProviderError::InvalidResponse(
                "expected value at line 1 column 1".to_string(),
            )),
        }
    }

    async fn account_enquiry(&self, account_ref: &str) -> Result<AccountEnquiry, ProviderError> {
        Ok(AccountEnquiry {
            balance: Money::new(*self.balance.lock().unwrap()).unwrap(),
            account_id: account_ref.to_string(),
            client_id: "CLIENT-1".to_string(),
            account_name: "Test Holder".to_string(),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Repositories wired against one in-memory database.
pub struct TestContext {
    pub db: DatabaseConnection,
    pub ledger: LedgerRepository,
    pub idempotency: IdempotencyRepository,
    pub wallets: WalletRepository,
    pub loans: LoanRepository,
    pub penalties: PenaltyJob,
    pub reconciliation: ReconciliationJob,
    pub provider: Arc<FakeProvider>,
}

pub async fn setup() -> TestContext {
    setup_with(LoanConfig::default()).await
}

pub async fn setup_with(loan_config: LoanConfig) -> TestContext {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to in-memory SQLite");
    Migrator::up(&db, None).await.expect("Migration failed");

    let idempotency_config = IdempotencyConfig {
        wait_attempts: 5,
        wait_interval_ms: 10,
        ..IdempotencyConfig::default()
    };
    let provider_config = ProviderConfig {
        timeout_ms: PROVIDER_TIMEOUT_MS,
        ..ProviderConfig::default()
    };

    let provider = Arc::new(FakeProvider::new(10_000_000));
    let idempotency = IdempotencyRepository::new(db.clone(), &idempotency_config);
    let ledger = LedgerRepository::new(db.clone());
    let wallets = WalletRepository::new(
        db.clone(),
        idempotency.clone(),
        provider.clone(),
        &provider_config,
    );
    let loans = LoanRepository::new(db.clone(), idempotency.clone(), &loan_config)
        .expect("valid loan config");

    TestContext {
        penalties: PenaltyJob::new(loans.clone()),
        reconciliation: ReconciliationJob::new(ledger.clone()),
        db,
        ledger,
        idempotency,
        wallets,
        loans,
        provider,
    }
}

pub fn money(minor: i64) -> Money {
    Money::new(minor).unwrap()
}

pub fn key(raw: &str) -> IdempotencyKey {
    IdempotencyKey::parse(Some(raw)).unwrap()
}

impl TestContext {
    /// Creates a user with an empty NGN wallet.
    pub async fn user_with_wallet(&self) -> UserId {
        let user = UserId::new();
        self.wallets
            .open_wallet(user, &format!("ACC-{user}"), Currency::Ngn)
            .await
            .unwrap();
        user
    }

    /// Funds the user's wallet under a fresh key.
    pub async fn fund(&self, user: UserId, minor: i64) {
        let key = key(&format!("fund-{}", uuid::Uuid::new_v4()));
        self.wallets.fund_wallet(user, money(minor), &key).await.unwrap();
    }

    /// Applies for and disburses a working-capital loan.
    pub async fn disbursed_loan(&self, user: UserId, principal: i64, days: u32) -> LoanId {
        let application = self
            .loans
            .create_loan(
                user,
                &NewLoanRequest {
                    principal: money(principal),
                    category: LoanCategory::Working,
                    duration_days: days,
                },
            )
            .await
            .unwrap();
        self.loans
            .disburse_loan(application.loan_id, UserId::new(), DisbursementOverrides::default())
            .await
            .unwrap();
        application.loan_id
    }
}
