//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every money-moving flow runs inside one explicit database transaction.

mod convert;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod loan;
pub mod penalty;
pub mod reconciliation;
pub mod wallet;

pub use error::RepositoryError;
pub use idempotency::IdempotencyRepository;
pub use ledger::LedgerRepository;
pub use loan::LoanRepository;
pub use penalty::PenaltyJob;
pub use reconciliation::ReconciliationJob;
pub use wallet::WalletRepository;
