//! HTTP API layer with Axum routes and request extractors.
//!
//! This crate provides:
//! - REST routes for loans, wallets, and the ledger
//! - Extractors for the acting user and idempotency key
//! - JSON error rendering

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use kudi_core::provider::ProviderClient;
use kudi_db::{
    IdempotencyRepository, LedgerRepository, LoanRepository, ReconciliationJob, RepositoryError,
    WalletRepository,
};
use kudi_shared::AppConfig;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// Ledger reads.
    pub ledger: LedgerRepository,
    /// Loan lifecycle.
    pub loans: LoanRepository,
    /// Wallets and provider-backed transfers.
    pub wallets: WalletRepository,
    /// On-demand ledger health check.
    pub reconciliation: ReconciliationJob,
}

impl AppState {
    /// Wires the repositories over one connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the loan pricing configuration is invalid.
    pub fn new(
        db: DatabaseConnection,
        config: &AppConfig,
        provider: Arc<dyn ProviderClient>,
    ) -> Result<Self, RepositoryError> {
        let idempotency = IdempotencyRepository::new(db.clone(), &config.idempotency);
        let ledger = LedgerRepository::new(db.clone());
        let loans = LoanRepository::new(db.clone(), idempotency.clone(), &config.loan)?;
        let wallets = WalletRepository::new(db.clone(), idempotency, provider, &config.provider);

        Ok(Self {
            reconciliation: ReconciliationJob::new(ledger.clone()),
            db,
            ledger,
            loans,
            wallets,
        })
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
