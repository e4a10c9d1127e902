//! Kudi API Server
//!
//! Main entry point for the Kudi lending and wallet service.

mod scheduler;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kudi_api::{AppState, create_router};
use kudi_core::provider::ProviderClient;
use kudi_db::{IdempotencyRepository, PenaltyJob, connect};
use kudi_provider::HttpProviderClient;
use kudi_shared::AppConfig;

use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kudi=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let provider: Arc<dyn ProviderClient> = Arc::new(HttpProviderClient::new(&config.provider)?);
    info!(
        provider = provider.name(),
        base_url = %config.provider.base_url,
        timeout_ms = config.provider.timeout_ms,
        "Wallet provider configured"
    );

    let state = AppState::new(db.clone(), &config, provider)?;

    let scheduler = Scheduler {
        penalties: PenaltyJob::new(state.loans.clone()),
        reconciliation: state.reconciliation.clone(),
        idempotency: IdempotencyRepository::new(db, &config.idempotency),
    };
    scheduler.spawn(&config.jobs);

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
