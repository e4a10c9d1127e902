//! Ledger read routes and operator actions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use kudi_core::ledger::{EntryCategory, LedgerAccount, LedgerEntry, LedgerError};
use kudi_core::reconciliation::ReconciliationReport;
use kudi_core::wallet::TransferOutcome;
use kudi_shared::AppError;
use kudi_shared::types::{PageRequest, PageResponse, TraceId};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::Actor;

/// Creates the ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ledger/traces/{trace_id}", get(get_trace))
        .route("/ledger/traces/{trace_id}/resolve", post(resolve_trace))
        .route("/ledger/accounts/{account}", get(account_statement))
        .route("/ledger/reconciliation", get(reconciliation_report))
}

/// Query parameters for an account statement.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// Only entries of this category.
    pub category: Option<EntryCategory>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (max 100).
    pub per_page: Option<u32>,
}

/// Request body for settling a pending transfer.
#[derive(Debug, Deserialize)]
pub struct ResolveTraceRequest {
    /// What the provider reported on requery.
    pub outcome: TransferOutcome,
    /// Provider's transaction reference, if known.
    pub provider_txn_id: Option<String>,
    /// Provider's session reference, if known.
    pub session_id: Option<String>,
}

async fn get_trace(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(trace_id): Path<TraceId>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let entries = state.ledger.get_by_trace_id(trace_id).await?;
    if entries.is_empty() {
        return Err(AppError::from(LedgerError::TraceNotFound(trace_id)).into());
    }
    Ok(Json(entries))
}

async fn resolve_trace(
    State(state): State<AppState>,
    Actor(operator): Actor,
    Path(trace_id): Path<TraceId>,
    Json(request): Json<ResolveTraceRequest>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    info!(
        trace_id = %trace_id,
        operator = %operator,
        outcome = ?request.outcome,
        "Resolving pending transfer"
    );
    let entries = state
        .wallets
        .resolve_pending_transfer(
            trace_id,
            request.outcome,
            request.provider_txn_id,
            request.session_id,
        )
        .await?;
    Ok(Json(entries))
}

async fn account_statement(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(account): Path<String>,
    Query(query): Query<StatementQuery>,
) -> ApiResult<Json<PageResponse<LedgerEntry>>> {
    let account: LedgerAccount = account.parse().map_err(AppError::from)?;
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };

    let statement = state
        .ledger
        .list_by_account(&account, query.category, &page)
        .await?;
    Ok(Json(statement))
}

async fn reconciliation_report(
    State(state): State<AppState>,
    Actor(_): Actor,
) -> ApiResult<Json<ReconciliationReport>> {
    Ok(Json(state.reconciliation.run().await?))
}
