//! Loan lifecycle routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use kudi_core::loan::{
    DisbursementOverrides, DisbursementReceipt, LoanAccount, LoanApplication, NewLoanRequest,
    RepaymentReceipt,
};
use kudi_shared::types::{LoanId, Money};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::{Actor, IdempotencyHeader};

/// Creates the loan routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", post(create_loan))
        .route("/loans/{loan_id}", get(get_loan))
        .route("/loans/{loan_id}/disburse", post(disburse_loan))
        .route("/loans/{loan_id}/reject", post(reject_loan))
        .route("/loans/{loan_id}/repayments", post(repay_loan))
}

/// Request body for rejecting a loan.
#[derive(Debug, Deserialize)]
pub struct RejectLoanRequest {
    /// Why the application was turned down.
    pub reason: String,
}

/// Request body for a repayment.
#[derive(Debug, Deserialize)]
pub struct RepayLoanRequest {
    /// Amount in minor units.
    pub amount: Money,
}

async fn create_loan(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Json(request): Json<NewLoanRequest>,
) -> ApiResult<(StatusCode, Json<LoanApplication>)> {
    let application = state.loans.create_loan(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn get_loan(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(loan_id): Path<LoanId>,
) -> ApiResult<Json<LoanAccount>> {
    Ok(Json(state.loans.get_loan(loan_id).await?))
}

/// The acting user is recorded as the approving admin.
async fn disburse_loan(
    State(state): State<AppState>,
    Actor(admin_id): Actor,
    Path(loan_id): Path<LoanId>,
    overrides: Option<Json<DisbursementOverrides>>,
) -> ApiResult<Json<DisbursementReceipt>> {
    let overrides = overrides.map(|Json(o)| o).unwrap_or_default();
    let receipt = state.loans.disburse_loan(loan_id, admin_id, overrides).await?;
    Ok(Json(receipt))
}

async fn reject_loan(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(loan_id): Path<LoanId>,
    Json(request): Json<RejectLoanRequest>,
) -> ApiResult<Json<LoanAccount>> {
    Ok(Json(state.loans.reject_loan(loan_id, &request.reason).await?))
}

async fn repay_loan(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    IdempotencyHeader(key): IdempotencyHeader,
    Path(loan_id): Path<LoanId>,
    Json(request): Json<RepayLoanRequest>,
) -> ApiResult<Json<RepaymentReceipt>> {
    let receipt = state
        .loans
        .repay_loan(loan_id, request.amount, &key, user_id)
        .await?;
    Ok(Json(receipt))
}
