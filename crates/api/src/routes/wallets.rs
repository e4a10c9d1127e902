//! Wallet routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use kudi_core::wallet::{FundingReceipt, TransferReceipt, TransferRequest, Wallet};
use kudi_shared::types::{Currency, Money};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::{Actor, IdempotencyHeader};

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", post(open_wallet))
        .route("/wallets/me", get(get_wallet))
        .route("/wallets/fund", post(fund_wallet))
        .route("/wallets/transfers", post(transfer_funds))
}

/// Request body for opening a wallet.
#[derive(Debug, Deserialize)]
pub struct OpenWalletRequest {
    /// The wallet's account reference at the provider.
    pub account_ref: String,
    /// Wallet currency.
    #[serde(default = "default_currency")]
    pub currency: Currency,
}

fn default_currency() -> Currency {
    Currency::Ngn
}

/// Request body for funding a wallet.
#[derive(Debug, Deserialize)]
pub struct FundWalletRequest {
    /// Amount in minor units.
    pub amount: Money,
}

async fn open_wallet(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Json(request): Json<OpenWalletRequest>,
) -> ApiResult<(StatusCode, Json<Wallet>)> {
    let wallet = state
        .wallets
        .open_wallet(user_id, &request.account_ref, request.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

async fn get_wallet(
    State(state): State<AppState>,
    Actor(user_id): Actor,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(state.wallets.get_wallet(user_id).await?))
}

async fn fund_wallet(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    IdempotencyHeader(key): IdempotencyHeader,
    Json(request): Json<FundWalletRequest>,
) -> ApiResult<Json<FundingReceipt>> {
    let receipt = state.wallets.fund_wallet(user_id, request.amount, &key).await?;
    Ok(Json(receipt))
}

async fn transfer_funds(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    IdempotencyHeader(key): IdempotencyHeader,
    Json(request): Json<TransferRequest>,
) -> ApiResult<Json<TransferReceipt>> {
    let receipt = state.wallets.transfer_funds(user_id, request, &key).await?;
    Ok(Json(receipt))
}
