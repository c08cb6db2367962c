//! Connected wallet endpoints

use super::{api_error, ApiError};
use crate::api::server::AppState;
use crate::services::{ensure_test_cluster, request_airdrop, AirdropError};
use crate::types::{lamports_to_sol, AirdropReceipt};
use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Connected wallet response
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub adapter: &'static str,
    pub address: String,
    pub balance_lamports: u64,
    pub balance_sol: Decimal,
}

/// Airdrop request
#[derive(Debug, Deserialize)]
pub struct AirdropRequest {
    #[serde(default = "default_airdrop_sol")]
    pub sol: Decimal,
}

fn default_airdrop_sol() -> Decimal {
    Decimal::ONE
}

fn airdrop_error(err: AirdropError) -> ApiError {
    let status = if err.is_precondition() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    };
    api_error(status, err)
}

/// Address and SOL balance of the connected wallet
pub async fn get_wallet(State(state): State<AppState>) -> Result<Json<WalletResponse>, ApiError> {
    let owner = state
        .wallet
        .public_key()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Wallet not connected"))?;

    let balance_lamports = state
        .rpc
        .get_balance(&owner)
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.user_message()))?;

    Ok(Json(WalletResponse {
        adapter: state.wallet.name(),
        address: owner.to_string(),
        balance_lamports,
        balance_sol: lamports_to_sol(balance_lamports),
    }))
}

/// Request test SOL for the connected wallet
pub async fn airdrop(
    State(state): State<AppState>,
    Json(req): Json<AirdropRequest>,
) -> Result<Json<AirdropReceipt>, ApiError> {
    ensure_test_cluster(&state.config).map_err(airdrop_error)?;

    let receipt = request_airdrop(
        state.wallet.as_ref(),
        state.rpc.as_ref(),
        req.sol,
        state.config.commitment,
    )
    .await
    .map_err(airdrop_error)?;

    Ok(Json(receipt))
}
