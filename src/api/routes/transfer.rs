//! Token transfer endpoints

use super::{api_error, ApiError};
use crate::api::server::AppState;
use crate::services::{FormSnapshot, TransferError};
use crate::types::{TransferReceipt, TransferRequest};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Successful transfer response
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub status: String,
    #[serde(flatten)]
    pub receipt: TransferReceipt,
}

fn status_for(err: &TransferError) -> StatusCode {
    match err {
        TransferError::InFlight => StatusCode::CONFLICT,
        TransferError::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Submit the transfer form
pub async fn submit_transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let receipt = state
        .transfer
        .submit(state.wallet.clone(), state.rpc.clone(), req)
        .await
        .map_err(|e| api_error(status_for(&e), e))?;

    Ok(Json(TransferResponse {
        status: "Transfer successful!".to_string(),
        receipt,
    }))
}

/// Current form state and last message
pub async fn transfer_status(State(state): State<AppState>) -> Json<FormSnapshot> {
    Json(state.transfer.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::test_support::{state_with, WALLET_SECRET};
    use crate::services::TransferState;
    use crate::solana::mock::MockRpc;
    use crate::solana::{get_associated_token_address, Pubkey};
    use crate::wallet::{BurnerWallet, WalletAdapter};

    fn mint() -> Pubkey {
        Pubkey::new_from_array([44u8; 32])
    }

    fn owner() -> Pubkey {
        BurnerWallet::from_secret(WALLET_SECRET)
            .public_key()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_fields_is_bad_request() {
        let (state, rpc) = state_with(MockRpc::new());

        let (status, Json(body)) = submit_transfer(State(state), Json(TransferRequest::default()))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Please fill all fields");
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let rpc = MockRpc::new()
            .with_mint(mint(), 9)
            .with_account(get_associated_token_address(&owner(), &mint()));
        let (state, _) = state_with(rpc);

        let req = TransferRequest::new(
            Pubkey::new_from_array([55u8; 32]).to_string(),
            mint().to_string(),
            "0.25",
        );
        let Json(resp) = submit_transfer(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(resp.status, "Transfer successful!");
        assert_eq!(resp.receipt.amount_base_units, 250_000_000);
        assert!(resp.receipt.created_recipient_account);

        let Json(snapshot) = transfer_status(State(state)).await;
        assert_eq!(snapshot.state, Some(TransferState::Idle));
    }

    #[tokio::test]
    async fn test_rpc_failure_is_bad_gateway() {
        let rpc = MockRpc::new()
            .with_mint(mint(), 9)
            .with_account(get_associated_token_address(&owner(), &mint()))
            .fail_send(crate::solana::RpcError::Network("connection refused".to_string()));
        let (state, _) = state_with(rpc);

        let req = TransferRequest::new(
            Pubkey::new_from_array([55u8; 32]).to_string(),
            mint().to_string(),
            "1",
        );
        let (status, Json(body)) = submit_transfer(State(state), Json(req)).await.unwrap_err();

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error.starts_with("Transfer failed:"));
    }
}
