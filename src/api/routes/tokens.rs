//! Token balance endpoint

use crate::api::server::AppState;
use crate::types::TokenBalance;
use axum::{extract::State, Json};
use serde::Serialize;

/// Token list response
#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub owner: Option<String>,
    pub tokens: Vec<TokenBalance>,
}

/// Refresh and return the connected wallet's token balances.
///
/// A failed query keeps serving the last successful list.
pub async fn list_tokens(State(state): State<AppState>) -> Json<TokensResponse> {
    let owner = state.wallet.public_key();
    let mut lister = state.lister.lock().await;

    if !lister.account_changed(owner, state.rpc.as_ref()).await {
        lister.refresh(owner, state.rpc.as_ref()).await;
    }

    Json(TokensResponse {
        owner: owner.map(|o| o.to_string()),
        tokens: lister.tokens().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::test_support::state_with;
    use crate::solana::mock::MockRpc;
    use crate::solana::{Pubkey, RpcError};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_failed_refresh_serves_previous_list() {
        let held = TokenBalance {
            account: Pubkey::new_from_array([1u8; 32]),
            mint: Pubkey::new_from_array([2u8; 32]),
            amount: 2_500_000,
            decimals: 6,
            ui_amount: dec!(2.5),
        };
        let (state, rpc) = state_with(MockRpc::new().with_tokens(vec![held.clone()]));

        let Json(first) = list_tokens(State(state.clone())).await;
        assert_eq!(first.tokens, vec![held.clone()]);

        rpc.fail_token_query(RpcError::Network("connection reset".to_string()));
        let Json(second) = list_tokens(State(state)).await;
        assert_eq!(second.tokens, vec![held]);
        assert_eq!(rpc.calls(), vec!["getTokenAccountsByOwner", "getTokenAccountsByOwner"]);
    }
}
