//! Mnemonic generator endpoints

use super::{api_error, ApiError};
use crate::api::server::AppState;
use crate::types::DerivedWallet;
use crate::wallet::GeneratorError;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Create mnemonic request
#[derive(Debug, Default, Deserialize)]
pub struct MnemonicRequest {
    /// Import this phrase instead of generating a new one
    #[serde(default)]
    pub phrase: Option<String>,
}

/// Mnemonic response
#[derive(Debug, Serialize)]
pub struct MnemonicResponse {
    /// SHOWN IN PLAINTEXT - test networks only
    pub mnemonic: String,
    pub wallet_count: usize,
}

/// Derived wallets response
#[derive(Debug, Serialize)]
pub struct WalletsResponse {
    pub mnemonic: Option<String>,
    pub path_template: String,
    pub wallets: Vec<DerivedWallet>,
}

fn generator_error(err: GeneratorError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, err)
}

/// Generate (or import) the session mnemonic
pub async fn create_mnemonic(
    State(state): State<AppState>,
    body: Option<Json<MnemonicRequest>>,
) -> Result<Json<MnemonicResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mut session = state.generator.lock().await;

    let mnemonic = match req.phrase.as_deref().map(str::trim) {
        Some(phrase) if !phrase.is_empty() => {
            session.import(phrase).map_err(generator_error)?;
            phrase.to_string()
        }
        _ => session.generate().map_err(generator_error)?.to_string(),
    };

    Ok(Json(MnemonicResponse {
        mnemonic,
        wallet_count: session.wallets().len(),
    }))
}

/// Derive the next wallet from the session mnemonic
pub async fn derive_wallet(State(state): State<AppState>) -> Result<Json<DerivedWallet>, ApiError> {
    let mut session = state.generator.lock().await;
    let wallet = session.derive_next().map_err(generator_error)?;
    Ok(Json(wallet.clone()))
}

/// List the wallets derived so far
pub async fn list_wallets(State(state): State<AppState>) -> Json<WalletsResponse> {
    let session = state.generator.lock().await;
    Json(WalletsResponse {
        mnemonic: session.mnemonic().map(str::to_string),
        path_template: session.path_template().to_string(),
        wallets: session.wallets().to_vec(),
    })
}
