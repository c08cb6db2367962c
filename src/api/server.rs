//! Axum server setup and configuration

use crate::api::routes;
use crate::services::{SharedTransferForm, TokenLister, TransferForm, TransferSettings};
use crate::solana::{RpcClient, SolanaRpc};
use crate::wallet::{ConfiguredWallet, GeneratorSession, WalletAdapter};
use crate::Config;
use crate::api::routes::api_error;
use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rpc: Arc<dyn SolanaRpc>,
    /// Connected once at startup
    pub wallet: Arc<dyn WalletAdapter>,
    pub generator: Arc<Mutex<GeneratorSession>>,
    pub lister: Arc<Mutex<TokenLister>>,
    pub transfer: SharedTransferForm,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let rpc = RpcClient::new(config.rpc_url.clone(), config.rpc_settings())
            .context("Failed to build RPC client")?;

        let mut wallet = ConfiguredWallet::from_config(&config);
        let address = wallet
            .connect()
            .await
            .with_context(|| format!("Failed to connect {} wallet", wallet.name()))?;
        info!("Connected {} wallet {}", wallet.name(), address);

        Self::with_parts(config, Arc::new(rpc), Arc::new(wallet))
    }

    /// Assemble state around an existing RPC client and wallet
    pub fn with_parts(
        config: Config,
        rpc: Arc<dyn SolanaRpc>,
        wallet: Arc<dyn WalletAdapter>,
    ) -> Result<Self> {
        let generator = GeneratorSession::with_path_template(&config.derivation_path)?;
        let transfer = SharedTransferForm::new(TransferForm::new(TransferSettings::from_config(&config)));

        Ok(Self {
            config: Arc::new(config),
            rpc,
            wallet,
            generator: Arc::new(Mutex::new(generator)),
            lister: Arc::new(Mutex::new(TokenLister::new())),
            transfer,
        })
    }
}

/// Create the Axum application with all routes.
///
/// Only origins listed in `ALLOWED_ORIGINS` get CORS headers, and any
/// request carrying another `Origin` is refused before it reaches a handler.
pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring allowed origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Generator routes
        .route("/generator/mnemonic", post(routes::generator::create_mnemonic))
        .route(
            "/generator/wallets",
            get(routes::generator::list_wallets).post(routes::generator::derive_wallet),
        )
        // Wallet routes
        .route("/wallet", get(routes::wallet::get_wallet))
        .route("/airdrop", post(routes::wallet::airdrop))
        .route("/tokens", get(routes::tokens::list_tokens))
        // Transfer routes
        .route(
            "/transfer",
            get(routes::transfer::transfer_status).post(routes::transfer::submit_transfer),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(middleware::from_fn_with_state(state.clone(), reject_foreign_origin))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browsers attach `Origin` to cross-site requests; tools like curl do not.
async fn reject_foreign_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| state.config.is_origin_allowed(o))
            .unwrap_or(false);
        if !allowed {
            warn!("Refused {} {} from origin {:?}", request.method(), request.uri(), origin);
            return api_error(StatusCode::FORBIDDEN, "Origin not allowed").into_response();
        }
    }
    next.run(request).await
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}


#[cfg(test)]
mod tests {
    use super::test_support::{state_with_config, WALLET_SECRET};
    use super::*;
    use crate::solana::get_associated_token_address;
    use crate::solana::mock::MockRpc;
    use crate::solana::Pubkey;
    use crate::wallet::BurnerWallet;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    const LOCAL_UI: &str = "http://localhost:5173";

    fn mint() -> Pubkey {
        Pubkey::new_from_array([44u8; 32])
    }

    /// Funded sender so a transfer would go through if the request got that far
    fn funded_app() -> (Router, Arc<MockRpc>) {
        let owner = BurnerWallet::from_secret(WALLET_SECRET).public_key().unwrap();
        let rpc = MockRpc::new()
            .with_mint(mint(), 9)
            .with_account(get_associated_token_address(&owner, &mint()));
        let config = Config {
            allowed_origins: vec![LOCAL_UI.to_string()],
            ..Config::default()
        };
        let (state, rpc) = state_with_config(config, rpc);
        (create_app(state), rpc)
    }

    fn transfer_request(origin: Option<&str>) -> Request<Body> {
        let body = json!({
            "recipient": Pubkey::new_from_array([55u8; 32]).to_string(),
            "mint": mint().to_string(),
            "amount": "1"
        });
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/transfer")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_foreign_origin_cannot_transfer() {
        let (app, rpc) = funded_app();

        let response = app
            .oneshot(transfer_request(Some("https://evil.example")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(rpc.calls().is_empty());
        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_preflight_gets_no_cors_headers() {
        let (app, _) = funded_app();

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/generator/wallets")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(preflight).await.unwrap();

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_mnemonic_hidden_from_foreign_origin() {
        let (app, _) = funded_app();

        let request = Request::builder()
            .uri("/api/generator/wallets")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_allowed_origin_is_echoed() {
        let (app, rpc) = funded_app();

        let response = app.oneshot(transfer_request(Some(LOCAL_UI))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static(LOCAL_UI))
        );
        assert_eq!(rpc.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_request_without_origin_is_served() {
        let (app, rpc) = funded_app();

        let response = app.oneshot(transfer_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rpc.sent().len(), 1);
    }
}
