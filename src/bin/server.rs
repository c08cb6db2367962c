//! Devnet Wallet Web Server
//!
//! HTTP interface for the mnemonic generator and the SPL token tools.

use anyhow::{Context, Result};
use devnet_wallet::api::{create_app, AppState};
use devnet_wallet::Config;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Override with RUST_LOG, e.g. RUST_LOG=devnet_wallet=debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       DEVNET WALLET - WEB SERVER                             ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  RPC:        {:<47} ║", config.rpc_url);
    println!("║  Wallet:     {:<47} ║", config.wallet_kind.to_string());
    println!("║  Commitment: {:<47} ║", config.commitment.to_string());
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    info!("Initializing application state...");
    let state = AppState::new(config.clone()).await?;

    let app = create_app(state);

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("Invalid SERVER_ADDR: {}", config.server_addr))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    println!();
    println!("  API:    http://{}/api", addr);
    println!("  Health: http://{}/health", addr);
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}
