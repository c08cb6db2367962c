//! Configuration management for the wallet tools

use crate::solana::RpcSettings;
use crate::types::Commitment;
use crate::wallet::{validate_path_template, DEFAULT_DERIVATION_PATH};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which wallet adapter to connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    /// Solana CLI keypair file on disk
    Keypair,
    /// Ephemeral in-memory keypair
    Burner,
}

impl FromStr for WalletKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keypair" => Ok(WalletKind::Keypair),
            "burner" => Ok(WalletKind::Burner),
            other => anyhow::bail!("WALLET_KIND must be 'keypair' or 'burner', got '{}'", other),
        }
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletKind::Keypair => write!(f, "keypair"),
            WalletKind::Burner => write!(f, "burner"),
        }
    }
}

/// Configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,

    /// Wallet adapter to use
    pub wallet_kind: WalletKind,

    /// Keypair file for `WalletKind::Keypair`
    pub keypair_path: PathBuf,

    /// Commitment level transfers and airdrops wait for
    pub commitment: Commitment,

    /// Upper bound on waiting for confirmation
    pub confirm_timeout_seconds: u64,

    /// Signature status polling interval
    pub confirm_poll_ms: u64,

    /// HTTP request timeout
    pub rpc_timeout_seconds: u64,

    /// Use this precision instead of reading it from the mint account
    pub token_decimals_override: Option<u8>,

    /// Whether a transfer of zero tokens is submitted or rejected
    pub allow_zero_amount: bool,

    /// HD path template, must contain `{index}`
    pub derivation_path: String,

    /// Bind address for the HTTP server
    pub server_addr: String,

    /// Browser origins allowed to call the HTTP API, empty means none
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: Cluster::DEVNET_URL.to_string(),
            wallet_kind: WalletKind::Burner,
            keypair_path: default_keypair_path(),
            commitment: Commitment::Confirmed,
            confirm_timeout_seconds: 60,
            confirm_poll_ms: 500,
            rpc_timeout_seconds: 30,
            token_decimals_override: None,
            allow_zero_amount: false,
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
            server_addr: "127.0.0.1:3000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let rpc_url = env::var("SOLANA_RPC_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.rpc_url);

        let wallet_kind = match env::var("WALLET_KIND") {
            Ok(v) if !v.is_empty() => v.parse()?,
            _ => defaults.wallet_kind,
        };

        let keypair_path = env::var("KEYPAIR_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.keypair_path);

        let commitment = match env::var("COMMITMENT") {
            Ok(v) if !v.is_empty() => v.parse::<Commitment>().map_err(anyhow::Error::msg)?,
            _ => defaults.commitment,
        };

        let confirm_timeout_seconds = env::var("CONFIRM_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.confirm_timeout_seconds);

        let confirm_poll_ms = env::var("CONFIRM_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.confirm_poll_ms);

        let rpc_timeout_seconds = env::var("RPC_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rpc_timeout_seconds);

        let token_decimals_override = match env::var("TOKEN_DECIMALS_OVERRIDE") {
            Ok(v) if !v.is_empty() => Some(
                v.parse::<u8>()
                    .context("TOKEN_DECIMALS_OVERRIDE must be an integer between 0 and 255")?,
            ),
            _ => None,
        };

        let allow_zero_amount = env::var("ALLOW_ZERO_AMOUNT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let derivation_path = env::var("DERIVATION_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.derivation_path);
        validate_path_template(&derivation_path)?;

        let server_addr = env::var("SERVER_ADDR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.server_addr);

        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(v) => parse_origins(&v)?,
            Err(_) => defaults.allowed_origins,
        };

        Ok(Self {
            rpc_url,
            wallet_kind,
            keypair_path,
            commitment,
            confirm_timeout_seconds,
            confirm_poll_ms,
            rpc_timeout_seconds,
            token_decimals_override,
            allow_zero_amount,
            derivation_path,
            server_addr,
            allowed_origins,
        })
    }

    /// Settings for the JSON-RPC client
    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            commitment: self.commitment,
            request_timeout: Duration::from_secs(self.rpc_timeout_seconds),
            confirm_timeout: Duration::from_secs(self.confirm_timeout_seconds),
            poll_interval: Duration::from_millis(self.confirm_poll_ms),
        }
    }

    /// Whether the endpoint is a test cluster where airdrops work.
    ///
    /// Decided by host: the public devnet and testnet endpoints, loopback, and
    /// provider hosts naming devnet or testnet. Anything else counts as mainnet.
    pub fn is_test_cluster(&self) -> bool {
        let url = Cluster::url_for(self.rpc_url.trim());
        let Some(host) = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        else {
            return false;
        };

        if host.contains("mainnet") {
            return false;
        }
        matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]")
            || host.contains("devnet")
            || host.contains("testnet")
    }

    /// Whether a browser `Origin` header value may call the HTTP API
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Comma-separated origins such as `http://localhost:5173`
fn parse_origins(value: &str) -> Result<Vec<String>> {
    let mut origins = Vec::new();
    for origin in value.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if origin == "*" {
            anyhow::bail!("ALLOWED_ORIGINS must list explicit origins, '*' is not accepted");
        }
        let parsed = reqwest::Url::parse(origin)
            .with_context(|| format!("Invalid origin in ALLOWED_ORIGINS: {}", origin))?;
        if parsed.host_str().is_none() {
            anyhow::bail!("Origin in ALLOWED_ORIGINS has no host: {}", origin);
        }
        origins.push(origin.trim_end_matches('/').to_string());
    }
    Ok(origins)
}

/// Public cluster endpoints
pub struct Cluster;

impl Cluster {
    pub const DEVNET_URL: &'static str = "https://api.devnet.solana.com";
    pub const TESTNET_URL: &'static str = "https://api.testnet.solana.com";
    pub const MAINNET_URL: &'static str = "https://api.mainnet-beta.solana.com";

    /// Resolve a cluster moniker, passing explicit URLs through
    pub fn url_for(moniker: &str) -> String {
        match moniker {
            "devnet" | "d" => Self::DEVNET_URL.to_string(),
            "testnet" | "t" => Self::TESTNET_URL.to_string(),
            "mainnet-beta" | "mainnet" | "m" => Self::MAINNET_URL.to_string(),
            "localhost" | "l" => "http://127.0.0.1:8899".to_string(),
            url => url.to_string(),
        }
    }
}

/// `~/.config/solana/id.json`, the Solana CLI's default keypair location
fn default_keypair_path() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("solana").join("id.json"))
        .unwrap_or_else(|_| PathBuf::from("id.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_kind_parse() {
        assert_eq!("Keypair".parse::<WalletKind>().unwrap(), WalletKind::Keypair);
        assert_eq!("burner".parse::<WalletKind>().unwrap(), WalletKind::Burner);
        assert!("phantom".parse::<WalletKind>().is_err());
    }

    #[test]
    fn test_defaults_target_devnet() {
        let config = Config::default();
        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
        assert!(config.is_test_cluster());
        assert!(!config.allow_zero_amount);
        assert_eq!(config.rpc_settings().poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_test_cluster_by_host() {
        let cluster = |url: &str| Config {
            rpc_url: url.to_string(),
            ..Config::default()
        };

        assert!(cluster("https://api.devnet.solana.com/").is_test_cluster());
        assert!(cluster("https://api.testnet.solana.com").is_test_cluster());
        assert!(cluster("http://127.0.0.1:8899").is_test_cluster());
        assert!(cluster("localhost").is_test_cluster());
        assert!(cluster("https://devnet.helius-rpc.com/?api-key=abc").is_test_cluster());

        assert!(!cluster("https://api.mainnet-beta.solana.com/").is_test_cluster());
        assert!(!cluster("mainnet-beta").is_test_cluster());
        assert!(!cluster("https://mainnet.helius-rpc.com/?api-key=abc").is_test_cluster());
        assert!(!cluster("https://rpc.example.com").is_test_cluster());
        assert!(!cluster("not a url").is_test_cluster());
    }

    #[test]
    fn test_allowed_origins() {
        let origins = parse_origins(" http://localhost:5173/ , https://wallet.example ").unwrap();
        assert_eq!(origins, vec!["http://localhost:5173", "https://wallet.example"]);
        assert!(parse_origins("*").is_err());
        assert!(parse_origins("not an origin").is_err());
        assert!(parse_origins("").unwrap().is_empty());

        let config = Config {
            allowed_origins: origins,
            ..Config::default()
        };
        assert!(config.is_origin_allowed("http://localhost:5173"));
        assert!(!config.is_origin_allowed("https://evil.example"));
        assert!(!Config::default().is_origin_allowed("http://localhost:5173"));
    }

    #[test]
    fn test_cluster_monikers() {
        assert_eq!(Cluster::url_for("devnet"), Cluster::DEVNET_URL);
        assert_eq!(Cluster::url_for("m"), Cluster::MAINNET_URL);
        assert_eq!(Cluster::url_for("http://node:8899"), "http://node:8899");
    }
}
