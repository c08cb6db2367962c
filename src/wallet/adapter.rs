//! Wallet adapters: the connected-wallet capability used by the token tools
//!
//! Every adapter exposes the same three capabilities (connect, report the
//! public key, sign-and-send). The concrete adapter is chosen from
//! configuration through [`ConfiguredWallet`].

use crate::config::{Config, WalletKind};
use crate::solana::{Instruction, Message, Pubkey, RpcError, SolanaRpc, Transaction, TransactionError};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use rand::RngCore;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Failed to read keypair file {path}: {reason}")]
    KeypairFile { path: String, reason: String },

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Capability interface shared by every wallet kind
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Display name of the wallet kind
    fn name(&self) -> &'static str;

    /// Connect (load or create the key) and return the account address.
    /// Connecting an already connected wallet returns the same address.
    async fn connect(&mut self) -> Result<Pubkey, WalletError>;

    /// `None` until connected
    fn public_key(&self) -> Option<Pubkey>;

    /// Sign `instructions` as one transaction paid by this wallet and submit it.
    async fn sign_and_send(
        &self,
        instructions: &[Instruction],
        rpc: &dyn SolanaRpc,
    ) -> Result<String, WalletError>;
}

fn pubkey_of(key: &SigningKey) -> Pubkey {
    Pubkey::new_from_array(key.verifying_key().to_bytes())
}

/// Compile against a fresh blockhash, sign with `key` and submit.
async fn sign_and_submit(
    key: &SigningKey,
    instructions: &[Instruction],
    rpc: &dyn SolanaRpc,
) -> Result<String, WalletError> {
    let payer = pubkey_of(key);
    let blockhash = rpc.get_latest_blockhash().await?;

    let message = Message::compile(instructions, &payer, blockhash)?;
    let mut transaction = Transaction::new_unsigned(message);
    transaction.sign(key)?;
    transaction.verify_complete()?;

    debug!(
        "[Wallet] Submitting {} instruction(s) paid by {}",
        instructions.len(),
        payer
    );
    let signature = rpc.send_transaction(&transaction).await?;
    info!("[Wallet] Submitted transaction {}", signature);
    Ok(signature)
}

/// Parse a Solana CLI keypair file: a JSON array of 64 bytes (secret then public)
pub fn parse_keypair_json(contents: &str) -> Result<SigningKey, WalletError> {
    let bytes: Vec<u8> = serde_json::from_str(contents)
        .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
    let array: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::InvalidKeypair(format!("expected 64 bytes, got {}", bytes.len())))?;

    SigningKey::from_keypair_bytes(&array).map_err(|e| WalletError::InvalidKeypair(e.to_string()))
}

/// Wallet backed by a keypair file on disk
pub struct KeypairFileWallet {
    path: PathBuf,
    key: Option<SigningKey>,
}

impl KeypairFileWallet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: None,
        }
    }
}

#[async_trait]
impl WalletAdapter for KeypairFileWallet {
    fn name(&self) -> &'static str {
        "Keypair File"
    }

    async fn connect(&mut self) -> Result<Pubkey, WalletError> {
        if let Some(key) = &self.key {
            return Ok(pubkey_of(key));
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WalletError::KeypairFile {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let key = parse_keypair_json(&contents)?;
        let pubkey = pubkey_of(&key);

        info!("[Wallet] Connected keypair {} from {}", pubkey, self.path.display());
        self.key = Some(key);
        Ok(pubkey)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.key.as_ref().map(pubkey_of)
    }

    async fn sign_and_send(
        &self,
        instructions: &[Instruction],
        rpc: &dyn SolanaRpc,
    ) -> Result<String, WalletError> {
        let key = self.key.as_ref().ok_or(WalletError::NotConnected)?;
        sign_and_submit(key, instructions, rpc).await
    }
}

/// Throwaway in-memory wallet, lost when the process exits
#[derive(Default)]
pub struct BurnerWallet {
    key: Option<SigningKey>,
}

impl BurnerWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Burner with a fixed secret, already connected
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            key: Some(SigningKey::from_bytes(&secret)),
        }
    }
}

#[async_trait]
impl WalletAdapter for BurnerWallet {
    fn name(&self) -> &'static str {
        "Burner"
    }

    async fn connect(&mut self) -> Result<Pubkey, WalletError> {
        let key = self.key.get_or_insert_with(|| {
            let mut secret = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            SigningKey::from_bytes(&secret)
        });
        let pubkey = pubkey_of(key);
        info!("[Wallet] Connected burner wallet {}", pubkey);
        Ok(pubkey)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.key.as_ref().map(pubkey_of)
    }

    async fn sign_and_send(
        &self,
        instructions: &[Instruction],
        rpc: &dyn SolanaRpc,
    ) -> Result<String, WalletError> {
        let key = self.key.as_ref().ok_or(WalletError::NotConnected)?;
        sign_and_submit(key, instructions, rpc).await
    }
}

/// The wallet kind selected by configuration
pub enum ConfiguredWallet {
    Keypair(KeypairFileWallet),
    Burner(BurnerWallet),
}

impl ConfiguredWallet {
    pub fn from_config(config: &Config) -> Self {
        match config.wallet_kind {
            WalletKind::Keypair => {
                ConfiguredWallet::Keypair(KeypairFileWallet::new(config.keypair_path.clone()))
            }
            WalletKind::Burner => ConfiguredWallet::Burner(BurnerWallet::new()),
        }
    }

    fn inner(&self) -> &dyn WalletAdapter {
        match self {
            ConfiguredWallet::Keypair(w) => w,
            ConfiguredWallet::Burner(w) => w,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn WalletAdapter {
        match self {
            ConfiguredWallet::Keypair(w) => w,
            ConfiguredWallet::Burner(w) => w,
        }
    }
}

#[async_trait]
impl WalletAdapter for ConfiguredWallet {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn connect(&mut self) -> Result<Pubkey, WalletError> {
        self.inner_mut().connect().await
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.inner().public_key()
    }

    async fn sign_and_send(
        &self,
        instructions: &[Instruction],
        rpc: &dyn SolanaRpc,
    ) -> Result<String, WalletError> {
        self.inner().sign_and_send(instructions, rpc).await
    }
}
