//! Solana JSON-RPC client
//!
//! [`SolanaRpc`] is the boundary every component talks to; [`RpcClient`]
//! implements it over HTTP with `reqwest`.

use super::pubkey::Pubkey;
use super::rpc_errors::{RpcError, RpcErrorObject};
use super::spl_token::TOKEN_PROGRAM_ID;
use super::transaction::Transaction;
use crate::types::{Commitment, TokenBalance};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Existence and ownership of an on-chain account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub executable: bool,
}

/// Blockchain RPC boundary used by the wallet tools
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Token balances held by `owner` under the SPL token program
    async fn get_token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenBalance>, RpcError>;

    /// `None` when the account does not exist
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError>;

    /// Decimals of a mint, `None` when the account is missing or not a mint
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<Option<u8>, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Submit a signed transaction, returning its Base58 signature
    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError>;

    /// Wait until `signature` reaches `commitment` or fails
    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> Result<(), RpcError>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<String, RpcError>;

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, RpcError>;
}

/// Tunables for the HTTP client and confirmation polling
#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub commitment: Commitment,
    pub request_timeout: Duration,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            request_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Many methods wrap their payload in `{ context, value }`
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedTokenAccount {
    pubkey: String,
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: UiTokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiTokenAmount {
    amount: String,
    decimals: u8,
    ui_amount_string: String,
}

#[derive(Debug, Deserialize)]
struct RawAccountInfo {
    lamports: u64,
    owner: String,
    #[serde(default)]
    executable: bool,
}

#[derive(Debug, Deserialize)]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    confirmation_status: Option<Commitment>,
    #[serde(default)]
    err: Option<Value>,
}

/// HTTP JSON-RPC client for a Solana cluster
pub struct RpcClient {
    client: Client,
    url: String,
    settings: RpcSettings,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, settings: RpcSettings) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| RpcError::from_network_error(&e))?;

        Ok(Self {
            client,
            url: url.into(),
            settings,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("[RPC] {} (id {})", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::from_network_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::from_network_error(&e))?;

        if !status.is_success() {
            return Err(RpcError::from_response(status.as_u16(), &body));
        }

        let parsed: RpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", method, e)))?;

        if let Some(err) = parsed.error {
            return Err(err.into());
        }

        parsed
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{}: missing result", method)))
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.settings.commitment.to_string() })
    }
}

fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey, RpcError> {
    Pubkey::from_str(value)
        .map_err(|e| RpcError::InvalidResponse(format!("{} '{}': {}", field, value, e)))
}

fn into_token_balance(keyed: KeyedTokenAccount) -> Result<TokenBalance, RpcError> {
    let info = keyed.account.data.parsed.info;
    let amount = info
        .token_amount
        .amount
        .parse::<u64>()
        .map_err(|e| RpcError::InvalidResponse(format!("token amount: {}", e)))?;
    let ui_amount = Decimal::from_str(&info.token_amount.ui_amount_string)
        .map_err(|e| RpcError::InvalidResponse(format!("token ui amount: {}", e)))?;

    Ok(TokenBalance {
        account: parse_pubkey(&keyed.pubkey, "token account")?,
        mint: parse_pubkey(&info.mint, "mint")?,
        amount,
        decimals: info.token_amount.decimals,
        ui_amount,
    })
}

#[async_trait]
impl SolanaRpc for RpcClient {
    async fn get_token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenBalance>, RpcError> {
        let accounts: WithContext<Vec<KeyedTokenAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "programId": TOKEN_PROGRAM_ID.to_string() },
                    { "encoding": "jsonParsed", "commitment": self.settings.commitment.to_string() }
                ]),
            )
            .await?;

        accounts.value.into_iter().map(into_token_balance).collect()
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let info: WithContext<Option<RawAccountInfo>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.settings.commitment.to_string() }
                ]),
            )
            .await?;

        info.value
            .map(|raw| {
                Ok(AccountInfo {
                    lamports: raw.lamports,
                    owner: parse_pubkey(&raw.owner, "account owner")?,
                    executable: raw.executable,
                })
            })
            .transpose()
    }

    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<Option<u8>, RpcError> {
        let info: WithContext<Option<Value>> = self
            .call(
                "getAccountInfo",
                json!([
                    mint.to_string(),
                    { "encoding": "jsonParsed", "commitment": self.settings.commitment.to_string() }
                ]),
            )
            .await?;

        let Some(account) = info.value else {
            return Ok(None);
        };

        let parsed = &account["data"]["parsed"];
        if parsed["type"].as_str() != Some("mint") {
            warn!("[RPC] Account {} is not a token mint", mint);
            return Ok(None);
        }

        Ok(parsed["info"]["decimals"]
            .as_u64()
            .and_then(|d| u8::try_from(d).ok()))
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let latest: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;

        let bytes = bs58::decode(&latest.value.blockhash)
            .into_vec()
            .map_err(|e| RpcError::InvalidResponse(format!("blockhash: {}", e)))?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| RpcError::InvalidResponse(format!("blockhash has {} bytes", bytes.len())))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(transaction.serialize());
        self.call(
            "sendTransaction",
            json!([
                encoded,
                {
                    "encoding": "base64",
                    "preflightCommitment": self.settings.commitment.to_string()
                }
            ]),
        )
        .await
    }

    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> Result<(), RpcError> {
        let deadline = Instant::now() + self.settings.confirm_timeout;

        loop {
            let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
                .call("getSignatureStatuses", json!([[signature]]))
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(RpcError::TransactionFailed(err.to_string()));
                }
                // A missing level means the slot is already rooted
                let reached = status.confirmation_status.unwrap_or(Commitment::Finalized);
                if reached >= commitment {
                    debug!("[RPC] {} reached {}", signature, reached);
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(RpcError::ConfirmationTimeout {
                    signature: signature.to_string(),
                    seconds: self.settings.confirm_timeout.as_secs(),
                });
            }

            sleep(self.settings.poll_interval).await;
        }
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<String, RpcError> {
        self.call(
            "requestAirdrop",
            json!([to.to_string(), lamports, self.commitment_config()]),
        )
        .await
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, RpcError> {
        let balance: WithContext<u64> = self
            .call("getBalance", json!([owner.to_string(), self.commitment_config()]))
            .await?;
        Ok(balance.value)
    }
}
