//! In-memory [`SolanaRpc`] for flow tests
//!
//! Records every call by method name so tests can assert which network
//! operations ran.

use super::pubkey::Pubkey;
use super::rpc::{AccountInfo, SolanaRpc};
use super::rpc_errors::RpcError;
use super::spl_token::TOKEN_PROGRAM_ID;
use super::transaction::Transaction;
use crate::types::{Commitment, TokenBalance};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockRpc {
    pub existing_accounts: Mutex<HashSet<Pubkey>>,
    pub mint_decimals: Mutex<HashMap<Pubkey, u8>>,
    pub token_accounts: Mutex<Vec<TokenBalance>>,
    pub token_query_error: Mutex<Option<RpcError>>,
    pub send_error: Mutex<Option<RpcError>>,
    pub confirm_error: Mutex<Option<RpcError>>,
    pub balance: Mutex<u64>,
    pub calls: Mutex<Vec<&'static str>>,
    pub sent: Mutex<Vec<Transaction>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, address: Pubkey) -> Self {
        self.existing_accounts.lock().unwrap().insert(address);
        self
    }

    pub fn with_mint(self, mint: Pubkey, decimals: u8) -> Self {
        self.mint_decimals.lock().unwrap().insert(mint, decimals);
        self.with_account(mint)
    }

    pub fn with_tokens(self, tokens: Vec<TokenBalance>) -> Self {
        *self.token_accounts.lock().unwrap() = tokens;
        self
    }

    pub fn fail_token_query(&self, err: RpcError) {
        *self.token_query_error.lock().unwrap() = Some(err);
    }

    pub fn fail_send(self, err: RpcError) -> Self {
        *self.send_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_confirm(self, err: RpcError) -> Self {
        *self.confirm_error.lock().unwrap() = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

#[async_trait]
impl SolanaRpc for MockRpc {
    async fn get_token_accounts_by_owner(&self, _owner: &Pubkey) -> Result<Vec<TokenBalance>, RpcError> {
        self.record("getTokenAccountsByOwner");
        if let Some(err) = self.token_query_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.token_accounts.lock().unwrap().clone())
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        self.record("getAccountInfo");
        let exists = self.existing_accounts.lock().unwrap().contains(address);
        Ok(exists.then(|| AccountInfo {
            lamports: 2_039_280,
            owner: TOKEN_PROGRAM_ID,
            executable: false,
        }))
    }

    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<Option<u8>, RpcError> {
        self.record("getMintDecimals");
        Ok(self.mint_decimals.lock().unwrap().get(mint).copied())
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        self.record("getLatestBlockhash");
        Ok([7u8; 32])
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        self.record("sendTransaction");
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signature().unwrap_or_default())
    }

    async fn confirm_transaction(&self, _signature: &str, _commitment: Commitment) -> Result<(), RpcError> {
        self.record("confirmTransaction");
        match self.confirm_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn request_airdrop(&self, _to: &Pubkey, lamports: u64) -> Result<String, RpcError> {
        self.record("requestAirdrop");
        *self.balance.lock().unwrap() += lamports;
        Ok("airdrop-signature".to_string())
    }

    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64, RpcError> {
        self.record("getBalance");
        Ok(*self.balance.lock().unwrap())
    }
}
