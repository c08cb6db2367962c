//! Token balances held by the connected account

use crate::solana::{Pubkey, SolanaRpc};
use crate::types::TokenBalance;
use tracing::{debug, warn};

/// Last fetched token list for the connected account.
///
/// Every refresh replaces the list wholesale. A failed query is logged and
/// leaves the previous list in place.
#[derive(Debug, Default)]
pub struct TokenLister {
    owner: Option<Pubkey>,
    tokens: Vec<TokenBalance>,
}

impl TokenLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-query balances for `owner`. Does nothing when no account is connected.
    pub async fn refresh(&mut self, owner: Option<Pubkey>, rpc: &dyn SolanaRpc) -> &[TokenBalance] {
        let Some(owner) = owner else {
            return &self.tokens;
        };

        match rpc.get_token_accounts_by_owner(&owner).await {
            Ok(tokens) => {
                debug!("[Tokens] {} holds {} token account(s)", owner, tokens.len());
                self.tokens = tokens;
            }
            Err(e) => {
                warn!("[Tokens] Failed to fetch token accounts for {}: {}", owner, e);
            }
        }

        &self.tokens
    }

    /// Refresh when the connected account differs from the last one seen.
    /// Returns whether a change was observed.
    pub async fn account_changed(&mut self, owner: Option<Pubkey>, rpc: &dyn SolanaRpc) -> bool {
        if owner == self.owner {
            return false;
        }
        self.owner = owner;
        self.refresh(owner, rpc).await;
        true
    }

    pub fn owner(&self) -> Option<Pubkey> {
        self.owner
    }

    pub fn tokens(&self) -> &[TokenBalance] {
        &self.tokens
    }

    /// Display lines for the token list
    pub fn render(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| format!("Mint: {}, Balance: {}", t.mint, t.ui_amount.normalize()))
            .collect()
    }
}
