//! Devnet Wallet Library
//!
//! Wallet tooling for Solana test networks:
//!
//! 1. **HD wallet generator**: create or import a BIP-39 mnemonic and derive
//!    sequential addresses from it along a BIP-44 path template.
//!
//! 2. **Token tools**: request SOL airdrops, list the SPL token balances held
//!    by the connected wallet, and transfer SPL tokens, creating the
//!    recipient's associated token account when it does not exist yet.

pub mod api;
pub mod config;
pub mod services;
pub mod solana;
pub mod types;
pub mod wallet;

pub use config::{Cluster, Config, WalletKind};
pub use services::{AirdropError, SharedTransferForm, TokenLister, TransferError, TransferForm};
pub use solana::{Pubkey, RpcClient, SolanaRpc};
pub use types::{AirdropReceipt, Commitment, DerivedWallet, TokenBalance, TransferReceipt, TransferRequest};
pub use wallet::{ConfiguredWallet, GeneratorSession, WalletAdapter};
