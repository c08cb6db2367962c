//! Minimal Solana client layer
//!
//! Addresses, legacy transactions, SPL token instructions and a JSON-RPC
//! client, implemented directly on `ed25519-dalek`, `curve25519-dalek`,
//! `sha2` and `bs58` instead of the full `solana-sdk`.

pub mod pubkey;
pub mod rpc;
pub mod rpc_errors;
pub mod spl_token;
pub mod transaction;

#[cfg(test)]
pub mod mock;

pub use pubkey::{Pubkey, PubkeyError};
pub use rpc::{AccountInfo, RpcClient, RpcSettings, SolanaRpc};
pub use rpc_errors::RpcError;
pub use spl_token::{get_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
pub use transaction::{AccountMeta, Instruction, Message, Transaction, TransactionError};
