//! Wallet management
//!
//! HD wallet generation from a mnemonic, and the wallet adapters that sign
//! Solana transactions for the token tools.

mod adapter;
mod generator;

pub use adapter::{
    parse_keypair_json, BurnerWallet, ConfiguredWallet, KeypairFileWallet, WalletAdapter, WalletError,
};
pub use generator::{
    derive_address, validate_path_template, GeneratorError, GeneratorSession, DEFAULT_DERIVATION_PATH,
};
