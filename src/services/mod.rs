//! Wallet-facing services: token listing, transfers and airdrops

pub mod airdrop;
pub mod token_lister;
pub mod transfer;

pub use airdrop::{ensure_test_cluster, request_airdrop, sol_to_lamports, AirdropError};
pub use token_lister::TokenLister;
pub use transfer::{
    plan_transfer, to_base_units, validate, FormSnapshot, SharedTransferForm, TransferError,
    TransferForm, TransferPlan, TransferSettings, TransferState, ValidatedTransfer,
};
