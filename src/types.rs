//! Core types shared by the wallet tools

use crate::solana::Pubkey;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A wallet derived from the session mnemonic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedWallet {
    /// Position in the derivation sequence, starting at 0
    pub index: u32,
    /// Full derivation path used for this wallet
    pub path: String,
    /// Checksummed 0x address
    pub address: String,
}

/// One SPL token balance held by an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Token account holding the balance
    pub account: Pubkey,
    pub mint: Pubkey,
    /// Raw amount in base units
    pub amount: u64,
    pub decimals: u8,
    /// Human-readable quantity (`amount / 10^decimals`)
    pub ui_amount: Decimal,
}

/// Raw transfer form input, exactly as the user typed it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub mint: String,
    #[serde(default)]
    pub amount: String,
}

impl TransferRequest {
    pub fn new(recipient: impl Into<String>, mint: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            mint: mint.into(),
            amount: amount.into(),
        }
    }
}

/// Outcome of a confirmed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub signature: String,
    pub amount_base_units: u64,
    pub decimals: u8,
    /// Whether the recipient's associated token account was created in the same transaction
    pub created_recipient_account: bool,
    pub confirmed_at: DateTime<Utc>,
}

/// Outcome of a confirmed airdrop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirdropReceipt {
    pub signature: String,
    pub lamports: u64,
    /// Balance of the wallet after confirmation
    pub balance_lamports: u64,
}

/// Commitment level a signature must reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Default for Commitment {
    fn default() -> Self {
        Commitment::Confirmed
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Commitment::Processed => write!(f, "processed"),
            Commitment::Confirmed => write!(f, "confirmed"),
            Commitment::Finalized => write!(f, "finalized"),
        }
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level: {}", other)),
        }
    }
}

/// Format lamports as SOL for display
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
    }

    #[test]
    fn test_commitment_parse() {
        assert_eq!("Finalized".parse::<Commitment>().unwrap(), Commitment::Finalized);
        assert!("rooted".parse::<Commitment>().is_err());
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), dec!(1.5));
        assert_eq!(lamports_to_sol(0), dec!(0));
    }
}
