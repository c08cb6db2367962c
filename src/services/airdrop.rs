//! SOL airdrops on test networks

use crate::solana::{RpcError, SolanaRpc};
use crate::types::{AirdropReceipt, Commitment, LAMPORTS_PER_SOL};
use crate::wallet::WalletAdapter;
use crate::Config;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AirdropError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Invalid airdrop amount: {0}")]
    InvalidAmount(String),

    #[error("Airdrops are only available on test clusters ({0})")]
    NotTestCluster(String),

    #[error("Airdrop failed: {0}")]
    Failed(#[from] RpcError),
}

impl AirdropError {
    pub fn is_precondition(&self) -> bool {
        !matches!(self, AirdropError::Failed(_))
    }
}

/// Whole lamports for a SOL amount, truncated.
pub fn sol_to_lamports(sol: Decimal) -> Result<u64, AirdropError> {
    if sol <= Decimal::ZERO {
        return Err(AirdropError::InvalidAmount(format!("{} SOL must be greater than zero", sol)));
    }

    let lamports = sol
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .and_then(|l| l.trunc().to_u64())
        .ok_or_else(|| AirdropError::InvalidAmount(format!("{} SOL is too large", sol)))?;

    if lamports == 0 {
        return Err(AirdropError::InvalidAmount(format!("{} SOL is less than one lamport", sol)));
    }
    Ok(lamports)
}

/// Refuse to request airdrops against mainnet.
pub fn ensure_test_cluster(config: &Config) -> Result<(), AirdropError> {
    if config.is_test_cluster() {
        Ok(())
    } else {
        Err(AirdropError::NotTestCluster(config.rpc_url.clone()))
    }
}

/// Request `sol` for the connected wallet and wait until it lands.
pub async fn request_airdrop(
    wallet: &dyn WalletAdapter,
    rpc: &dyn SolanaRpc,
    sol: Decimal,
    commitment: Commitment,
) -> Result<AirdropReceipt, AirdropError> {
    let owner = wallet.public_key().ok_or(AirdropError::WalletNotConnected)?;
    let lamports = sol_to_lamports(sol)?;

    info!("[Airdrop] Requesting {} SOL for {}", sol, owner);
    let signature = rpc.request_airdrop(&owner, lamports).await?;
    rpc.confirm_transaction(&signature, commitment).await?;
    let balance_lamports = rpc.get_balance(&owner).await?;

    info!("[Airdrop] Confirmed {}, balance now {} lamports", signature, balance_lamports);

    Ok(AirdropReceipt {
        signature,
        lamports,
        balance_lamports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::mock::MockRpc;
    use crate::wallet::BurnerWallet;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sol_to_lamports() {
        assert_eq!(sol_to_lamports(dec!(1)).unwrap(), 1_000_000_000);
        assert_eq!(sol_to_lamports(dec!(0.5)).unwrap(), 500_000_000);
        assert!(sol_to_lamports(dec!(0)).is_err());
        assert!(sol_to_lamports(dec!(-2)).is_err());
        assert!(sol_to_lamports(dec!(0.0000000001)).is_err());
    }

    #[test]
    fn test_mainnet_is_refused() {
        let mut config = Config::default();
        assert!(ensure_test_cluster(&config).is_ok());

        config.rpc_url = crate::config::Cluster::MAINNET_URL.to_string();
        let err = ensure_test_cluster(&config).unwrap_err();
        assert!(matches!(err, AirdropError::NotTestCluster(_)));
    }

    #[tokio::test]
    async fn test_airdrop_confirms_and_reports_balance() {
        let rpc = MockRpc::new();
        let wallet = BurnerWallet::from_secret([5u8; 32]);

        let receipt = request_airdrop(&wallet, &rpc, dec!(2), Commitment::Confirmed)
            .await
            .unwrap();

        assert_eq!(receipt.signature, "airdrop-signature");
        assert_eq!(receipt.lamports, 2 * LAMPORTS_PER_SOL);
        assert_eq!(receipt.balance_lamports, 2 * LAMPORTS_PER_SOL);
        assert_eq!(
            rpc.calls(),
            vec!["requestAirdrop", "confirmTransaction", "getBalance"]
        );
    }

    #[tokio::test]
    async fn test_airdrop_requires_connected_wallet() {
        let rpc = MockRpc::new();
        let wallet = BurnerWallet::new();

        let err = request_airdrop(&wallet, &rpc, dec!(1), Commitment::Confirmed)
            .await
            .unwrap_err();

        assert!(matches!(err, AirdropError::WalletNotConnected));
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_airdrop_confirmation_failure() {
        let rpc = MockRpc::new().fail_confirm(RpcError::ConfirmationTimeout {
            signature: "airdrop-signature".to_string(),
            seconds: 60,
        });
        let wallet = BurnerWallet::from_secret([5u8; 32]);

        let err = request_airdrop(&wallet, &rpc, dec!(1), Commitment::Confirmed)
            .await
            .unwrap_err();

        assert!(matches!(err, AirdropError::Failed(_)));
        assert!(!err.is_precondition());
    }
}
