//! SPL token transfer flow
//!
//! One request at a time moves through
//! `Idle -> Validating -> ResolvingAccounts -> Submitting -> Confirming -> Idle`.
//! Every failure lands back in `Idle` with an error message for the form.

use crate::solana::spl_token::{self, get_associated_token_address};
use crate::solana::{Instruction, Pubkey, RpcError, SolanaRpc};
use crate::types::{Commitment, TransferReceipt, TransferRequest};
use crate::wallet::WalletAdapter;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Idle,
    Validating,
    ResolvingAccounts,
    Submitting,
    Confirming,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Please fill all fields")]
    MissingFields,

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Recipient address must be different from your address")]
    SelfTransfer,

    #[error("Invalid mint address: {0}")]
    InvalidMint(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("A transfer is already in progress")]
    InFlight,

    #[error("You don't have a token account for this mint")]
    NoSenderTokenAccount,

    #[error("Account {0} is not a token mint")]
    UnknownMint(Pubkey),

    #[error("Transfer failed: {0}")]
    Failed(String),
}

impl TransferError {
    /// Caught before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TransferError::WalletNotConnected
                | TransferError::MissingFields
                | TransferError::InvalidRecipient(_)
                | TransferError::SelfTransfer
                | TransferError::InvalidMint(_)
                | TransferError::InvalidAmount(_)
                | TransferError::ZeroAmount
        )
    }

    /// Detected from on-chain account state
    pub fn is_account_state(&self) -> bool {
        matches!(
            self,
            TransferError::NoSenderTokenAccount | TransferError::UnknownMint(_)
        )
    }
}

impl From<RpcError> for TransferError {
    fn from(err: RpcError) -> Self {
        TransferError::Failed(err.to_string())
    }
}

/// Policy knobs for the transfer flow
#[derive(Debug, Clone, Default)]
pub struct TransferSettings {
    pub commitment: Commitment,
    /// Skip the mint lookup and use this precision
    pub decimals_override: Option<u8>,
    pub allow_zero_amount: bool,
}

impl TransferSettings {
    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            commitment: config.commitment,
            decimals_override: config.token_decimals_override,
            allow_zero_amount: config.allow_zero_amount,
        }
    }
}

/// Form input after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub sender: Pubkey,
    pub recipient: Pubkey,
    pub mint: Pubkey,
    pub amount: Decimal,
}

/// The composite request handed to the wallet
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub sender_account: Pubkey,
    pub recipient_account: Pubkey,
    pub creates_recipient_account: bool,
    pub amount_base_units: u64,
    pub decimals: u8,
    pub instructions: Vec<Instruction>,
}

/// Check the form fields without touching the network.
///
/// The self-transfer check runs before mint and amount are parsed, so it
/// fires whatever those fields contain.
pub fn validate(
    sender: Option<Pubkey>,
    request: &TransferRequest,
    settings: &TransferSettings,
) -> Result<ValidatedTransfer, TransferError> {
    let sender = sender.ok_or(TransferError::WalletNotConnected)?;

    let recipient = request.recipient.trim();
    let mint = request.mint.trim();
    let amount = request.amount.trim();
    if recipient.is_empty() || mint.is_empty() || amount.is_empty() {
        return Err(TransferError::MissingFields);
    }

    let recipient =
        Pubkey::from_str(recipient).map_err(|e| TransferError::InvalidRecipient(e.to_string()))?;
    if recipient == sender {
        return Err(TransferError::SelfTransfer);
    }

    let mint = Pubkey::from_str(mint).map_err(|e| TransferError::InvalidMint(e.to_string()))?;

    let amount =
        Decimal::from_str(amount).map_err(|e| TransferError::InvalidAmount(e.to_string()))?;
    if amount < Decimal::ZERO {
        return Err(TransferError::InvalidAmount("amount cannot be negative".to_string()));
    }
    if amount.is_zero() && !settings.allow_zero_amount {
        return Err(TransferError::ZeroAmount);
    }

    Ok(ValidatedTransfer {
        sender,
        recipient,
        mint,
        amount,
    })
}

/// Convert a user quantity to base units, truncating digits finer than `decimals`.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<u64, TransferError> {
    if amount < Decimal::ZERO {
        return Err(TransferError::InvalidAmount("amount cannot be negative".to_string()));
    }

    let too_large = || TransferError::InvalidAmount(format!("{} is too large", amount));
    let mut scaled = amount;
    for _ in 0..decimals {
        scaled = scaled.checked_mul(Decimal::TEN).ok_or_else(too_large)?;
    }
    scaled.trunc().to_u64().ok_or_else(too_large)
}

/// Look up both associated accounts and the mint precision, then build the instructions.
pub async fn plan_transfer(
    rpc: &dyn SolanaRpc,
    transfer: &ValidatedTransfer,
    settings: &TransferSettings,
) -> Result<TransferPlan, TransferError> {
    let sender_account = get_associated_token_address(&transfer.sender, &transfer.mint);
    let recipient_account = get_associated_token_address(&transfer.recipient, &transfer.mint);

    if rpc.get_account_info(&sender_account).await?.is_none() {
        return Err(TransferError::NoSenderTokenAccount);
    }

    let creates_recipient_account = rpc.get_account_info(&recipient_account).await?.is_none();

    let decimals = match settings.decimals_override {
        Some(decimals) => decimals,
        None => rpc
            .get_mint_decimals(&transfer.mint)
            .await?
            .ok_or(TransferError::UnknownMint(transfer.mint))?,
    };

    let amount_base_units = to_base_units(transfer.amount, decimals)?;
    if amount_base_units == 0 && !settings.allow_zero_amount {
        return Err(TransferError::ZeroAmount);
    }

    let mut instructions = Vec::with_capacity(2);
    if creates_recipient_account {
        debug!("[Transfer] Recipient has no token account, creating {}", recipient_account);
        instructions.push(spl_token::create_associated_token_account(
            &transfer.sender,
            &recipient_account,
            &transfer.recipient,
            &transfer.mint,
        ));
    }
    instructions.push(spl_token::transfer(
        &sender_account,
        &recipient_account,
        &transfer.sender,
        amount_base_units,
    ));

    Ok(TransferPlan {
        sender_account,
        recipient_account,
        creates_recipient_account,
        amount_base_units,
        decimals,
        instructions,
    })
}

/// Transfer form: current state plus the last message shown to the user
#[derive(Debug)]
pub struct TransferForm {
    state: TransferState,
    settings: TransferSettings,
    error: Option<String>,
    status: Option<String>,
}

impl TransferForm {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            state: TransferState::Idle,
            settings,
            error: None,
            status: None,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Error text from the last attempt
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Success text from the last attempt
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn transition(&mut self, next: TransferState) {
        debug!("[Transfer] {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run one transfer from validation to confirmation.
    pub async fn submit(
        &mut self,
        wallet: &dyn WalletAdapter,
        rpc: &dyn SolanaRpc,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        if self.state != TransferState::Idle {
            return Err(TransferError::InFlight);
        }
        self.error = None;
        self.status = None;

        let result = self.run(wallet, rpc, request).await;
        self.transition(TransferState::Idle);

        match &result {
            Ok(receipt) => {
                info!(
                    "[Transfer] Confirmed {} ({} base units)",
                    receipt.signature, receipt.amount_base_units
                );
                self.status = Some("Transfer successful!".to_string());
            }
            Err(e) => {
                warn!("[Transfer] {}", e);
                self.error = Some(e.to_string());
            }
        }

        result
    }

    async fn run(
        &mut self,
        wallet: &dyn WalletAdapter,
        rpc: &dyn SolanaRpc,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        self.transition(TransferState::Validating);
        let transfer = validate(wallet.public_key(), request, &self.settings)?;

        self.transition(TransferState::ResolvingAccounts);
        let plan = plan_transfer(rpc, &transfer, &self.settings).await?;

        debug!(
            "[Transfer] {} base units from {} to {}",
            plan.amount_base_units, plan.sender_account, plan.recipient_account
        );

        self.transition(TransferState::Submitting);
        let signature = wallet
            .sign_and_send(&plan.instructions, rpc)
            .await
            .map_err(|e| TransferError::Failed(e.to_string()))?;

        self.transition(TransferState::Confirming);
        rpc.confirm_transaction(&signature, self.settings.commitment)
            .await?;

        Ok(TransferReceipt {
            signature,
            amount_base_units: plan.amount_base_units,
            decimals: plan.decimals,
            created_recipient_account: plan.creates_recipient_account,
            confirmed_at: Utc::now(),
        })
    }
}

/// Point-in-time view of a shared form
#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    /// `None` while a transfer holds the form
    pub state: Option<TransferState>,
    pub error: Option<String>,
    pub status: Option<String>,
}

/// A transfer form shared between request handlers.
///
/// A submit arriving while another one holds the form is rejected with
/// [`TransferError::InFlight`]. An accepted submit runs on its own task, so
/// it completes even if the caller goes away.
#[derive(Clone)]
pub struct SharedTransferForm {
    inner: Arc<Mutex<TransferForm>>,
}

impl SharedTransferForm {
    pub fn new(form: TransferForm) -> Self {
        Self {
            inner: Arc::new(Mutex::new(form)),
        }
    }

    pub async fn submit(
        &self,
        wallet: Arc<dyn WalletAdapter>,
        rpc: Arc<dyn SolanaRpc>,
        request: TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        let mut form = self
            .inner
            .clone()
            .try_lock_owned()
            .map_err(|_| TransferError::InFlight)?;

        let task = tokio::spawn(async move {
            form.submit(wallet.as_ref(), rpc.as_ref(), &request).await
        });

        task.await
            .map_err(|e| TransferError::Failed(e.to_string()))?
    }

    pub fn snapshot(&self) -> FormSnapshot {
        match self.inner.try_lock() {
            Ok(form) => FormSnapshot {
                state: Some(form.state()),
                error: form.error().map(str::to_string),
                status: form.status().map(str::to_string),
            },
            Err(_) => FormSnapshot {
                state: None,
                error: None,
                status: None,
            },
        }
    }
}
