//! JSON-RPC error differentiation
//!
//! Turns transport failures and JSON-RPC error objects into one error type.
//! Messages coming from the node are kept verbatim so the transfer form can
//! show them as the failure reason.

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Network/connection error (timeout, DNS, etc.)
    Network(String),
    /// Non-2xx HTTP status from the endpoint
    Http { status: u16, body: String },
    /// JSON-RPC error object returned by the node
    Rpc { code: i64, message: String },
    /// Response did not have the expected shape
    InvalidResponse(String),
    /// Transaction landed but failed on-chain
    TransactionFailed(String),
    /// Signature did not reach the requested commitment in time
    ConfirmationTimeout { signature: String, seconds: u64 },
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl From<RpcErrorObject> for RpcError {
    fn from(err: RpcErrorObject) -> Self {
        RpcError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

impl RpcError {
    /// Parse a non-success HTTP response
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<RpcErrorObject>,
        }

        // Some providers return a JSON-RPC error body alongside a 4xx/5xx status
        if let Ok(Envelope { error: Some(err) }) = serde_json::from_str::<Envelope>(body) {
            return err.into();
        }

        RpcError::Http {
            status,
            body: body.to_string(),
        }
    }

    /// Parse a network/reqwest error
    pub fn from_network_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            RpcError::Network("Connection failed".to_string())
        } else {
            RpcError::Network(err.to_string())
        }
    }

    /// Reason text shown to the user
    pub fn user_message(&self) -> String {
        match self {
            RpcError::Network(msg) => format!("Network error: {}", msg),
            RpcError::Http { status, body } => format!("RPC endpoint returned {}: {}", status, body),
            RpcError::Rpc { message, .. } => message.clone(),
            RpcError::InvalidResponse(msg) => format!("Unexpected RPC response: {}", msg),
            RpcError::TransactionFailed(reason) => format!("Transaction failed on-chain: {}", reason),
            RpcError::ConfirmationTimeout { signature, seconds } => format!(
                "Transaction {} was not confirmed within {} seconds",
                signature, seconds
            ),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for RpcError {}
