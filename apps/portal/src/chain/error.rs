use alloy::transports::{RpcError, TransportError};
use thiserror::Error;

/// JSON-RPC error code wallets return when the user dismisses a popup.
pub const USER_REJECTED_CODE: i64 = 4001;
/// Code `wallet_switchEthereumChain` returns when the chain is unknown to
/// the wallet and has to be added first.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Network or node issue. Retryable.
    #[error("rpc error: {0}")]
    Rpc(String),
    /// Contract logic rejected the call. Not retryable without changing
    /// inputs. Carries the revert reason verbatim.
    #[error("execution reverted: {0}")]
    Revert(String),
    /// Wallet popup dismissed or declined. Never retried automatically.
    #[error("user rejected the wallet request")]
    UserRejected,
    /// Wrong or unreachable chain.
    #[error("network error: {0}")]
    Network(String),
    /// ABI/struct decode failure. Callers fall back to the next source
    /// instead of surfacing this to the end user.
    #[error("decode error: {0}")]
    Decode(String),
    /// A signing session is required but none is active.
    #[error("no active wallet session")]
    SessionRequired,
}

impl ChainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Rpc(_))
    }
}

/// Classify a JSON-RPC error response. Reverts are recognized by the node's
/// "execution reverted" message and keep the reason text verbatim.
pub fn classify_rpc_failure(code: i64, message: &str) -> ChainError {
    if code == USER_REJECTED_CODE {
        return ChainError::UserRejected;
    }
    let lower = message.to_lowercase();
    if lower.contains("execution reverted") || lower.contains("revert") {
        return ChainError::Revert(extract_revert_reason(message));
    }
    ChainError::Rpc(format!("code {code}: {message}"))
}

/// Strip the node's "execution reverted" prefix, keeping only the reason the
/// contract supplied. Falls back to the full message when no reason follows.
fn extract_revert_reason(message: &str) -> String {
    let lower = message.to_lowercase();
    for prefix in ["execution reverted:", "execution reverted"] {
        if let Some(at) = lower.find(prefix) {
            if let Some(rest) = message.get(at + prefix.len()..) {
                let rest = rest.trim();
                if !rest.is_empty() {
                    return rest.to_string();
                }
            }
        }
    }
    message.to_string()
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match &err {
            RpcError::ErrorResp(payload) => classify_rpc_failure(payload.code, &payload.message),
            _ => ChainError::Rpc(err.to_string()),
        }
    }
}
