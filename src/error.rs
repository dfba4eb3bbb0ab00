//! Error taxonomy and on-chain failure classification.

use std::fmt;

use alloy::primitives::{TxHash, U256};
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by the mint client.
///
/// User rejections are final for the current operation and are never
/// retried; everything else is reported with the underlying provider
/// message attached.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("no wallet provider available")]
    NoProvider,

    #[error("rejected by user: {0}")]
    UserRejected(String),

    #[error("wallet session is not connected")]
    NotConnected,

    #[error("chain switch failed: {0}")]
    NetworkMismatch(String),

    #[error("insufficient funds for gas: {0}")]
    InsufficientGas(String),

    #[error("insufficient stablecoin balance: have {balance}, need {required}")]
    InsufficientBalance { balance: U256, required: U256 },

    #[error("insufficient stablecoin allowance: have {allowance}, need {required}")]
    InsufficientAllowance { allowance: U256, required: U256 },

    #[error("approval reverted: {0}")]
    ApprovalReverted(String),

    #[error("stablecoin spend not approved")]
    NotApproved,

    #[error("no working purchase entry point; last failure: {last}")]
    NoWorkingEntryPoint { last: String },

    #[error("transaction {0} not confirmed within the polling window")]
    ConfirmationTimeout(TxHash),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl MintError {
    /// Wrap a provider failure from a read path, preserving user
    /// rejections as such.
    pub(crate) fn from_read(op: &str, err: ProviderError) -> Self {
        if err.is_user_rejected() {
            MintError::UserRejected(err.message)
        } else {
            MintError::Rpc(format!("{op} failed: {err}"))
        }
    }
}

/// Classification of a failed contract call, driving the invocation
/// engine's fallback search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFailure {
    /// The user declined in the wallet. Aborts the whole search.
    UserRejected,
    /// The contract rejected the call during execution.
    ExecutionReverted,
    /// The node could not estimate gas, i.e. the call would fail.
    GasEstimationFailed,
    /// The signer cannot pay network fees.
    InsufficientGas,
    Unknown,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallFailure::UserRejected => "user rejected",
            CallFailure::ExecutionReverted => "execution reverted",
            CallFailure::GasEstimationFailed => "gas estimation failed",
            CallFailure::InsufficientGas => "insufficient gas funds",
            CallFailure::Unknown => "unknown failure",
        };
        f.write_str(s)
    }
}

/// Classify a provider error from a transaction submission.
///
/// Matches on the EIP-1193 rejection code first, then on well-known
/// node error message fragments.
pub fn classify_call_failure(err: &ProviderError) -> CallFailure {
    if err.is_user_rejected() {
        return CallFailure::UserRejected;
    }
    let message = err.message.to_ascii_lowercase();
    if message.contains("insufficient funds") {
        CallFailure::InsufficientGas
    } else if message.contains("cannot estimate gas")
        || message.contains("gas required exceeds")
        || message.contains("unpredictable_gas_limit")
    {
        CallFailure::GasEstimationFailed
    } else if message.contains("revert") {
        CallFailure::ExecutionReverted
    } else {
        CallFailure::Unknown
    }
}
