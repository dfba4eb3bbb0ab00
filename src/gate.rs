//! Allowance gate for the stablecoin spend.
//!
//! A purchase costs exactly one `purchase_cost`; the gate re-reads the
//! allowance from the chain before every check and only flips to
//! approved after an approval transaction is confirmed on-chain, never
//! optimistically.

use alloy::primitives::{Address, TxHash, U256};

use crate::config::MintConfig;
use crate::contracts::Erc20Handle;
use crate::error::{classify_call_failure, CallFailure, MintError};
use crate::provider::{TxStatus, WalletProvider};

/// Outcome of an allowance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Approved,
    NotApproved,
}

/// `Approved` iff `allowance >= required`.
pub fn approval_state(allowance: U256, required: U256) -> ApprovalState {
    if allowance >= required {
        ApprovalState::Approved
    } else {
        ApprovalState::NotApproved
    }
}

/// Tracks whether the connected account has authorized enough stablecoin
/// spend for one purchase.
#[derive(Debug)]
pub struct AllowanceGate {
    /// Allowance needed for a single purchase.
    required: U256,
    /// Ceiling requested per approval; sized for several purchases so
    /// each one does not need a fresh wallet confirmation.
    ceiling: U256,
    approved: bool,
}

impl AllowanceGate {
    pub fn new(config: &MintConfig) -> Self {
        Self {
            required: config.purchase_cost,
            ceiling: config.approval_ceiling(),
            approved: false,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub fn required(&self) -> U256 {
        self.required
    }

    /// Forget any approval knowledge, e.g. after a session invalidation.
    pub fn reset(&mut self) {
        self.approved = false;
    }

    /// Re-read the on-chain allowance granted to the token contract and
    /// refresh the gate. Read-only; safe to call repeatedly.
    pub async fn check_approval<P: WalletProvider>(
        &mut self,
        stablecoin: &Erc20Handle<P>,
        owner: Address,
        spender: Address,
    ) -> Result<ApprovalState, MintError> {
        let allowance = stablecoin.allowance(owner, spender).await?;
        let state = approval_state(allowance, self.required);
        self.approved = state == ApprovalState::Approved;
        tracing::debug!(%allowance, required = %self.required, ?state, "allowance checked");
        Ok(state)
    }

    /// Issue an approval for the full spend ceiling and suspend until it
    /// is confirmed on-chain.
    pub async fn approve<P: WalletProvider>(
        &mut self,
        stablecoin: &Erc20Handle<P>,
        spender: Address,
    ) -> Result<TxHash, MintError> {
        tracing::info!(%spender, ceiling = %self.ceiling, "sending approval");
        let sent = stablecoin.approve(spender, self.ceiling).await;
        let hash = match sent {
            Ok(hash) => hash,
            Err(e) => {
                return Err(match classify_call_failure(&e) {
                    CallFailure::UserRejected => MintError::UserRejected(e.message),
                    CallFailure::InsufficientGas => MintError::InsufficientGas(e.message),
                    _ => MintError::ApprovalReverted(e.message),
                });
            }
        };

        let receipt = stablecoin.rpc().wait_for_receipt(hash).await?;
        if receipt.status == TxStatus::Failed {
            return Err(MintError::ApprovalReverted(format!(
                "approval transaction {hash} reverted on-chain"
            )));
        }

        self.approved = true;
        tracing::info!(%hash, "approval confirmed");
        Ok(hash)
    }
}
