//! Thin chain RPC layer over a wallet provider.
//!
//! Reads map provider failures into [`MintError::Rpc`]; transaction
//! submission keeps the raw [`ProviderError`] so callers can classify
//! the failure (user rejection, revert, gas).

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash};

use crate::config::MintConfig;
use crate::error::MintError;
use crate::provider::{ProviderError, TransactionRequest, TxReceipt, WalletProvider};

/// Read/broadcast client bound to one provider.
#[derive(Debug)]
pub struct ChainRpcClient<P> {
    provider: Arc<P>,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl<P> Clone for ChainRpcClient<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            poll_interval: self.poll_interval,
            poll_attempts: self.poll_attempts,
        }
    }
}

impl<P: WalletProvider> ChainRpcClient<P> {
    pub fn new(provider: Arc<P>, config: &MintConfig) -> Self {
        Self {
            provider,
            poll_interval: config.receipt_poll_interval,
            poll_attempts: config.receipt_poll_attempts,
        }
    }

    /// Read-only contract call.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, MintError> {
        self.provider
            .call(to, data)
            .await
            .map_err(|e| MintError::from_read("eth_call", e))
    }

    /// Whether any bytecode is deployed at `address`.
    pub async fn has_code(&self, address: Address) -> Result<bool, MintError> {
        let code = self
            .provider
            .get_code(address)
            .await
            .map_err(|e| MintError::from_read("eth_getCode", e))?;
        Ok(!code.is_empty())
    }

    /// Hand a transaction to the wallet for signing and broadcast.
    pub async fn send(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError> {
        self.provider.send_transaction(tx).await
    }

    /// Poll for the receipt of `hash` until it is mined.
    ///
    /// Bounded: after `receipt_poll_attempts` polls the wait gives up
    /// with [`MintError::ConfirmationTimeout`] rather than blocking the
    /// session indefinitely.
    pub async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, MintError> {
        for attempt in 0..self.poll_attempts {
            let receipt = self
                .provider
                .transaction_receipt(hash)
                .await
                .map_err(|e| MintError::from_read("eth_getTransactionReceipt", e))?;
            if let Some(receipt) = receipt {
                tracing::debug!(%hash, attempt, status = ?receipt.status, "transaction mined");
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        tracing::warn!(%hash, attempts = self.poll_attempts, "gave up waiting for receipt");
        Err(MintError::ConfirmationTimeout(hash))
    }
}
