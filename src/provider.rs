//! Wallet provider contract.
//!
//! The external signing agent (browser extension or mobile wallet) is
//! modeled as a trait over the handful of EIP-1193 operations the client
//! actually depends on, plus the raw reads the RPC layer needs; in the
//! deployed environment both travel over the same injected provider
//! object. Implementations are plugged in as generic parameters, never
//! trait objects.

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error reported by the wallet provider or the node behind it.
///
/// `code` follows the EIP-1193 / JSON-RPC numbering; the two values the
/// client branches on are exposed as constants.
#[derive(Debug, Clone, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    /// EIP-1193: the user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// EIP-3085: the wallet does not recognize the requested chain.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(Self::USER_REJECTED, message)
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("unrecognized chain id {chain_id}"),
        )
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}

/// Out-of-band notification from the wallet. Either one invalidates the
/// running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// Full chain descriptor for a `wallet_addEthereumChain` request.
#[derive(Debug, Clone, Serialize)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_url: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn eth() -> Self {
        Self {
            name: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// Unsigned transaction handed to the wallet for signing and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// Terminal status of a mined transaction. A transaction without a
/// receipt yet is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxStatus {
    Confirmed,
    Failed,
}

/// Observed receipt of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub status: TxStatus,
}

/// The external wallet provider.
///
/// Six wallet operations (accounts, chain id, switch, add, broadcast,
/// events) plus the raw node reads (`call`, `get_code`,
/// `transaction_receipt`) that the chain RPC layer is built on. All
/// signing happens inside the provider; the client never sees a key.
pub trait WalletProvider: Send + Sync {
    /// Whether a provider is actually reachable. A detached adapter
    /// (e.g. no injected provider object) returns `false` and every
    /// connect attempt fails before touching the network.
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the wallet for account authorization. Suspends until the user
    /// responds; rejection surfaces as code 4001.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, ProviderError>> + Send;

    /// Read the chain id the provider is currently pointed at.
    fn chain_id(&self) -> impl Future<Output = Result<u64, ProviderError>> + Send;

    /// Ask the wallet to switch to `chain_id`. An unrecognized chain
    /// surfaces as code 4902.
    fn switch_chain(&self, chain_id: u64) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Ask the wallet to add (and switch to) the described chain.
    fn add_chain(
        &self,
        chain: &ChainDescriptor,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Read-only contract call.
    fn call(
        &self,
        to: Address,
        data: Bytes,
    ) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;

    /// Deployed bytecode at `address`; empty when nothing is deployed.
    fn get_code(&self, address: Address) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;

    /// Sign and broadcast a transaction. Resolves as soon as the chain
    /// accepts the broadcast, not when the transaction is mined.
    fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, ProviderError>> + Send;

    /// Receipt of a mined transaction, or `None` while still pending.
    fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>, ProviderError>> + Send;

    /// Subscribe to account-changed / chain-changed notifications.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent>;
}
