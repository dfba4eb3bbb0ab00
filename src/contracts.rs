//! Contract handles bound by a ready session.
//!
//! Each handle pairs the RPC client with one contract address and the
//! authorized signer, mirroring how the wallet scopes write access.
//! Reads decode through the ERC-20 call types; writes return the raw
//! provider error so the caller can classify the failure.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;

use crate::error::MintError;
use crate::provider::{ProviderError, TransactionRequest, WalletProvider};
use crate::rpc::ChainRpcClient;
use crate::ERC20;

/// Read/write handle for the stablecoin contract, scoped to `signer`.
#[derive(Debug, Clone)]
pub struct Erc20Handle<P> {
    rpc: ChainRpcClient<P>,
    address: Address,
    signer: Address,
}

impl<P: WalletProvider> Erc20Handle<P> {
    pub fn new(rpc: ChainRpcClient<P>, address: Address, signer: Address) -> Self {
        Self {
            rpc,
            address,
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rpc(&self) -> &ChainRpcClient<P> {
        &self.rpc
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, MintError> {
        let calldata = ERC20::balanceOfCall { owner }.abi_encode();
        let result = self.rpc.call(self.address, Bytes::from(calldata)).await?;
        ERC20::balanceOfCall::abi_decode_returns(&result)
            .map_err(|e| MintError::Rpc(format!("balanceOf decode failed: {e}")))
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, MintError> {
        let calldata = ERC20::allowanceCall { owner, spender }.abi_encode();
        let result = self.rpc.call(self.address, Bytes::from(calldata)).await?;
        ERC20::allowanceCall::abi_decode_returns(&result)
            .map_err(|e| MintError::Rpc(format!("allowance decode failed: {e}")))
    }

    /// Broadcast `approve(spender, value)`. Returns the pending hash.
    pub async fn approve(&self, spender: Address, value: U256) -> Result<TxHash, ProviderError> {
        let calldata = ERC20::approveCall { spender, value }.abi_encode();
        self.send(calldata).await
    }

    /// Broadcast `transfer(to, value)`. Returns the pending hash.
    pub async fn transfer(&self, to: Address, value: U256) -> Result<TxHash, ProviderError> {
        let calldata = ERC20::transferCall { to, value }.abi_encode();
        self.send(calldata).await
    }

    async fn send(&self, calldata: Vec<u8>) -> Result<TxHash, ProviderError> {
        let tx = TransactionRequest {
            from: self.signer,
            to: self.address,
            data: Bytes::from(calldata),
        };
        self.rpc.send(&tx).await
    }
}

/// Handle for the token contract being purchased.
///
/// Only `balanceOf` is assumed to exist; everything else is invoked as
/// raw calldata supplied by the invocation catalog.
#[derive(Debug, Clone)]
pub struct TokenHandle<P> {
    rpc: ChainRpcClient<P>,
    address: Address,
    signer: Address,
}

impl<P: WalletProvider> TokenHandle<P> {
    pub fn new(rpc: ChainRpcClient<P>, address: Address, signer: Address) -> Self {
        Self {
            rpc,
            address,
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rpc(&self) -> &ChainRpcClient<P> {
        &self.rpc
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, MintError> {
        let calldata = ERC20::balanceOfCall { owner }.abi_encode();
        let result = self.rpc.call(self.address, Bytes::from(calldata)).await?;
        ERC20::balanceOfCall::abi_decode_returns(&result)
            .map_err(|e| MintError::Rpc(format!("balanceOf decode failed: {e}")))
    }

    /// Whether bytecode is deployed at the token address.
    pub async fn has_code(&self) -> Result<bool, MintError> {
        self.rpc.has_code(self.address).await
    }

    /// Broadcast a transaction carrying arbitrary calldata against the
    /// token contract. Returns the pending hash.
    pub async fn invoke(&self, calldata: Bytes) -> Result<TxHash, ProviderError> {
        let tx = TransactionRequest {
            from: self.signer,
            to: self.address,
            data: calldata,
        };
        self.rpc.send(&tx).await
    }
}

/// The pair of handles a ready session binds, dropped wholesale on any
/// invalidation.
#[derive(Debug, Clone)]
pub struct ContractHandles<P> {
    pub stablecoin: Erc20Handle<P>,
    pub token: TokenHandle<P>,
}
