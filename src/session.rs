//! Wallet session state machine.
//!
//! Owns connection state, account identity, and chain-id verification.
//! No contract read or write is issued until the provider is confirmed
//! to be on the target chain; any invalidation event resets the session
//! to `Disconnected` and subsequent connects start from scratch.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::config::MintConfig;
use crate::contracts::{ContractHandles, Erc20Handle, TokenHandle};
use crate::error::MintError;
use crate::provider::{ChainDescriptor, NativeCurrency, WalletProvider};
use crate::rpc::ChainRpcClient;

/// Connection lifecycle. Failures transition back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AccountGranted,
    NetworkVerifying,
    NetworkRepairing,
    Ready,
}

/// The single wallet session of a running client.
#[derive(Debug)]
pub struct WalletSession<P> {
    provider: Arc<P>,
    rpc: ChainRpcClient<P>,
    config: MintConfig,
    state: SessionState,
    account: Option<Address>,
    chain_id: Option<u64>,
    handles: Option<ContractHandles<P>>,
}

impl<P: WalletProvider> WalletSession<P> {
    pub fn new(provider: Arc<P>, config: MintConfig) -> Self {
        let rpc = ChainRpcClient::new(Arc::clone(&provider), &config);
        Self {
            provider,
            rpc,
            config,
            state: SessionState::Disconnected,
            account: None,
            chain_id: None,
            handles: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Bound handles and signer of a ready session.
    pub fn require_ready(&self) -> Result<(&ContractHandles<P>, Address), MintError> {
        match (&self.handles, self.account) {
            (Some(handles), Some(account)) if self.state == SessionState::Ready => {
                Ok((handles, account))
            }
            _ => Err(MintError::NotConnected),
        }
    }

    /// Discard all connection state and cached handles. The next
    /// operation must re-run the full connect sequence.
    pub fn reset(&mut self) {
        if self.state != SessionState::Disconnected {
            tracing::info!(state = ?self.state, "session reset");
        }
        self.state = SessionState::Disconnected;
        self.account = None;
        self.chain_id = None;
        self.handles = None;
    }

    /// Run the full connect sequence: account authorization, chain
    /// verification (with one switch/add repair cycle), then contract
    /// handle binding. Returns the authorized account.
    pub async fn connect(&mut self) -> Result<Address, MintError> {
        // Reconnects never reuse partial state.
        self.reset();

        if !self.provider.is_available() {
            return Err(MintError::NoProvider);
        }

        self.state = SessionState::Connecting;
        tracing::info!("requesting account authorization");
        let granted = self.provider.request_accounts().await;
        let accounts = match granted {
            Ok(accounts) => accounts,
            Err(e) => {
                self.state = SessionState::Disconnected;
                return Err(if e.is_user_rejected() {
                    MintError::UserRejected(e.message)
                } else {
                    MintError::Rpc(format!("account request failed: {e}"))
                });
            }
        };
        let Some(&account) = accounts.first() else {
            self.state = SessionState::Disconnected;
            return Err(MintError::UserRejected("no accounts granted".to_string()));
        };

        self.state = SessionState::AccountGranted;
        self.account = Some(account);
        tracing::info!(%account, "account granted");

        if let Err(e) = self.verify_network().await {
            self.reset();
            return Err(e);
        }

        self.bind_handles(account).await;
        tracing::info!(%account, chain_id = self.config.chain_id, "session ready");
        Ok(account)
    }

    /// Verify the provider's chain id, repairing it with at most one
    /// switch/add cycle. Any other switch failure is fatal for this
    /// attempt and is not retried.
    async fn verify_network(&mut self) -> Result<(), MintError> {
        self.state = SessionState::NetworkVerifying;
        let current = self
            .provider
            .chain_id()
            .await
            .map_err(|e| MintError::Rpc(format!("chain id read failed: {e}")))?;

        let target = self.config.chain_id;
        if current != target {
            self.state = SessionState::NetworkRepairing;
            tracing::info!(current, target, "switching chain");
            match self.provider.switch_chain(target).await {
                Ok(()) => {}
                Err(e) if e.is_unrecognized_chain() => {
                    tracing::info!(target, "chain unknown to wallet, adding");
                    let descriptor = self.chain_descriptor();
                    self.provider
                        .add_chain(&descriptor)
                        .await
                        .map_err(|e| MintError::NetworkMismatch(e.message))?;
                }
                Err(e) => return Err(MintError::NetworkMismatch(e.message)),
            }

            // Re-verify once after the repair.
            let repaired = self
                .provider
                .chain_id()
                .await
                .map_err(|e| MintError::Rpc(format!("chain id read failed: {e}")))?;
            if repaired != target {
                return Err(MintError::NetworkMismatch(format!(
                    "provider still on chain {repaired}, expected {target}"
                )));
            }
        }

        self.chain_id = Some(target);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Bind read/write handles scoped to the authorized signer, with a
    /// best-effort bytecode probe on the token address.
    async fn bind_handles(&mut self, signer: Address) {
        let stablecoin = Erc20Handle::new(self.rpc.clone(), self.config.stablecoin, signer);
        let token = TokenHandle::new(self.rpc.clone(), self.config.token, signer);

        match token.has_code().await {
            Ok(false) => {
                tracing::warn!(address = %token.address(), "no bytecode at token address");
            }
            Ok(true) => {}
            Err(e) => tracing::debug!(error = %e, "bytecode probe failed"),
        }

        self.handles = Some(ContractHandles { stablecoin, token });
    }

    fn chain_descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: self.config.chain_id,
            chain_name: self.config.chain_name.clone(),
            native_currency: NativeCurrency::eth(),
            rpc_url: self.config.rpc_url.clone(),
            explorer_url: self.config.explorer_base.clone(),
        }
    }
}
