//! Session orchestration.
//!
//! Serializes the whole flow — connect, allowance check, approval,
//! purchase, refresh — over the single session, and applies the
//! invalidation policy: any account or chain change event resets the
//! session and allowance state before the next operation runs.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::MintConfig;
use crate::error::MintError;
use crate::gate::{AllowanceGate, ApprovalState};
use crate::invoker::PurchaseInvoker;
use crate::provider::{ProviderEvent, TxStatus, WalletProvider};
use crate::session::WalletSession;

/// Coarse status snapshot for external reporting. The orchestrator does
/// not render anything itself.
#[derive(Debug, Clone, Serialize)]
pub struct MintStatus {
    pub address: Option<Address>,
    pub network_ok: bool,
    pub approved: bool,
    pub last_tx: Option<TxHash>,
    pub stablecoin_balance: Option<U256>,
    pub token_balance: Option<U256>,
}

#[derive(Debug, Clone, Copy)]
struct Balances {
    stablecoin: U256,
    token: U256,
}

/// Drives one wallet session through the mint flow.
pub struct SessionOrchestrator<P: WalletProvider> {
    config: MintConfig,
    session: WalletSession<P>,
    gate: AllowanceGate,
    invoker: PurchaseInvoker,
    events: mpsc::UnboundedReceiver<ProviderEvent>,
    balances: Option<Balances>,
    last_tx: Option<TxHash>,
}

impl<P: WalletProvider> SessionOrchestrator<P> {
    pub fn new(provider: Arc<P>, config: MintConfig) -> Self {
        let events = provider.subscribe();
        let session = WalletSession::new(provider, config.clone());
        let gate = AllowanceGate::new(&config);
        let invoker = PurchaseInvoker::new(&config);
        Self {
            config,
            session,
            gate,
            invoker,
            events,
            balances: None,
            last_tx: None,
        }
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn session(&self) -> &WalletSession<P> {
        &self.session
    }

    /// Apply any pending account/chain change notifications. Either kind
    /// invalidates the session wholesale; the next connect starts from
    /// scratch.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            tracing::warn!(?event, "provider event invalidates session");
            self.session.reset();
            self.gate.reset();
            self.balances = None;
        }
    }

    /// Connect the wallet, then load balances and the allowance state.
    pub async fn connect(&mut self) -> Result<MintStatus, MintError> {
        self.process_events();
        self.session.connect().await?;
        self.refresh().await?;
        Ok(self.status())
    }

    /// Approve the stablecoin spend ceiling and wait for confirmation.
    pub async fn approve(&mut self) -> Result<TxHash, MintError> {
        self.process_events();
        let (handles, owner) = self.session.require_ready()?;
        let spender = handles.token.address();
        let hash = self.gate.approve(&handles.stablecoin, spender).await?;
        // Allowance is re-read rather than assumed from the receipt.
        self.gate
            .check_approval(&handles.stablecoin, owner, spender)
            .await?;
        self.last_tx = Some(hash);
        Ok(hash)
    }

    /// Execute one purchase: gate check, catalog search, confirmation,
    /// then a single deferred balance/allowance refresh.
    pub async fn purchase(&mut self) -> Result<TxHash, MintError> {
        self.process_events();
        let (handles, owner) = self.session.require_ready()?;
        if !self.gate.is_approved() {
            return Err(MintError::NotApproved);
        }

        let hash = self.invoker.execute(handles, owner).await?;
        self.last_tx = Some(hash);

        let receipt = handles.stablecoin.rpc().wait_for_receipt(hash).await?;
        if receipt.status == TxStatus::Failed {
            return Err(MintError::Rpc(format!(
                "purchase transaction {hash} reverted on-chain"
            )));
        }
        tracing::info!(%hash, "purchase confirmed");

        // One refresh after a settling delay, tolerating indexing lag.
        tokio::time::sleep(self.config.settle_delay).await;
        self.refresh().await?;
        Ok(hash)
    }

    /// Re-read both balances and the allowance for the connected account.
    pub async fn refresh(&mut self) -> Result<ApprovalState, MintError> {
        self.process_events();
        let (handles, owner) = self.session.require_ready()?;
        let stablecoin = handles.stablecoin.balance_of(owner).await?;
        let token = handles.token.balance_of(owner).await?;
        let spender = handles.token.address();
        let state = self
            .gate
            .check_approval(&handles.stablecoin, owner, spender)
            .await?;
        self.balances = Some(Balances { stablecoin, token });
        tracing::debug!(%stablecoin, %token, ?state, "balances refreshed");
        Ok(state)
    }

    pub fn status(&self) -> MintStatus {
        MintStatus {
            address: self.session.account(),
            network_ok: self.session.is_ready()
                && self.session.chain_id() == Some(self.config.chain_id),
            approved: self.gate.is_approved(),
            last_tx: self.last_tx,
            stablecoin_balance: self.balances.map(|b| b.stablecoin),
            token_balance: self.balances.map(|b| b.token),
        }
    }
}
