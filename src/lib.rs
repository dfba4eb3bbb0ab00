//! Client library for the BASE8004 mint on Base mainnet.
//!
//! Lets a user buy a fixed ratio of BASE8004 tokens by spending USDC,
//! driving an external wallet provider (EIP-1193 style) through the full
//! flow: connect, verify or repair the network, gate on USDC allowance,
//! and execute the purchase against a token contract whose real entry
//! point is not reliably known.
//!
//! # Components
//!
//! - [`WalletProvider`] — trait over the external signing agent: account
//!   authorization, chain switching, raw reads, transaction broadcast,
//!   and account/chain change notifications
//! - [`WalletSession`] — connection state machine; verifies and repairs
//!   the chain id before binding contract handles
//! - [`AllowanceGate`] — tracks whether the account has approved enough
//!   USDC spend for one purchase, and performs the approval
//! - [`PurchaseInvoker`] — tries an ordered catalog of plausible purchase
//!   entry points until the chain accepts one
//! - [`SessionOrchestrator`] — sequences connect → gate → purchase →
//!   refresh and applies the invalidation policy on provider events
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use base8004::{MintConfig, SessionOrchestrator};
//! # use base8004::WalletProvider;
//! # async fn run<P: WalletProvider>(provider: Arc<P>) -> Result<(), base8004::MintError> {
//! let mut orchestrator = SessionOrchestrator::new(provider, MintConfig::default());
//! orchestrator.connect().await?;
//! if !orchestrator.status().approved {
//!     orchestrator.approve().await?;
//! }
//! let tx = orchestrator.purchase().await?;
//! println!("minted, tx {tx}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contracts;
pub mod error;
pub mod gate;
pub mod invoker;
pub mod orchestrator;
pub mod provider;
pub mod rpc;
pub mod session;

// ERC-20 surface consumed on the stablecoin contract. The token contract's
// purchase entry points are not declared here: their shapes are hypotheses,
// enumerated and encoded by the invocation catalog instead.
alloy::sol! {
    interface ERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool);
    }
}

pub use config::MintConfig;
pub use contracts::{ContractHandles, Erc20Handle, TokenHandle};
pub use error::{CallFailure, MintError};
pub use gate::{AllowanceGate, ApprovalState};
pub use invoker::{Candidate, InvocationAttempt, ParamShape, PurchaseInvoker};
pub use orchestrator::{MintStatus, SessionOrchestrator};
pub use provider::{
    ChainDescriptor, NativeCurrency, ProviderError, ProviderEvent, TransactionRequest, TxReceipt,
    TxStatus, WalletProvider,
};
pub use rpc::ChainRpcClient;
pub use session::{SessionState, WalletSession};
