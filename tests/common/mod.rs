#![allow(dead_code)] // not every test binary uses every knob

//! Scripted wallet provider for integration tests.
//!
//! Records every provider operation in order and serves configurable
//! outcomes: which chains the wallet knows, which purchase selector the
//! fake token contract accepts, and where the simulated user rejects.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use tokio::sync::mpsc;

use base8004::{
    ChainDescriptor, ProviderError, ProviderEvent, TransactionRequest, TxReceipt, TxStatus,
    WalletProvider, ERC20,
};

/// One recorded provider operation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    RequestAccounts,
    ChainId,
    SwitchChain(u64),
    AddChain(u64),
    Call { to: Address, selector: [u8; 4] },
    GetCode(Address),
    SendTx { to: Address, selector: [u8; 4] },
    Receipt,
}

/// How the fake token contract answers purchase attempts.
#[derive(Debug, Clone)]
pub enum PurchaseRule {
    /// Accept exactly this selector, revert everything else.
    AcceptSelector([u8; 4]),
    /// Revert every attempt with this message.
    RejectAll(String),
    /// Simulated user rejection at the given attempt index (0-based);
    /// every other attempt reverts.
    UserRejectAt(usize),
}

/// Balance movement applied when a purchase is accepted.
#[derive(Debug, Clone, Copy)]
pub struct MintEffect {
    pub stablecoin: Address,
    pub token: Address,
    pub cost: U256,
    pub output: U256,
}

#[derive(Debug)]
struct State {
    available: bool,
    accounts: Vec<Address>,
    reject_accounts: bool,
    chain_id: u64,
    known_chains: Vec<u64>,
    fail_switch: bool,
    stablecoin: Address,
    token: Address,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    reject_approve: bool,
    gas_poor: bool,
    purchase_rule: PurchaseRule,
    purchase_attempts: usize,
    mint_effect: Option<MintEffect>,
    never_mine: bool,
    next_tx: u64,
    receipts: HashMap<TxHash, TxStatus>,
    ops: Vec<Op>,
    sent: Vec<TransactionRequest>,
}

pub struct MockProvider {
    state: Mutex<State>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
}

pub const BUYER: Address = Address::new([0xab; 20]);

impl MockProvider {
    /// Provider already on the target chain, one authorized account,
    /// token bytecode deployed, every purchase selector accepted.
    pub fn new(config: &base8004::MintConfig) -> Self {
        let state = State {
            available: true,
            accounts: vec![BUYER],
            reject_accounts: false,
            chain_id: config.chain_id,
            known_chains: vec![config.chain_id],
            fail_switch: false,
            stablecoin: config.stablecoin,
            token: config.token,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            reject_approve: false,
            gas_poor: false,
            purchase_rule: PurchaseRule::AcceptSelector(base8004::invoker::MINT_SELECTOR),
            purchase_attempts: 0,
            mint_effect: None,
            never_mine: false,
            next_tx: 1,
            receipts: HashMap::new(),
            ops: Vec::new(),
            sent: Vec::new(),
        };
        Self {
            state: Mutex::new(state),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    // -- scripting --

    pub fn set_unavailable(&self) {
        self.state.lock().unwrap().available = false;
    }

    pub fn set_reject_accounts(&self) {
        self.state.lock().unwrap().reject_accounts = true;
    }

    pub fn set_chain(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    /// The wallet no longer recognizes `chain_id`: switching to it
    /// reports 4902 until it is added.
    pub fn forget_chain(&self, chain_id: u64) {
        self.state
            .lock()
            .unwrap()
            .known_chains
            .retain(|&c| c != chain_id);
    }

    pub fn set_fail_switch(&self) {
        self.state.lock().unwrap().fail_switch = true;
    }

    pub fn set_balance(&self, token: Address, owner: Address, value: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((token, owner), value);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, value: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), value);
    }

    pub fn set_reject_approve(&self) {
        self.state.lock().unwrap().reject_approve = true;
    }

    pub fn set_gas_poor(&self) {
        self.state.lock().unwrap().gas_poor = true;
    }

    pub fn set_purchase_rule(&self, rule: PurchaseRule) {
        self.state.lock().unwrap().purchase_rule = rule;
    }

    pub fn set_mint_effect(&self, effect: MintEffect) {
        self.state.lock().unwrap().mint_effect = Some(effect);
    }

    /// Broadcasts succeed but no transaction ever gets a receipt.
    pub fn set_never_mine(&self) {
        self.state.lock().unwrap().never_mine = true;
    }

    /// Fire an out-of-band wallet notification.
    pub fn emit(&self, event: ProviderEvent) {
        for tx in self.subscribers.lock().unwrap().iter() {
            let _ = tx.send(event.clone());
        }
    }

    // -- inspection --

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Selectors of transactions sent to the token contract, in order.
    pub fn token_sends(&self) -> Vec<[u8; 4]> {
        let state = self.state.lock().unwrap();
        let token = state.token;
        state
            .sent
            .iter()
            .filter(|tx| tx.to == token)
            .map(|tx| selector_of(&tx.data))
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    fn next_hash(state: &mut State, status: TxStatus) -> TxHash {
        let hash = B256::from(U256::from(state.next_tx));
        state.next_tx += 1;
        if !state.never_mine {
            state.receipts.insert(hash, status);
        }
        hash
    }
}

fn selector_of(data: &Bytes) -> [u8; 4] {
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    selector
}

fn word_at(data: &Bytes, index: usize) -> &[u8] {
    &data[4 + index * 32..4 + (index + 1) * 32]
}

fn address_at(data: &Bytes, index: usize) -> Address {
    Address::from_slice(&word_at(data, index)[12..])
}

fn u256_at(data: &Bytes, index: usize) -> U256 {
    U256::from_be_slice(word_at(data, index))
}

impl WalletProvider for MockProvider {
    fn is_available(&self) -> bool {
        self.state.lock().unwrap().available
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::RequestAccounts);
        if state.reject_accounts {
            return Err(ProviderError::user_rejected("user rejected the request"));
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::ChainId);
        Ok(state.chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::SwitchChain(chain_id));
        if state.fail_switch {
            return Err(ProviderError::new(-32002, "switch request failed"));
        }
        if !state.known_chains.contains(&chain_id) {
            return Err(ProviderError::unrecognized_chain(chain_id));
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::AddChain(chain.chain_id));
        state.known_chains.push(chain.chain_id);
        // Wallets switch to a chain right after adding it.
        state.chain_id = chain.chain_id;
        Ok(())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let mut state = self.state.lock().unwrap();
        let selector = selector_of(&data);
        state.ops.push(Op::Call { to, selector });

        let value = if selector == ERC20::balanceOfCall::SELECTOR {
            let owner = address_at(&data, 0);
            state
                .balances
                .get(&(to, owner))
                .copied()
                .unwrap_or(U256::ZERO)
        } else if selector == ERC20::allowanceCall::SELECTOR {
            let owner = address_at(&data, 0);
            let spender = address_at(&data, 1);
            state
                .allowances
                .get(&(to, owner, spender))
                .copied()
                .unwrap_or(U256::ZERO)
        } else {
            return Err(ProviderError::new(-32000, "execution reverted"));
        };
        Ok(Bytes::from(value.abi_encode()))
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::GetCode(address));
        Ok(Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError> {
        let mut state = self.state.lock().unwrap();
        let selector = selector_of(&tx.data);
        state.ops.push(Op::SendTx {
            to: tx.to,
            selector,
        });
        state.sent.push(tx.clone());

        if state.gas_poor {
            return Err(ProviderError::new(
                -32000,
                "insufficient funds for gas * price + value",
            ));
        }

        if tx.to == state.stablecoin && selector == ERC20::approveCall::SELECTOR {
            if state.reject_approve {
                return Err(ProviderError::user_rejected("user rejected the request"));
            }
            let spender = address_at(&tx.data, 0);
            let value = u256_at(&tx.data, 1);
            state.allowances.insert((tx.to, tx.from, spender), value);
            return Ok(Self::next_hash(&mut state, TxStatus::Confirmed));
        }

        if tx.to == state.stablecoin && selector == ERC20::transferCall::SELECTOR {
            let to = address_at(&tx.data, 0);
            let value = u256_at(&tx.data, 1);
            let from_balance = state
                .balances
                .get(&(tx.to, tx.from))
                .copied()
                .unwrap_or(U256::ZERO);
            if from_balance < value {
                return Err(ProviderError::new(-32000, "execution reverted"));
            }
            state.balances.insert((tx.to, tx.from), from_balance - value);
            let to_balance = state
                .balances
                .get(&(tx.to, to))
                .copied()
                .unwrap_or(U256::ZERO);
            state.balances.insert((tx.to, to), to_balance + value);
            return Ok(Self::next_hash(&mut state, TxStatus::Confirmed));
        }

        // Everything else is a purchase attempt against the token.
        let attempt = state.purchase_attempts;
        state.purchase_attempts += 1;
        let accepted = match &state.purchase_rule {
            PurchaseRule::AcceptSelector(s) => {
                if selector == *s {
                    true
                } else {
                    return Err(ProviderError::new(
                        -32000,
                        "execution reverted: unknown function",
                    ));
                }
            }
            PurchaseRule::RejectAll(message) => {
                return Err(ProviderError::new(-32000, message.clone()));
            }
            PurchaseRule::UserRejectAt(n) => {
                if attempt == *n {
                    return Err(ProviderError::user_rejected("user rejected the request"));
                }
                return Err(ProviderError::new(-32000, "execution reverted"));
            }
        };
        debug_assert!(accepted);

        if let Some(effect) = state.mint_effect {
            let paid = state
                .balances
                .get(&(effect.stablecoin, tx.from))
                .copied()
                .unwrap_or(U256::ZERO);
            state
                .balances
                .insert((effect.stablecoin, tx.from), paid.saturating_sub(effect.cost));
            let minted = state
                .balances
                .get(&(effect.token, tx.from))
                .copied()
                .unwrap_or(U256::ZERO);
            state
                .balances
                .insert((effect.token, tx.from), minted + effect.output);
            let remaining = state
                .allowances
                .get(&(effect.stablecoin, tx.from, effect.token))
                .copied()
                .unwrap_or(U256::ZERO);
            state.allowances.insert(
                (effect.stablecoin, tx.from, effect.token),
                remaining.saturating_sub(effect.cost),
            );
        }
        Ok(Self::next_hash(&mut state, TxStatus::Confirmed))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Receipt);
        Ok(state
            .receipts
            .get(&hash)
            .map(|&status| TxReceipt { hash, status }))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// Config tuned for tests: no settling delay, fast receipt polling.
pub fn test_config() -> base8004::MintConfig {
    let mut config = base8004::MintConfig::default();
    config.settle_delay = std::time::Duration::ZERO;
    config.receipt_poll_interval = std::time::Duration::from_millis(1);
    config.receipt_poll_attempts = 5;
    config
}
