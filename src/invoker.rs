//! Adaptive purchase invocation engine.
//!
//! The token contract's real purchase entry point is not reliably known,
//! so the engine carries an ordered catalog of plausible call shapes and
//! tries them until the chain accepts one. The ordering encodes a strong
//! prior on the known `mint()` selector, then semantically named
//! alternatives from most to least specific parameter shape, then a
//! last-resort transfer-and-retry. Balance and allowance are checked
//! before any call so a hopeless purchase never spends gas, and a user
//! rejection at any point ends the whole search.

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::sol_types::SolValue;

use crate::config::MintConfig;
use crate::contracts::ContractHandles;
use crate::error::{classify_call_failure, CallFailure, MintError};
use crate::provider::{ProviderError, TxStatus, WalletProvider};

/// Known selector of the zero-argument `mint()` entry point, tried first.
pub const MINT_SELECTOR: [u8; 4] = [0x12, 0x49, 0xc5, 0x8b];

/// Alternative entry point names, in priority order.
pub const CANDIDATE_NAMES: [&str; 6] = ["purchase", "buy", "mint", "exchange", "swap", "getToken"];

/// Ordered parameter shapes, most specific first. Roles: recipient of
/// the minted tokens, token amount out, stablecoin amount in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    RecipientOutIn,
    RecipientOut,
    OutIn,
    Out,
    Recipient,
    NoArgs,
}

impl ParamShape {
    /// All shapes in catalog priority order.
    pub const ALL: [ParamShape; 6] = [
        ParamShape::RecipientOutIn,
        ParamShape::RecipientOut,
        ParamShape::OutIn,
        ParamShape::Out,
        ParamShape::Recipient,
        ParamShape::NoArgs,
    ];

    /// Canonical Solidity type list for the signature.
    fn type_list(self) -> &'static str {
        match self {
            ParamShape::RecipientOutIn => "address,uint256,uint256",
            ParamShape::RecipientOut => "address,uint256",
            ParamShape::OutIn => "uint256,uint256",
            ParamShape::Out => "uint256",
            ParamShape::Recipient => "address",
            ParamShape::NoArgs => "",
        }
    }

    fn encode_args(self, recipient: Address, amount_out: U256, amount_in: U256) -> Vec<u8> {
        match self {
            ParamShape::RecipientOutIn => (recipient, amount_out, amount_in).abi_encode_params(),
            ParamShape::RecipientOut => (recipient, amount_out).abi_encode_params(),
            ParamShape::OutIn => (amount_out, amount_in).abi_encode_params(),
            ParamShape::Out => amount_out.abi_encode(),
            ParamShape::Recipient => recipient.abi_encode(),
            ParamShape::NoArgs => Vec::new(),
        }
    }
}

/// How a candidate's selector is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEncoding {
    /// Use a precomputed selector verbatim.
    FixedSelector([u8; 4]),
    /// Hash the canonical signature of `method(types)`.
    CanonicalSignature,
}

/// One hypothesized shape of the purchase entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub method: &'static str,
    pub shape: ParamShape,
    pub encoding: CallEncoding,
}

impl Candidate {
    pub fn signature(&self) -> String {
        format!("{}({})", self.method, self.shape.type_list())
    }

    pub fn selector(&self) -> [u8; 4] {
        match self.encoding {
            CallEncoding::FixedSelector(selector) => selector,
            CallEncoding::CanonicalSignature => {
                let hash = keccak256(self.signature().as_bytes());
                [hash[0], hash[1], hash[2], hash[3]]
            }
        }
    }

    /// Full calldata for this candidate with the semantic roles filled in.
    pub fn calldata(&self, recipient: Address, amount_out: U256, amount_in: U256) -> Bytes {
        let mut data = self.selector().to_vec();
        data.extend(self.shape.encode_args(recipient, amount_out, amount_in));
        Bytes::from(data)
    }
}

/// The fixed priority catalog. The zero-argument known selector leads;
/// each alternative name is then tried across every shape in order.
pub fn catalog() -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(1 + CANDIDATE_NAMES.len() * ParamShape::ALL.len());
    candidates.push(Candidate {
        method: "mint",
        shape: ParamShape::NoArgs,
        encoding: CallEncoding::FixedSelector(MINT_SELECTOR),
    });
    for method in CANDIDATE_NAMES {
        for shape in ParamShape::ALL {
            candidates.push(Candidate {
                method,
                shape,
                encoding: CallEncoding::CanonicalSignature,
            });
        }
    }
    candidates
}

/// Record of one attempted candidate, kept for diagnostics while a
/// purchase resolves and discarded afterwards.
#[derive(Debug, Clone)]
pub struct InvocationAttempt {
    pub candidate: Candidate,
    pub failure: CallFailure,
    pub message: String,
}

/// Executes a purchase against the opaque token contract.
#[derive(Debug)]
pub struct PurchaseInvoker {
    amount_in: U256,
    amount_out: U256,
}

impl PurchaseInvoker {
    pub fn new(config: &MintConfig) -> Self {
        Self {
            amount_in: config.purchase_cost,
            amount_out: config.mint_output,
        }
    }

    /// Run the catalog search and return the first accepted pending
    /// transaction hash. The caller awaits confirmation and interprets
    /// the receipt.
    ///
    /// Fails fast with [`MintError::InsufficientBalance`] /
    /// [`MintError::InsufficientAllowance`] before touching any entry
    /// point, aborts on the first user rejection, and reports
    /// [`MintError::NoWorkingEntryPoint`] with the last classified
    /// failure when the catalog is exhausted.
    pub async fn execute<P: WalletProvider>(
        &self,
        handles: &ContractHandles<P>,
        buyer: Address,
    ) -> Result<TxHash, MintError> {
        let token_address = handles.token.address();

        let balance = handles.stablecoin.balance_of(buyer).await?;
        if balance < self.amount_in {
            return Err(MintError::InsufficientBalance {
                balance,
                required: self.amount_in,
            });
        }
        let allowance = handles.stablecoin.allowance(buyer, token_address).await?;
        if allowance < self.amount_in {
            return Err(MintError::InsufficientAllowance {
                allowance,
                required: self.amount_in,
            });
        }

        let mut attempts: Vec<InvocationAttempt> = Vec::new();
        for candidate in catalog() {
            let calldata = candidate.calldata(buyer, self.amount_out, self.amount_in);
            tracing::debug!(signature = %candidate.signature(), "trying candidate");
            match handles.token.invoke(calldata).await {
                Ok(hash) => {
                    tracing::info!(
                        signature = %candidate.signature(),
                        prior_failures = attempts.len(),
                        %hash,
                        "candidate accepted"
                    );
                    return Ok(hash);
                }
                Err(e) => {
                    let failure = self.record_failure(&mut attempts, candidate, e)?;
                    tracing::debug!(signature = %candidate.signature(), %failure, "candidate failed");
                }
            }
        }

        // Last resort: pay the contract directly, then retry the known
        // zero-argument entry point.
        match self.transfer_then_mint(handles, buyer, &mut attempts).await {
            Ok(hash) => return Ok(hash),
            Err(Some(fatal)) => return Err(fatal),
            Err(None) => {}
        }

        let last = attempts
            .last()
            .map(|a| format!("{} via {}: {}", a.failure, a.candidate.signature(), a.message))
            .unwrap_or_else(|| "no candidates attempted".to_string());
        tracing::warn!(attempts = attempts.len(), %last, "invocation catalog exhausted");
        Err(MintError::NoWorkingEntryPoint { last })
    }

    /// Transfer the purchase cost to the token contract and retry the
    /// known `mint()` selector once the transfer is confirmed.
    ///
    /// `Err(Some(_))` is a fatal error that ends the purchase (user
    /// rejection or confirmation timeout); `Err(None)` means the
    /// fallback failed like any other candidate.
    async fn transfer_then_mint<P: WalletProvider>(
        &self,
        handles: &ContractHandles<P>,
        buyer: Address,
        attempts: &mut Vec<InvocationAttempt>,
    ) -> Result<TxHash, Option<MintError>> {
        let token_address = handles.token.address();
        let retry = Candidate {
            method: "mint",
            shape: ParamShape::NoArgs,
            encoding: CallEncoding::FixedSelector(MINT_SELECTOR),
        };

        tracing::warn!(
            amount = %self.amount_in,
            to = %token_address,
            "falling back to direct transfer before mint retry"
        );
        let transfer = handles.stablecoin.transfer(token_address, self.amount_in).await;
        let transfer_hash = match transfer {
            Ok(hash) => hash,
            Err(e) => {
                return match self.record_failure(attempts, retry, e) {
                    Ok(_) => Err(None),
                    Err(fatal) => Err(Some(fatal)),
                };
            }
        };
        let receipt = handles
            .stablecoin
            .rpc()
            .wait_for_receipt(transfer_hash)
            .await
            .map_err(Some)?;
        if receipt.status == TxStatus::Failed {
            attempts.push(InvocationAttempt {
                candidate: retry,
                failure: CallFailure::ExecutionReverted,
                message: format!("fallback transfer {transfer_hash} reverted"),
            });
            return Err(None);
        }

        let calldata = retry.calldata(buyer, self.amount_out, self.amount_in);
        match handles.token.invoke(calldata).await {
            Ok(hash) => {
                tracing::info!(%hash, "mint retry accepted after direct transfer");
                Ok(hash)
            }
            Err(e) => match self.record_failure(attempts, retry, e) {
                Ok(_) => Err(None),
                Err(fatal) => Err(Some(fatal)),
            },
        }
    }

    /// Record a classified failure, or abort the search on rejection.
    fn record_failure(
        &self,
        attempts: &mut Vec<InvocationAttempt>,
        candidate: Candidate,
        err: ProviderError,
    ) -> Result<CallFailure, MintError> {
        let failure = classify_call_failure(&err);
        if failure == CallFailure::UserRejected {
            tracing::info!("user rejected purchase, aborting search");
            return Err(MintError::UserRejected(err.message));
        }
        attempts.push(InvocationAttempt {
            candidate,
            failure,
            message: err.message,
        });
        Ok(failure)
    }
}
