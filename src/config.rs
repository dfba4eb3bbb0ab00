//! Deployment constants and runtime configuration.

use std::time::Duration;

use alloy::primitives::{Address, U256};

/// Base mainnet chain ID.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Human-readable chain name, used when adding the chain to a wallet.
pub const BASE_CHAIN_NAME: &str = "Base";

/// USDC contract on Base mainnet.
pub const USDC_ADDRESS: Address = Address::new([
    0x83, 0x35, 0x89, 0xfc, 0xd6, 0xed, 0xb6, 0xe0, 0x8f, 0x4c, 0x7c, 0x32, 0xd4, 0xf7, 0x1b, 0x54,
    0xbd, 0xa0, 0x29, 0x13,
]);

/// BASE8004 token contract on Base mainnet.
pub const TOKEN_ADDRESS: Address = Address::new([
    0x20, 0xf4, 0xc2, 0xf4, 0x11, 0x33, 0x60, 0xbe, 0xc8, 0x94, 0x82, 0x5a, 0x07, 0x0e, 0x24, 0x17,
    0x5e, 0xe4, 0xec, 0xb8,
]);

/// USDC has 6 decimal places on Base.
pub const STABLECOIN_DECIMALS: u32 = 6;

/// BASE8004 uses the standard 18 decimal places.
pub const TOKEN_DECIMALS: u32 = 18;

/// Tokens minted per purchase: 1 USDC buys 8004 BASE8004.
pub const MINT_RATIO: u64 = 8004;

/// Default public RPC endpoint for Base mainnet.
pub const RPC_URL: &str = "https://mainnet.base.org";

/// Block explorer base URL.
pub const EXPLORER_BASE: &str = "https://basescan.org";

/// Runtime configuration, fixed for the lifetime of a session.
///
/// `Default` carries the Base mainnet deployment values; env overrides are
/// available through [`MintConfig::from_env`] for testnet deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    /// Stablecoin (USDC) contract address.
    pub stablecoin: Address,
    /// BASE8004 token contract address. Also the allowance spender.
    pub token: Address,
    /// Target chain id; every read and write is scoped to it.
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub explorer_base: String,
    /// Cost of one purchase in stablecoin base units (1 USDC).
    pub purchase_cost: U256,
    /// Tokens received per purchase in token base units (8004 * 10^18).
    pub mint_output: U256,
    /// Approval ceiling = `purchase_cost * approval_multiplier`, so one
    /// wallet confirmation covers that many purchases.
    pub approval_multiplier: u64,
    /// Delay between a confirmed receipt and the balance/allowance refresh,
    /// tolerating indexing lag behind the chain head.
    pub settle_delay: Duration,
    /// Receipt poll cadence while waiting for confirmation.
    pub receipt_poll_interval: Duration,
    /// Poll attempts before giving up on a confirmation.
    pub receipt_poll_attempts: u32,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            stablecoin: USDC_ADDRESS,
            token: TOKEN_ADDRESS,
            chain_id: BASE_CHAIN_ID,
            chain_name: BASE_CHAIN_NAME.to_string(),
            rpc_url: RPC_URL.to_string(),
            explorer_base: EXPLORER_BASE.to_string(),
            purchase_cost: U256::from(10u64).pow(U256::from(STABLECOIN_DECIMALS)),
            mint_output: U256::from(MINT_RATIO) * U256::from(10u64).pow(U256::from(TOKEN_DECIMALS)),
            approval_multiplier: 10,
            settle_delay: Duration::from_secs(3),
            receipt_poll_interval: Duration::from_secs(2),
            receipt_poll_attempts: 150,
        }
    }
}

impl MintConfig {
    /// Default configuration with env overrides:
    /// `MINT_RPC_URL`, `MINT_STABLECOIN`, `MINT_TOKEN`, `MINT_CHAIN_ID`.
    /// Unset or unparseable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("MINT_RPC_URL") {
            config.rpc_url = url;
        }
        if let Some(addr) = env_parse::<Address>("MINT_STABLECOIN") {
            config.stablecoin = addr;
        }
        if let Some(addr) = env_parse::<Address>("MINT_TOKEN") {
            config.token = addr;
        }
        if let Some(id) = env_parse::<u64>("MINT_CHAIN_ID") {
            config.chain_id = id;
        }
        config
    }

    /// Spend ceiling requested by one approval transaction.
    pub fn approval_ceiling(&self) -> U256 {
        self.purchase_cost * U256::from(self.approval_multiplier)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
