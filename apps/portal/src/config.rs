use crate::retry::RetryPolicy;
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs, time::Duration};
use tracing::warn;

pub static CONFIG: OnceCell<PortalConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub governance: GovernanceConfig,
    pub retries: RetryConfig,
}

/// Network parameters are supplied as configuration, not derived. The same
/// values back the `wallet_addEthereumChain` request when the wallet does not
/// know the chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    /// Public endpoint used for read-only calls when no wallet is reachable.
    pub fallback_rpc_url: String,
    /// Endpoint of the wallet bridge that signs and submits transactions.
    pub wallet_rpc_url: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub explorer_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 11155111,
            chain_name: "Sepolia".to_string(),
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            fallback_rpc_url: "https://1rpc.io/sepolia".to_string(),
            wallet_rpc_url: "http://localhost:8545".to_string(),
            currency_name: "Sepolia Ether".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            explorer_url: "https://sepolia.etherscan.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub dao_address: String,
    pub token_address: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            dao_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            token_address: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Fixed fee the contract's payable `join()` expects, in wei.
    pub membership_fee_wei: u128,
    /// The contract enforces this window internally but does not expose it;
    /// the client reconstructs `deadline = now + voting_period_days`.
    pub voting_period_days: i64,
    pub token_decimals: u32,
    /// The deployed contract's `executeProposal` acts on the latest proposal
    /// regardless of the id argument. `true` keeps the mirror in step with
    /// that behavior; `false` assumes a corrected contract.
    pub execute_targets_latest: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            membership_fee_wei: 10_000_000_000_000_000, // 0.01 ETH
            voting_period_days: 7,
            token_decimals: 6,
            execute_targets_latest: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub membership_verify_attempts: u32,
    pub membership_verify_delay_ms: u64,
    pub join_verify_attempts: u32,
    pub join_verify_delay_ms: u64,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_delay_ms: u64,
    pub reconcile_interval_secs: u64,
    pub default_gas_price_wei: u128,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            membership_verify_attempts: 3,
            membership_verify_delay_ms: 1_000,
            join_verify_attempts: 10,
            join_verify_delay_ms: 2_000,
            receipt_poll_attempts: 60,
            receipt_poll_delay_ms: 2_000,
            reconcile_interval_secs: 60,
            default_gas_price_wei: 20_000_000_000, // 20 gwei
        }
    }
}

impl RetryConfig {
    pub fn membership_verify_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.membership_verify_attempts,
            Duration::from_millis(self.membership_verify_delay_ms),
        )
    }

    pub fn join_verify_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.join_verify_attempts,
            Duration::from_millis(self.join_verify_delay_ms),
        )
    }

    pub fn receipt_poll_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.receipt_poll_attempts,
            Duration::from_millis(self.receipt_poll_delay_ms),
        )
    }
}

pub fn load() -> Result<()> {
    let config = load_config();
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Portal config already initialized"))?;
    Ok(())
}

pub fn get_config() -> &'static PortalConfig {
    CONFIG.get().expect("Portal config not initialized")
}

fn load_config() -> PortalConfig {
    let path = env::var("PORTAL_CONFIG_PATH").unwrap_or_else(|_| "portal.yaml".to_string());
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_yaml::from_str::<PortalConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, path = %path, "Failed to parse portal config, using defaults");
                PortalConfig::default()
            }
        },
        Err(err) => {
            warn!(error = %err, path = %path, "Portal config not found, using defaults");
            PortalConfig::default()
        }
    }
}
