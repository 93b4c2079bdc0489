//! Deployment configuration.
//!
//! Addresses and parameters come from a TOML file (`VAULT_CONFIG`, default
//! `deploy.toml`). The RPC endpoint may be overridden with `RPC_URL`. Private
//! keys are only ever read from the environment: `DEPLOYER_PRIVATE_KEY` and
//! `<LABEL>_PRIVATE_KEY` for each scenario user.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DeployError;

pub const CONFIG_ENV: &str = "VAULT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "deploy.toml";
pub const DEPLOYER: &str = "deployer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    pub tokens: TokenAddresses,
    pub protocols: ProtocolAddresses,
    /// Fee recipient for the controller and the strategy.
    pub treasury: Address,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scripts: ScriptAmounts,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub required_confirmations: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            required_confirmations: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAddresses {
    pub wbtc: Address,
    /// Aave interest-bearing WBTC.
    pub awbtc: Address,
    pub weth: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolAddresses {
    pub aave: Address,
    pub aave_oracle: Address,
    pub eth_leverage: Address,
    pub uniswap_v3_router: Address,
    pub uniswap_v2_router: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub vault_name: String,
    pub vault_symbol: String,
    /// Maximum leverage ratio in basis points.
    pub mlr: u64,
    pub harvest_fee: u64,
    pub deposit_slippage: u64,
    pub withdraw_slippage: u64,
    pub swap_fee_tier: u64,
    pub alloc_point: u64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            vault_name: "ENF WBTC BORROW ETH LP".to_string(),
            vault_symbol: "ENF_WBTC_BORROW_ETH".to_string(),
            mlr: 6750,
            harvest_fee: 1000,
            deposit_slippage: 100,
            withdraw_slippage: 100,
            swap_fee_tier: 500,
            alloc_point: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Hardhat `artifacts/` and/or Foundry `out/` directories.
    pub artifacts: Vec<PathBuf>,
    pub snapshot_dir: PathBuf,
    pub snapshot_key: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: vec![PathBuf::from("artifacts"), PathBuf::from("out")],
            snapshot_dir: PathBuf::from("deployments"),
            snapshot_key: "address.json".to_string(),
        }
    }
}

/// Amounts used by the one-off scripts, as decimal token strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptAmounts {
    pub deposit_wbtc: String,
    pub withdraw_wbtc: String,
    pub swap_eth: String,
    pub swap_deadline: u64,
}

impl Default for ScriptAmounts {
    fn default() -> Self {
        Self {
            deposit_wbtc: "0.01".to_string(),
            withdraw_wbtc: "0.001".to_string(),
            swap_eth: "1".to_string(),
            swap_deadline: 100_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Label of the non-owner depositor.
    pub user: String,
    pub swap_eth: String,
    pub deposit_wbtc: String,
    pub excess_withdraw_wbtc: String,
    pub withdraw_wbtc: String,
    pub owner_deposit_wbtc: String,
    pub raised_mlr: u64,
    pub harvest_delay_secs: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            user: "alice".to_string(),
            swap_eth: "2".to_string(),
            deposit_wbtc: "0.01".to_string(),
            excess_withdraw_wbtc: "10".to_string(),
            withdraw_wbtc: "0.001".to_string(),
            owner_deposit_wbtc: "0.001".to_string(),
            raised_mlr: 6900,
            harvest_delay_secs: 60 * 24 * 3600,
        }
    }
}

impl DeployConfig {
    pub fn from_toml(content: &str) -> Result<Self, DeployError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::ConfigError(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Load from `VAULT_CONFIG` (or `deploy.toml`) and apply environment
    /// overrides.
    pub fn load() -> Result<Self, DeployError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_path(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        info!(
            path = %path,
            rpc_url = %config.network.rpc_url,
            chain_id = config.network.chain_id,
            "Loaded deployment config"
        );
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(rpc_url) = lookup("RPC_URL") {
            self.network.rpc_url = rpc_url;
        }
        if let Some(chain_id) = lookup("CHAIN_ID").and_then(|v| v.parse().ok()) {
            self.network.chain_id = chain_id;
        }
    }

    /// `(label, private key)` pairs, deployer first. The deployer key is
    /// required; a missing user key is skipped with a warning.
    pub fn signer_keys(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<(String, String)>, DeployError> {
        let deployer = lookup("DEPLOYER_PRIVATE_KEY").ok_or_else(|| {
            DeployError::ConfigError("DEPLOYER_PRIVATE_KEY is not set".to_string())
        })?;
        let mut keys = vec![(DEPLOYER.to_string(), deployer)];

        let user = &self.scenario.user;
        let var = format!("{}_PRIVATE_KEY", user.to_uppercase());
        match lookup(&var) {
            Some(key) => keys.push((user.clone(), key)),
            None => warn!(user = %user, var = %var, "No key configured for scenario user"),
        }
        Ok(keys)
    }
}
