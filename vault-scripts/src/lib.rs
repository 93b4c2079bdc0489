//! Shared bootstrap for the vault script binaries.
//!
//! Every binary loads `.env`, reads the deployment config, builds a chain
//! client holding the deployer (and, when configured, the scenario user)
//! signer and opens the artifact and snapshot stores.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use vault_runtime::artifacts::ArtifactStore;
use vault_runtime::chain::ChainClient;
use vault_runtime::config::DeployConfig;
use vault_runtime::contracts::register_external_artifacts;
use vault_runtime::rpc::AlloyRpc;
use vault_runtime::snapshot::{AddressSnapshot, FileBlobStore, load_snapshot, save_snapshot};

pub fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

/// Read an optional environment variable, treating empty values as unset.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub struct Session {
    pub config: DeployConfig,
    pub rpc: AlloyRpc,
    pub artifacts: ArtifactStore,
    pub snapshots: FileBlobStore,
}

impl Session {
    pub async fn open() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = DeployConfig::load().context("loading deployment config")?;
        let session = Self::with_config(config)?;
        session
            .rpc
            .client()
            .verify_chain_id()
            .await
            .context("checking node chain id")?;
        Ok(session)
    }

    pub fn with_config(config: DeployConfig) -> Result<Self> {
        let keys = config.signer_keys(env_var)?;
        let pairs: Vec<(&str, &str)> = keys
            .iter()
            .map(|(label, key)| (label.as_str(), key.as_str()))
            .collect();
        let client = ChainClient::new(&config.network.rpc_url, &pairs, config.network.chain_id)
            .context("building chain client")?;
        let rpc = AlloyRpc::new(client, config.network.required_confirmations);

        let artifacts = ArtifactStore::new(config.paths.artifacts.clone());
        register_external_artifacts(&artifacts)?;
        let snapshots = FileBlobStore::new(config.paths.snapshot_dir.clone());

        Ok(Self {
            config,
            rpc,
            artifacts,
            snapshots,
        })
    }

    pub fn deployer(&self) -> Address {
        self.rpc.client().default_identity().address
    }

    pub fn load_addresses(&self) -> Result<AddressSnapshot> {
        let key = &self.config.paths.snapshot_key;
        load_snapshot(&self.snapshots, key).with_context(|| {
            format!(
                "reading {}; run the deploy script first",
                self.snapshots.path_for(key).display()
            )
        })
    }

    pub fn save_addresses(&self, snapshot: &AddressSnapshot) -> Result<()> {
        save_snapshot(&self.snapshots, &self.config.paths.snapshot_key, snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        treasury = "0x00000000000000000000000000000000000000f0"

        [tokens]
        wbtc = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"
        awbtc = "0x9ff58f4fFB29fA2266Ab25e75e2A8b3503311656"
        weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

        [protocols]
        aave = "0x7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9"
        aave_oracle = "0xA50ba011c48153De246E5192C8f9258A2ba79Ca9"
        eth_leverage = "0x00000000000000000000000000000000000000e1"
        uniswap_v3_router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
        uniswap_v2_router = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
    "#;

    #[test]
    fn test_snapshot_round_trip_through_session_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::from_toml(CONFIG).unwrap();
        config.paths.snapshot_dir = dir.path().join("deployments");

        let keys = [("deployer", "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")];
        let client = ChainClient::new(&config.network.rpc_url, &keys, config.network.chain_id).unwrap();
        let session = Session {
            rpc: AlloyRpc::new(client, 1),
            artifacts: ArtifactStore::default(),
            snapshots: FileBlobStore::new(config.paths.snapshot_dir.clone()),
            config,
        };
        assert!(session.load_addresses().is_err());

        let mut snapshot = AddressSnapshot::default();
        snapshot.push("EFVault", Address::from([0x11; 20]));
        session.save_addresses(&snapshot).unwrap();
        assert_eq!(session.load_addresses().unwrap(), snapshot);
    }
}
