//! Post-deployment parameter calls.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::descriptor::ArgValue;
use crate::error::{DeployError, Phase};
use crate::invoke::{ContractHandle, invoke};
use crate::registry::Registry;
use crate::rpc::ChainRpc;

/// One parameter-setting call on a deployed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub label: String,
    pub contract: String,
    pub method: String,
    pub args: Vec<ArgValue>,
    /// Wiring labels (`"Source.method"`) that must be applied first.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl ConfigItem {
    pub fn new(label: &str, contract: &str, method: &str, args: Vec<ArgValue>) -> Self {
        Self {
            label: label.to_string(),
            contract: contract.to_string(),
            method: method.to_string(),
            args,
            requires: Vec::new(),
        }
    }

    pub fn requires(mut self, wiring: &str) -> Self {
        self.requires.push(wiring.to_string());
        self
    }
}

pub struct ConfigApplier<'a, R: ChainRpc + ?Sized> {
    rpc: &'a R,
    artifacts: &'a ArtifactStore,
    owner: Address,
}

impl<'a, R: ChainRpc + ?Sized> ConfigApplier<'a, R> {
    pub fn new(rpc: &'a R, artifacts: &'a ArtifactStore, owner: Address) -> Self {
        Self {
            rpc,
            artifacts,
            owner,
        }
    }

    /// Apply every item in order, stopping at the first failure.
    pub async fn apply_all(&self, registry: &Registry, items: &[ConfigItem]) -> Result<(), DeployError> {
        for (index, item) in items.iter().enumerate() {
            self.apply(registry, item)
                .await
                .map_err(|e| e.at_step(Phase::Configure, index, item.label.clone()))?;
        }
        info!(items = items.len(), "Configuration applied");
        Ok(())
    }

    async fn apply(&self, registry: &Registry, item: &ConfigItem) -> Result<(), DeployError> {
        if let Some(missing) = item.requires.iter().find(|w| !registry.is_wired(w)) {
            return Err(DeployError::NotWired {
                item: item.label.clone(),
                wiring: missing.clone(),
            });
        }

        let contract = registry.resolve(&item.contract)?;
        let handle = ContractHandle {
            name: contract.name.clone(),
            artifact: contract.artifact.clone(),
            address: contract.address,
        };
        invoke(
            self.rpc,
            self.artifacts,
            registry,
            self.owner,
            &handle,
            &item.method,
            &item.args,
            U256::ZERO,
        )
        .await?;

        info!(label = %item.label, contract = %item.contract, method = %item.method, "Configured");
        Ok(())
    }
}
