//! In-memory record of contracts deployed during one run.

use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::ReferenceResolver;
use crate::error::DeployError;
use crate::snapshot::AddressSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub name: String,
    pub artifact: String,
    /// Address callers talk to; the proxy for upgradeable contracts.
    pub address: Address,
    /// Logic contract behind the proxy.
    pub implementation: Option<Address>,
    pub tx_hash: TxHash,
    pub deployed_at: DateTime<Utc>,
}

/// Logical name to deployed contract, in deployment order.
#[derive(Debug, Default)]
pub struct Registry {
    contracts: Vec<DeployedContract>,
    index: HashMap<String, usize>,
    wired: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, contract: DeployedContract) -> Result<&DeployedContract, DeployError> {
        if self.index.contains_key(&contract.name) {
            return Err(DeployError::DuplicateName(contract.name));
        }
        self.index.insert(contract.name.clone(), self.contracts.len());
        self.contracts.push(contract);
        Ok(&self.contracts[self.contracts.len() - 1])
    }

    pub fn resolve(&self, name: &str) -> Result<&DeployedContract, DeployError> {
        self.get(name).ok_or_else(|| DeployError::UnresolvedReference {
            name: name.to_string(),
            required_by: "registry lookup".to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.index.get(name).map(|&i| &self.contracts[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeployedContract> {
        self.contracts.iter()
    }

    pub fn mark_wired(&mut self, label: impl Into<String>) {
        self.wired.insert(label.into());
    }

    pub fn is_wired(&self, label: &str) -> bool {
        self.wired.contains(label)
    }

    /// Ordered name → address mapping for persistence. Proxies also get a
    /// `<name>.implementation` entry.
    pub fn snapshot(&self) -> AddressSnapshot {
        let mut snapshot = AddressSnapshot::default();
        for contract in &self.contracts {
            snapshot.push(contract.name.clone(), contract.address);
            if let Some(implementation) = contract.implementation {
                snapshot.push(format!("{}.implementation", contract.name), implementation);
            }
        }
        snapshot
    }
}

impl ReferenceResolver for Registry {
    fn resolve_address(&self, name: &str, required_by: &str) -> Result<Address, DeployError> {
        self.get(name)
            .map(|c| c.address)
            .ok_or_else(|| DeployError::UnresolvedReference {
                name: name.to_string(),
                required_by: required_by.to_string(),
            })
    }
}
