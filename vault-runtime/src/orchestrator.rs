//! Deployment orchestrator. Validates a plan, deploys each descriptor in
//! declared order, then applies the wiring steps.
//!
//! Every transaction is awaited to finality before the next step starts;
//! later steps read addresses produced by earlier ones. On failure the run
//! stops and the error names the phase, step index and contracts involved.
//! Nothing is rolled back: committed transactions stay on chain.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use chrono::Utc;
use tracing::info;

use crate::abi;
use crate::artifacts::ArtifactStore;
use crate::descriptor::{ArgValue, ContractDescriptor, ReferenceResolver, WiringStep};
use crate::error::{DeployError, Phase};
use crate::invoke::{ContractHandle, invoke};
use crate::registry::{DeployedContract, Registry};
use crate::rpc::ChainRpc;
use crate::snapshot::AddressSnapshot;

/// How upgradeable descriptors are deployed.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Logical name of the proxy admin contract. Must be deployed first.
    pub admin: String,
    pub admin_artifact: String,
    /// Proxy artifact with `constructor(address logic, address admin, bytes data)`.
    pub proxy_artifact: String,
    pub initializer: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            admin: "ProxyAdmin".to_string(),
            admin_artifact: "ProxyAdmin".to_string(),
            proxy_artifact: "TransparentUpgradeableProxy".to_string(),
            initializer: "initialize".to_string(),
        }
    }
}

/// Descriptors in dependency order plus the wiring to apply afterwards.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    pub descriptors: Vec<ContractDescriptor>,
    pub wiring: Vec<WiringStep>,
}

/// Resolves names already validated to a placeholder address, so a plan can
/// be encoded before anything exists on chain.
struct KnownNames<'k>(&'k HashMap<&'k str, &'k str>);

impl ReferenceResolver for KnownNames<'_> {
    fn resolve_address(&self, name: &str, required_by: &str) -> Result<Address, DeployError> {
        if self.0.contains_key(name) {
            Ok(Address::ZERO)
        } else {
            Err(DeployError::UnresolvedReference {
                name: name.to_string(),
                required_by: required_by.to_string(),
            })
        }
    }
}

pub struct Orchestrator<'a, R: ChainRpc + ?Sized> {
    rpc: &'a R,
    artifacts: &'a ArtifactStore,
    deployer: Address,
    proxy: ProxySettings,
}

impl<'a, R: ChainRpc + ?Sized> Orchestrator<'a, R> {
    pub fn new(rpc: &'a R, artifacts: &'a ArtifactStore, deployer: Address) -> Self {
        Self {
            rpc,
            artifacts,
            deployer,
            proxy: ProxySettings::default(),
        }
    }

    fn dependencies_of<'d>(&'d self, desc: &'d ContractDescriptor) -> Vec<&'d str> {
        let mut deps = desc.dependencies();
        if desc.upgradeable && !deps.contains(&self.proxy.admin.as_str()) {
            deps.insert(0, self.proxy.admin.as_str());
        }
        deps
    }

    /// Check the whole plan without touching the chain: unique names, every
    /// dependency declared earlier (or already registered), artifacts present,
    /// and every constructor, initializer and wiring call encodable against
    /// its artifact's ABI.
    pub fn validate(&self, plan: &DeploymentPlan, registry: &Registry) -> Result<(), DeployError> {
        let mut known: HashMap<&str, &str> = registry
            .iter()
            .map(|c| (c.name.as_str(), c.artifact.as_str()))
            .collect();

        for (index, desc) in plan.descriptors.iter().enumerate() {
            let fail = |e: DeployError| e.at_step(Phase::Deploy, index, desc.name.clone());

            if known.contains_key(desc.name.as_str()) {
                return Err(fail(DeployError::DuplicateName(desc.name.clone())));
            }
            for dep in self.dependencies_of(desc) {
                if !known.contains_key(dep) {
                    return Err(fail(DeployError::UnresolvedReference {
                        name: dep.to_string(),
                        required_by: desc.name.clone(),
                    }));
                }
            }
            if !self.artifacts.contains(&desc.artifact) {
                return Err(fail(DeployError::ArtifactError(format!(
                    "missing artifact {}",
                    desc.artifact
                ))));
            }
            if desc.upgradeable && !self.artifacts.contains(&self.proxy.proxy_artifact) {
                return Err(fail(DeployError::ArtifactError(format!(
                    "missing artifact {}",
                    self.proxy.proxy_artifact
                ))));
            }
            self.check_encoding(desc, &KnownNames(&known)).map_err(fail)?;
            known.insert(desc.name.as_str(), desc.artifact.as_str());
        }

        for (index, step) in plan.wiring.iter().enumerate() {
            let label = step.label();
            let fail = |e: DeployError| e.at_step(Phase::Wire, index, label.clone());
            for name in step.required_names() {
                if !known.contains_key(name) {
                    return Err(fail(DeployError::UnresolvedReference {
                        name: name.to_string(),
                        required_by: label.clone(),
                    }));
                }
            }
            let artifact = self.artifacts.load(known[step.source.as_str()]).map_err(fail)?;
            abi::encode_call(&artifact, &step.method, &step.args, &KnownNames(&known), &label)
                .map_err(fail)?;
        }
        Ok(())
    }

    /// Encode a descriptor's creation code and initializer with placeholder
    /// addresses.
    fn check_encoding(&self, desc: &ContractDescriptor, names: &KnownNames<'_>) -> Result<(), DeployError> {
        let artifact = self.artifacts.load(&desc.artifact)?;
        if desc.upgradeable {
            abi::encode_deployment(&artifact, &[], names, &desc.name)?;
            let init_data =
                abi::encode_call(&artifact, &self.proxy.initializer, &desc.args, names, &desc.name)?;
            let proxy_artifact = self.artifacts.load(&self.proxy.proxy_artifact)?;
            let proxy_args = [
                ArgValue::Address(Address::ZERO),
                ArgValue::Ref(self.proxy.admin.clone()),
                ArgValue::Bytes(init_data),
            ];
            abi::encode_deployment(&proxy_artifact, &proxy_args, names, &desc.name)?;
        } else {
            abi::encode_deployment(&artifact, &desc.args, names, &desc.name)?;
        }
        Ok(())
    }

    /// Validate, deploy every descriptor, then wire.
    pub async fn run(&self, plan: &DeploymentPlan, registry: &mut Registry) -> Result<(), DeployError> {
        self.validate(plan, registry)?;
        info!(
            contracts = plan.descriptors.len(),
            wiring = plan.wiring.len(),
            "Deploying contracts"
        );

        for (index, desc) in plan.descriptors.iter().enumerate() {
            self.deploy(desc, registry)
                .await
                .map_err(|e| e.at_step(Phase::Deploy, index, desc.name.clone()))?;
        }

        self.wire(&plan.wiring, registry).await
    }

    /// Deploy one descriptor and register it.
    pub async fn deploy(
        &self,
        desc: &ContractDescriptor,
        registry: &mut Registry,
    ) -> Result<DeployedContract, DeployError> {
        if registry.contains(&desc.name) {
            return Err(DeployError::DuplicateName(desc.name.clone()));
        }
        for dep in self.dependencies_of(desc) {
            registry.resolve_address(dep, &desc.name)?;
        }

        let artifact = self.artifacts.load(&desc.artifact)?;
        let resolver: &Registry = registry;

        let (address, implementation, tx_hash) = if desc.upgradeable {
            let logic_code = abi::encode_deployment(&artifact, &[], resolver, &desc.name)?;
            let init_data = abi::encode_call(
                &artifact,
                &self.proxy.initializer,
                &desc.args,
                resolver,
                &desc.name,
            )?;
            let proxy_artifact = self.artifacts.load(&self.proxy.proxy_artifact)?;
            let (logic, _) = self
                .create(logic_code, &format!("{} implementation", desc.name))
                .await?;

            let proxy_args = [
                ArgValue::Address(logic),
                ArgValue::Ref(self.proxy.admin.clone()),
                ArgValue::Bytes(init_data),
            ];
            let proxy_code =
                abi::encode_deployment(&proxy_artifact, &proxy_args, resolver, &desc.name)?;
            let (proxy, tx_hash) = self.create(proxy_code, &format!("{} proxy", desc.name)).await?;
            (proxy, Some(logic), tx_hash)
        } else {
            let code = abi::encode_deployment(&artifact, &desc.args, resolver, &desc.name)?;
            let (address, tx_hash) = self.create(code, &desc.name).await?;
            (address, None, tx_hash)
        };

        info!(name = %desc.name, %address, implementation = ?implementation, "Deployed");

        let contract = DeployedContract {
            name: desc.name.clone(),
            artifact: desc.artifact.clone(),
            address,
            implementation,
            tx_hash,
            deployed_at: Utc::now(),
        };
        registry.register(contract.clone())?;
        Ok(contract)
    }

    async fn create(&self, init_code: Bytes, context: &str) -> Result<(Address, TxHash), DeployError> {
        let tx = self.rpc.deploy(self.deployer, init_code, context).await?;
        let receipt = self.rpc.wait_for_finality(&tx).await?;
        let address = receipt.contract_address.ok_or_else(|| DeployError::RemoteCall {
            context: context.to_string(),
            reason: None,
            message: "no contract address in receipt".to_string(),
        })?;
        Ok((address, receipt.tx_hash))
    }

    /// Apply wiring steps in declared order.
    pub async fn wire(&self, steps: &[WiringStep], registry: &mut Registry) -> Result<(), DeployError> {
        for (index, step) in steps.iter().enumerate() {
            self.wire_one(step, registry).await.map_err(|e| {
                e.at_step(Phase::Wire, index, format!("{} -> {}", step.source, step.target))
            })?;
        }
        Ok(())
    }

    async fn wire_one(&self, step: &WiringStep, registry: &mut Registry) -> Result<(), DeployError> {
        let label = step.label();
        registry.resolve_address(&step.target, &label)?;
        let source = registry.get(&step.source).ok_or_else(|| DeployError::UnresolvedReference {
            name: step.source.clone(),
            required_by: label.clone(),
        })?;
        let handle = ContractHandle {
            name: source.name.clone(),
            artifact: source.artifact.clone(),
            address: source.address,
        };

        let resolver: &Registry = registry;
        invoke(
            self.rpc,
            self.artifacts,
            resolver,
            self.deployer,
            &handle,
            &step.method,
            &step.args,
            U256::ZERO,
        )
        .await?;

        info!(source = %step.source, target = %step.target, method = %step.method, "Wired");
        registry.mark_wired(label);
        Ok(())
    }

    /// Point the proxy recorded under `name` at a freshly deployed
    /// implementation of `artifact`. Returns the new implementation address.
    pub async fn upgrade(
        &self,
        snapshot: &AddressSnapshot,
        name: &str,
        artifact: &str,
    ) -> Result<Address, DeployError> {
        let run = async {
            let proxy = snapshot.address(name)?;
            let admin = ContractHandle {
                name: self.proxy.admin.clone(),
                artifact: self.proxy.admin_artifact.clone(),
                address: snapshot.address(&self.proxy.admin)?,
            };

            let logic_artifact = self.artifacts.load(artifact)?;
            let code = abi::encode_deployment(&logic_artifact, &[], snapshot, name)?;
            let (implementation, _) = self
                .create(code, &format!("{name} implementation"))
                .await?;

            invoke(
                self.rpc,
                self.artifacts,
                snapshot,
                self.deployer,
                &admin,
                "upgrade",
                &[ArgValue::Address(proxy), ArgValue::Address(implementation)],
                U256::ZERO,
            )
            .await?;

            info!(name, %proxy, %implementation, "Upgraded proxy");
            Ok::<_, DeployError>(implementation)
        };
        run.await.map_err(|e| e.at_step(Phase::Upgrade, 0, name))
    }
}

impl ReferenceResolver for AddressSnapshot {
    fn resolve_address(&self, name: &str, required_by: &str) -> Result<Address, DeployError> {
        self.get(name).ok_or_else(|| DeployError::UnresolvedReference {
            name: name.to_string(),
            required_by: required_by.to_string(),
        })
    }
}
