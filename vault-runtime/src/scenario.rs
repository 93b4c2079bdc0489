//! Scripted integration scenarios against a deployed system.
//!
//! A scenario is an ordered list of [`ScenarioStep`]s. Each step reads its
//! probes, performs one action as a named identity, checks the outcome
//! (success or a specific revert reason) and evaluates its postconditions on
//! fresh reads. The run stops at the first failing step.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::chain::Identity;
use crate::descriptor::{ArgValue, ReferenceResolver};
use crate::error::{DeployError, Phase};
use crate::invoke::{ContractHandle, invoke, read_uint};
use crate::registry::Registry;
use crate::revert::RevertReason;
use crate::rpc::ChainRpc;

const BPS: u64 = 10_000;

/// Everything a scenario can address by name: deployed contracts, contracts
/// deployed elsewhere (tokens, routers) and acting identities.
#[derive(Debug, Default)]
pub struct World {
    registry: Registry,
    externals: HashMap<String, ContractHandle>,
    identities: Vec<Identity>,
}

impl World {
    pub fn new(registry: Registry, identities: Vec<Identity>) -> Self {
        Self {
            registry,
            externals: HashMap::new(),
            identities,
        }
    }

    /// Make an externally deployed contract addressable as `name`.
    pub fn attach(&mut self, name: &str, artifact: &str, address: Address) {
        self.externals.insert(
            name.to_string(),
            ContractHandle {
                name: name.to_string(),
                artifact: artifact.to_string(),
                address,
            },
        );
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn identity(&self, label: &str) -> Result<Address, DeployError> {
        self.identities
            .iter()
            .find(|i| i.label == label)
            .map(|i| i.address)
            .ok_or_else(|| DeployError::UnresolvedReference {
                name: label.to_string(),
                required_by: "scenario identities".to_string(),
            })
    }

    /// Registry contracts shadow external ones of the same name.
    pub fn contract(&self, name: &str) -> Result<ContractHandle, DeployError> {
        if let Some(deployed) = self.registry.get(name) {
            return Ok(ContractHandle {
                name: deployed.name.clone(),
                artifact: deployed.artifact.clone(),
                address: deployed.address,
            });
        }
        self.externals
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::UnresolvedReference {
                name: name.to_string(),
                required_by: "scenario".to_string(),
            })
    }
}

impl ReferenceResolver for World {
    fn resolve_address(&self, name: &str, required_by: &str) -> Result<Address, DeployError> {
        if let Some(deployed) = self.registry.get(name) {
            return Ok(deployed.address);
        }
        if let Some(external) = self.externals.get(name) {
            return Ok(external.address);
        }
        if let Some(identity) = self.identities.iter().find(|i| i.label == name) {
            return Ok(identity.address);
        }
        Err(DeployError::UnresolvedReference {
            name: name.to_string(),
            required_by: required_by.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Invoke {
        target: String,
        method: String,
        args: Vec<ArgValue>,
        value: U256,
    },
    /// Move the chain clock forward by this many seconds.
    AdvanceTime(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Success,
    Revert(RevertReason),
}

/// A uint-valued reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// View call returning a uint.
    Call {
        contract: String,
        method: String,
        args: Vec<ArgValue>,
    },
    /// `numerator * 10000 / denominator`, zero when the denominator is zero.
    Ratio {
        numerator: Box<Probe>,
        denominator: Box<Probe>,
    },
}

impl Probe {
    pub fn call(contract: &str, method: &str, args: Vec<ArgValue>) -> Self {
        Probe::Call {
            contract: contract.to_string(),
            method: method.to_string(),
            args,
        }
    }

    pub fn ratio(numerator: Probe, denominator: Probe) -> Self {
        Probe::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Call {
                contract,
                method,
                args,
            } if args.is_empty() => write!(f, "{contract}.{method}()"),
            Probe::Call {
                contract, method, ..
            } => write!(f, "{contract}.{method}(..)"),
            Probe::Ratio {
                numerator,
                denominator,
            } => write!(f, "{numerator} / {denominator} (bps)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Equals(Probe, U256),
    IncreasedBy(Probe, U256),
    Increased(Probe),
    Decreased(Probe),
    NotIncreased(Probe),
    Unchanged(Probe),
}

impl Check {
    pub fn probe(&self) -> &Probe {
        match self {
            Check::Equals(p, _)
            | Check::IncreasedBy(p, _)
            | Check::Increased(p)
            | Check::Decreased(p)
            | Check::NotIncreased(p)
            | Check::Unchanged(p) => p,
        }
    }

    fn needs_before(&self) -> bool {
        !matches!(self, Check::Equals(..))
    }

    /// `None` when the check holds, otherwise a description of the mismatch.
    fn evaluate(&self, before: Option<U256>, after: U256) -> Option<String> {
        let before = before.unwrap_or_default();
        let probe = self.probe();
        let holds = match self {
            Check::Equals(_, expected) => after == *expected,
            Check::IncreasedBy(_, delta) => before.checked_add(*delta) == Some(after),
            Check::Increased(_) => after > before,
            Check::Decreased(_) => after < before,
            Check::NotIncreased(_) => after <= before,
            Check::Unchanged(_) => after == before,
        };
        if holds {
            return None;
        }
        Some(match self {
            Check::Equals(_, expected) => format!("{probe}: expected {expected}, got {after}"),
            Check::IncreasedBy(_, delta) => {
                format!("{probe}: expected {before} + {delta}, got {after}")
            }
            Check::Increased(_) => format!("{probe}: expected increase from {before}, got {after}"),
            Check::Decreased(_) => format!("{probe}: expected decrease from {before}, got {after}"),
            Check::NotIncreased(_) => format!("{probe}: increased from {before} to {after}"),
            Check::Unchanged(_) => format!("{probe}: changed from {before} to {after}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    pub label: String,
    /// Identity label the action is sent from.
    pub actor: String,
    pub action: Action,
    pub expect: Expectation,
    pub checks: Vec<Check>,
}

impl ScenarioStep {
    pub fn invoke(label: &str, actor: &str, target: &str, method: &str, args: Vec<ArgValue>) -> Self {
        Self {
            label: label.to_string(),
            actor: actor.to_string(),
            action: Action::Invoke {
                target: target.to_string(),
                method: method.to_string(),
                args,
                value: U256::ZERO,
            },
            expect: Expectation::Success,
            checks: Vec::new(),
        }
    }

    pub fn advance_time(label: &str, actor: &str, seconds: u64) -> Self {
        Self {
            label: label.to_string(),
            actor: actor.to_string(),
            action: Action::AdvanceTime(seconds),
            expect: Expectation::Success,
            checks: Vec::new(),
        }
    }

    /// Attach native value to an invocation.
    pub fn with_value(mut self, amount: U256) -> Self {
        if let Action::Invoke { value, .. } = &mut self.action {
            *value = amount;
        }
        self
    }

    pub fn expect_revert(mut self, reason: RevertReason) -> Self {
        self.expect = Expectation::Revert(reason);
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub probe: String,
    pub before: Option<U256>,
    pub after: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub label: String,
    /// Reason of the expected revert, if the step was one.
    pub reverted: Option<RevertReason>,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub steps: Vec<StepOutcome>,
}

impl ScenarioReport {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

pub struct ScenarioRunner<'a, R: ChainRpc + ?Sized> {
    rpc: &'a R,
    artifacts: &'a ArtifactStore,
}

impl<'a, R: ChainRpc + ?Sized> ScenarioRunner<'a, R> {
    pub fn new(rpc: &'a R, artifacts: &'a ArtifactStore) -> Self {
        Self { rpc, artifacts }
    }

    pub async fn run(&self, world: &World, steps: &[ScenarioStep]) -> Result<ScenarioReport, DeployError> {
        let mut report = ScenarioReport::default();
        for (index, step) in steps.iter().enumerate() {
            let outcome = self.run_step(world, index, step).await.map_err(|e| match e {
                DeployError::Assertion { .. } => e,
                other => other.at_step(Phase::Scenario, index, step.label.clone()),
            })?;
            report.steps.push(outcome);
        }
        info!(steps = report.len(), "Scenario passed");
        Ok(report)
    }

    async fn run_step(
        &self,
        world: &World,
        index: usize,
        step: &ScenarioStep,
    ) -> Result<StepOutcome, DeployError> {
        let actor = world.identity(&step.actor)?;

        let mut before = Vec::with_capacity(step.checks.len());
        for check in &step.checks {
            let reading = if check.needs_before() {
                Some(self.read(world, actor, check.probe()).await?)
            } else {
                None
            };
            before.push(reading);
        }

        let result = match &step.action {
            Action::Invoke {
                target,
                method,
                args,
                value,
            } => {
                let handle = world.contract(target)?;
                invoke(self.rpc, self.artifacts, world, actor, &handle, method, args, *value)
                    .await
                    .map(|_| ())
            }
            Action::AdvanceTime(seconds) => self.rpc.increase_time(*seconds).await,
        };

        let assertion = |detail: String| DeployError::Assertion {
            index,
            label: step.label.clone(),
            detail,
        };

        let reverted = match (&step.expect, result) {
            (Expectation::Success, Ok(())) => None,
            (Expectation::Success, Err(e)) => match e.root_cause() {
                DeployError::RemoteCall { .. } => {
                    return Err(assertion(format!("expected success, got: {e}")));
                }
                _ => return Err(e),
            },
            (Expectation::Revert(expected), Ok(())) => {
                return Err(assertion(format!("expected revert '{expected}', call succeeded")));
            }
            (Expectation::Revert(expected), Err(e)) => match e.root_cause() {
                DeployError::RemoteCall { reason, .. } => match reason {
                    Some(actual) if actual == expected => Some(actual.clone()),
                    Some(actual) => {
                        return Err(assertion(format!(
                            "expected revert '{expected}', got '{actual}'"
                        )));
                    }
                    None => {
                        return Err(assertion(format!(
                            "expected revert '{expected}', got failure without reason: {e}"
                        )));
                    }
                },
                _ => return Err(e),
            },
        };

        let mut readings = Vec::with_capacity(step.checks.len());
        for (check, before) in step.checks.iter().zip(before) {
            let after = self.read(world, actor, check.probe()).await?;
            debug!(probe = %check.probe(), ?before, %after, "Probe");
            if let Some(detail) = check.evaluate(before, after) {
                warn!(index, label = %step.label, detail = %detail, "Check failed");
                return Err(assertion(detail));
            }
            readings.push(Reading {
                probe: check.probe().to_string(),
                before,
                after,
            });
        }

        info!(index, label = %step.label, reverted = ?reverted, "Step passed");
        Ok(StepOutcome {
            index,
            label: step.label.clone(),
            reverted,
            readings,
        })
    }

    async fn read(&self, world: &World, from: Address, probe: &Probe) -> Result<U256, DeployError> {
        match probe {
            Probe::Call {
                contract,
                method,
                args,
            } => {
                let handle = world.contract(contract)?;
                read_uint(self.rpc, self.artifacts, world, from, &handle, method, args).await
            }
            Probe::Ratio {
                numerator,
                denominator,
            } => {
                let num = Box::pin(self.read(world, from, numerator)).await?;
                let den = Box::pin(self.read(world, from, denominator)).await?;
                Ok(ratio_bps(num, den))
            }
        }
    }
}

/// `num / den` in basis points, zero for a zero denominator.
pub fn ratio_bps(num: U256, den: U256) -> U256 {
    if den.is_zero() {
        return U256::ZERO;
    }
    num.saturating_mul(U256::from(BPS)) / den
}
