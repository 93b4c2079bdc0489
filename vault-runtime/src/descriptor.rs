//! Static descriptions of what to deploy and how to wire it.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// A loosely typed call argument.
///
/// The exact Solidity type is taken from the target ABI at encoding time, so
/// `Uint(6750)` can feed a `uint16` or a `uint256` parameter alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Str(String),
    Bytes(Bytes),
    Array(Vec<ArgValue>),
    /// Address of another named entity, substituted right before use.
    Ref(String),
}

impl ArgValue {
    pub fn uint(value: u64) -> Self {
        ArgValue::Uint(U256::from(value))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ArgValue::Ref(name.into())
    }

    /// Names of every `Ref` in this value, including nested ones.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ArgValue::Ref(name) => out.push(name),
            ArgValue::Array(items) => items.iter().for_each(|item| item.collect_references(out)),
            _ => {}
        }
    }
}

impl From<Address> for ArgValue {
    fn from(value: Address) -> Self {
        ArgValue::Address(value)
    }
}

impl From<U256> for ArgValue {
    fn from(value: U256) -> Self {
        ArgValue::Uint(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

/// Shorthand for [`ArgValue::Ref`].
pub fn addr_of(name: &str) -> ArgValue {
    ArgValue::reference(name)
}

/// Resolves `Ref` placeholders to addresses.
pub trait ReferenceResolver {
    /// `required_by` names the step or descriptor asking, for error messages.
    fn resolve_address(&self, name: &str, required_by: &str) -> Result<Address, DeployError>;
}

/// One contract to deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDescriptor {
    /// Logical name, unique within a run.
    pub name: String,
    /// Compiled artifact to deploy (`EFVault`, `Controller`, ...).
    pub artifact: String,
    /// Constructor arguments, or initializer arguments when upgradeable.
    pub args: Vec<ArgValue>,
    pub upgradeable: bool,
    /// Dependencies not visible in `args`.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ContractDescriptor {
    pub fn new(name: impl Into<String>, artifact: impl Into<String>, args: Vec<ArgValue>) -> Self {
        Self {
            name: name.into(),
            artifact: artifact.into(),
            args,
            upgradeable: false,
            depends_on: Vec::new(),
        }
    }

    /// Same artifact name as logical name.
    pub fn named(name: impl Into<String>, args: Vec<ArgValue>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, args)
    }

    pub fn upgradeable(mut self) -> Self {
        self.upgradeable = true;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Explicit dependencies followed by every reference in the arguments,
    /// deduplicated, in first-seen order.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        let refs = self.args.iter().flat_map(ArgValue::references);
        for name in self.depends_on.iter().map(String::as_str).chain(refs) {
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
        deps
    }
}

/// A setter call informing `source` of `target`'s address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiringStep {
    pub source: String,
    pub target: String,
    pub method: String,
    pub args: Vec<ArgValue>,
}

impl WiringStep {
    /// `source.method(ref(target))`, the common single-address setter.
    pub fn set(source: &str, method: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            method: method.to_string(),
            args: vec![addr_of(target)],
        }
    }

    pub fn with_args(source: &str, method: &str, target: &str, args: Vec<ArgValue>) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            method: method.to_string(),
            args,
        }
    }

    /// Key recorded in the registry once the step is confirmed.
    pub fn label(&self) -> String {
        format!("{}.{}", self.source, self.method)
    }

    /// Names that must be registered before this step can run.
    pub fn required_names(&self) -> Vec<&str> {
        let mut names = vec![self.source.as_str(), self.target.as_str()];
        for name in self.args.iter().flat_map(ArgValue::references) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
