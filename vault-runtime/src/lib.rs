pub mod error;
pub mod revert;
pub mod descriptor;
pub mod artifacts;
pub mod abi;
pub mod chain;
pub mod rpc;
pub mod registry;
pub mod snapshot;
pub mod invoke;
pub mod orchestrator;
pub mod configure;
pub mod scenario;
pub mod contracts;
pub mod actions;
pub mod units;
pub mod config;
pub mod plan;

pub use error::{DeployError, Phase};
pub use revert::RevertReason;
pub use descriptor::{ArgValue, ContractDescriptor, WiringStep, addr_of};
pub use registry::{DeployedContract, Registry};
pub use rpc::{AlloyRpc, ChainRpc, TxHandle, TxReceipt};
pub use orchestrator::{DeploymentPlan, Orchestrator};
pub use configure::{ConfigApplier, ConfigItem};
pub use scenario::{ScenarioRunner, ScenarioStep, World};
