//! Encode-send-confirm helpers shared by wiring, configuration and scenarios.

use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::abi;
use crate::artifacts::ArtifactStore;
use crate::descriptor::{ArgValue, ReferenceResolver};
use crate::error::DeployError;
use crate::rpc::{ChainRpc, TxReceipt};

/// A contract that can be invoked by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub name: String,
    pub artifact: String,
    pub address: Address,
}

/// Encode `method(args)` against the handle's ABI, submit it as `from`, and
/// wait for finality.
#[allow(clippy::too_many_arguments)]
pub async fn invoke<R: ChainRpc + ?Sized>(
    rpc: &R,
    artifacts: &ArtifactStore,
    resolver: &dyn ReferenceResolver,
    from: Address,
    target: &ContractHandle,
    method: &str,
    args: &[ArgValue],
    value: U256,
) -> Result<TxReceipt, DeployError> {
    let context = format!("{}.{method}", target.name);
    let artifact = artifacts.load(&target.artifact)?;
    let calldata = abi::encode_call(&artifact, method, args, resolver, &context)?;
    debug!(%from, to = %target.address, context = %context, "Invoking");
    let tx = rpc.send(from, target.address, calldata, value, &context).await?;
    rpc.wait_for_finality(&tx).await
}

/// Read a single uint return value from a view function.
pub async fn read_uint<R: ChainRpc + ?Sized>(
    rpc: &R,
    artifacts: &ArtifactStore,
    resolver: &dyn ReferenceResolver,
    from: Address,
    target: &ContractHandle,
    method: &str,
    args: &[ArgValue],
) -> Result<U256, DeployError> {
    let context = format!("{}.{method}", target.name);
    let artifact = artifacts.load(&target.artifact)?;
    let calldata = abi::encode_call(&artifact, method, args, resolver, &context)?;
    let output = rpc.call(from, target.address, calldata).await?;
    let values = abi::decode_output(&artifact, method, args.len(), &output)?;
    abi::first_uint(&values)
}
