//! RPC client facade.
//!
//! Every deploy, wiring, configuration and scenario step goes through
//! [`ChainRpc`], one request at a time. [`AlloyRpc`] is the implementation
//! backed by a live node.

use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::ChainClient;
use crate::error::DeployError;
use crate::revert::{RevertReason, reason_from_rpc_error};

/// A submitted, not yet confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle {
    pub tx_hash: TxHash,
    /// Human-readable description used in logs and errors.
    pub context: String,
}

/// Confirmed transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Set for contract creations.
    pub contract_address: Option<Address>,
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Submit a contract creation transaction.
    async fn deploy(
        &self,
        from: Address,
        init_code: Bytes,
        context: &str,
    ) -> Result<TxHandle, DeployError>;

    /// Submit a state-changing call.
    async fn send(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
        context: &str,
    ) -> Result<TxHandle, DeployError>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, from: Address, to: Address, calldata: Bytes) -> Result<Bytes, DeployError>;

    /// Block until the transaction is final; a reverted receipt is an error.
    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt, DeployError>;

    /// Move the dev-chain clock forward and mine a block.
    async fn increase_time(&self, seconds: u64) -> Result<(), DeployError>;
}

/// Build a `RemoteCall` error from a transport failure.
pub fn remote_call_error(context: &str, err: &RpcError<TransportErrorKind>) -> DeployError {
    DeployError::RemoteCall {
        context: context.to_string(),
        reason: reason_from_rpc_error(err),
        message: err.to_string(),
    }
}

/// [`ChainRpc`] over an alloy HTTP provider.
pub struct AlloyRpc {
    client: ChainClient,
    required_confirmations: u64,
}

impl AlloyRpc {
    pub fn new(client: ChainClient, required_confirmations: u64) -> Self {
        Self {
            client,
            required_confirmations: required_confirmations.max(1),
        }
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    async fn submit(&self, tx: TransactionRequest, context: &str) -> Result<TxHandle, DeployError> {
        let pending = self
            .client
            .provider()
            .send_transaction(tx)
            .await
            .map_err(|e| remote_call_error(context, &e))?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, context, "Transaction submitted");
        Ok(TxHandle {
            tx_hash,
            context: context.to_string(),
        })
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    async fn deploy(
        &self,
        from: Address,
        init_code: Bytes,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let mut tx = TransactionRequest::default()
            .from(from)
            .input(TransactionInput::both(init_code));
        tx.to = Some(TxKind::Create);
        self.submit(tx, context).await
    }

    async fn send(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let tx = TransactionRequest::default()
            .from(from)
            .to(to)
            .input(calldata.into())
            .value(value);
        self.submit(tx, context).await
    }

    async fn call(&self, from: Address, to: Address, calldata: Bytes) -> Result<Bytes, DeployError> {
        let tx = TransactionRequest::default()
            .from(from)
            .to(to)
            .input(calldata.into());
        self.client
            .provider()
            .call(tx)
            .await
            .map_err(|e| remote_call_error(&format!("eth_call to {to}"), &e))
    }

    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt, DeployError> {
        let receipt = PendingTransactionBuilder::new(self.client.provider().root().clone(), tx.tx_hash)
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await
            .map_err(|e| DeployError::RemoteCall {
                context: tx.context.clone(),
                reason: None,
                message: format!("Receipt fetch failed: {e}"),
            })?;

        if !receipt.status() {
            warn!(tx_hash = %tx.tx_hash, context = %tx.context, "Transaction reverted");
            return Err(DeployError::RemoteCall {
                context: tx.context.clone(),
                reason: Some(RevertReason::Other("transaction reverted".into())),
                message: format!("transaction {} reverted", tx.tx_hash),
            });
        }

        debug!(tx_hash = %tx.tx_hash, block = ?receipt.block_number, "Transaction confirmed");
        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
        })
    }

    async fn increase_time(&self, seconds: u64) -> Result<(), DeployError> {
        let provider = self.client.provider();
        let _: serde_json::Value = provider
            .raw_request("evm_increaseTime".into(), [seconds])
            .await
            .map_err(|e| remote_call_error("evm_increaseTime", &e))?;
        let _: serde_json::Value = provider
            .raw_request("evm_mine".into(), ())
            .await
            .map_err(|e| remote_call_error("evm_mine", &e))?;
        info!(seconds, "Advanced chain time");
        Ok(())
    }
}
