//! A chain double that records every request and returns canned results.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use vault_runtime::error::DeployError;
use vault_runtime::revert::RevertReason;
use vault_runtime::rpc::{ChainRpc, TxHandle, TxReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Deploy {
        from: Address,
        init_code: Bytes,
        context: String,
        address: Address,
        tx_hash: TxHash,
    },
    Send {
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
        context: String,
        tx_hash: TxHash,
    },
    Call {
        to: Address,
        calldata: Bytes,
    },
    WaitForFinality(TxHash),
    IncreaseTime(u64),
}

#[derive(Default)]
struct Inner {
    nonce: u64,
    requests: Vec<Request>,
    receipts: HashMap<TxHash, TxReceipt>,
    reverts: Vec<(String, RevertReason)>,
}

#[derive(Default)]
pub struct RecordingChain {
    inner: Mutex<Inner>,
}

impl RecordingChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send whose context contains `needle` revert with `reason`.
    pub fn revert_when(&self, needle: &str, reason: RevertReason) {
        self.inner.lock().unwrap().reverts.push((needle.to_string(), reason));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn deploy_contexts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Deploy { context, .. } => Some(context),
                _ => None,
            })
            .collect()
    }

    pub fn send_contexts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Send { context, .. } => Some(context),
                _ => None,
            })
            .collect()
    }

    fn next_tx(inner: &mut Inner, contract_address: Option<Address>) -> TxHash {
        inner.nonce += 1;
        let tx_hash = TxHash::left_padding_from(&inner.nonce.to_be_bytes());
        inner.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(inner.nonce),
                gas_used: 21_000,
                contract_address,
            },
        );
        tx_hash
    }
}

/// Address of the `n`th contract created on a recording chain.
pub fn created_address(n: u64) -> Address {
    Address::left_padding_from(&(0x1000 + n).to_be_bytes())
}

#[async_trait]
impl ChainRpc for RecordingChain {
    async fn deploy(
        &self,
        from: Address,
        init_code: Bytes,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let mut inner = self.inner.lock().unwrap();
        let created = inner
            .requests
            .iter()
            .filter(|r| matches!(r, Request::Deploy { .. }))
            .count() as u64;
        let address = created_address(created + 1);
        let tx_hash = Self::next_tx(&mut inner, Some(address));
        inner.requests.push(Request::Deploy {
            from,
            init_code,
            context: context.to_string(),
            address,
            tx_hash,
        });
        Ok(TxHandle {
            tx_hash,
            context: context.to_string(),
        })
    }

    async fn send(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, reason)) = inner.reverts.iter().find(|(needle, _)| context.contains(needle)) {
            return Err(DeployError::RemoteCall {
                context: context.to_string(),
                reason: Some(reason.clone()),
                message: format!("execution reverted: {reason}"),
            });
        }
        let tx_hash = Self::next_tx(&mut inner, None);
        inner.requests.push(Request::Send {
            from,
            to,
            calldata,
            value,
            context: context.to_string(),
            tx_hash,
        });
        Ok(TxHandle {
            tx_hash,
            context: context.to_string(),
        })
    }

    async fn call(&self, _from: Address, to: Address, calldata: Bytes) -> Result<Bytes, DeployError> {
        self.inner
            .lock()
            .unwrap()
            .requests
            .push(Request::Call { to, calldata });
        Ok(Bytes::from(vec![0u8; 32]))
    }

    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt, DeployError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Request::WaitForFinality(tx.tx_hash));
        inner
            .receipts
            .get(&tx.tx_hash)
            .cloned()
            .ok_or_else(|| DeployError::RemoteCall {
                context: tx.context.clone(),
                reason: None,
                message: "unknown transaction".into(),
            })
    }

    async fn increase_time(&self, seconds: u64) -> Result<(), DeployError> {
        self.inner
            .lock()
            .unwrap()
            .requests
            .push(Request::IncreaseTime(seconds));
        Ok(())
    }
}
