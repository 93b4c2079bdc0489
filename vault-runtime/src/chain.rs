//! Chain client for connecting to EVM-compatible nodes.
//!
//! Provides a configured provider whose wallet holds one local signer per
//! acting identity, so any identity can submit transactions through the same
//! connection by setting `from`.

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::Address;
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity as IdentityLayer, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;

use crate::error::DeployError;
use crate::rpc::remote_call_error;

/// The concrete provider type produced by `ProviderBuilder::new().wallet(...).connect_http(...)`.
pub type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            IdentityLayer,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// A named account able to sign transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub label: String,
    pub address: Address,
}

/// A chain client wrapping an alloy provider with one signer per identity.
pub struct ChainClient {
    pub provider: HttpProvider,
    pub chain_id: u64,
    identities: Vec<Identity>,
}

impl ChainClient {
    /// Create a new chain client from an RPC URL and `(label, private key)`
    /// pairs. The first pair is the default signer.
    ///
    /// Private keys are hex strings (with or without "0x" prefix).
    pub fn new(rpc_url: &str, keys: &[(&str, &str)], chain_id: u64) -> Result<Self, DeployError> {
        let mut identities = Vec::with_capacity(keys.len());
        let mut wallet: Option<EthereumWallet> = None;

        for (label, private_key) in keys {
            let signer: PrivateKeySigner = private_key.parse().map_err(|e| {
                DeployError::ConfigError(format!("Invalid private key for '{label}': {e}"))
            })?;
            identities.push(Identity {
                label: (*label).to_string(),
                address: signer.address(),
            });
            match wallet.as_mut() {
                Some(w) => w.register_signer(signer),
                None => wallet = Some(EthereumWallet::from(signer)),
            }
        }

        let wallet = wallet
            .ok_or_else(|| DeployError::ConfigError("At least one signing key is required".into()))?;

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| DeployError::ConfigError(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self {
            provider,
            chain_id,
            identities,
        })
    }

    /// Fail when the node reports a different chain id than configured.
    pub async fn verify_chain_id(&self) -> Result<(), DeployError> {
        let remote = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| remote_call_error("eth_chainId", &e))?;
        if remote != self.chain_id {
            return Err(DeployError::ConfigError(format!(
                "Node reports chain id {remote}, expected {}",
                self.chain_id
            )));
        }
        Ok(())
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// The identity registered first (the deployer).
    pub fn default_identity(&self) -> &Identity {
        &self.identities[0]
    }

    pub fn identity(&self, label: &str) -> Option<&Identity> {
        self.identities.iter().find(|id| id.label == label)
    }
}
