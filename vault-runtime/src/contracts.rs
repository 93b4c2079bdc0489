//! Solidity bindings for the ENF vault system and the external contracts it
//! talks to.
//!
//! The `sol!` interfaces give the scripts type-safe calldata. Contracts that
//! are never deployed from this repository (tokens, DEX routers) also get a
//! human-readable ABI so the scenario harness can call them by name.

use alloy::primitives::Bytes;
use alloy::sol;

use crate::artifacts::{Artifact, ArtifactStore};
use crate::error::DeployError;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface IDepositApprover {
        function setVault(address _vault) external;
        function deposit(uint256 _amount) external;
    }

    #[sol(rpc)]
    interface IEFVault {
        function totalAssets() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function withdraw(uint256 assets, address receiver) external returns (uint256 shares);
    }

    #[sol(rpc)]
    interface IUniswapV2Router {
        function swapExactETHForTokens(
            uint256 amountOutMin, address[] calldata path, address to, uint256 deadline
        ) external payable returns (uint256[] memory amounts);
    }
}

/// Artifact name for ERC20 tokens attached to a scenario.
pub const ERC20: &str = "IERC20";
/// Artifact name for the Uniswap V2 router.
pub const UNISWAP_V2_ROUTER: &str = "IUniswapV2Router";

pub const ERC20_ABI: &[&str] = &[
    "function balanceOf(address account) view returns (uint256)",
    "function allowance(address owner, address spender) view returns (uint256)",
    "function approve(address spender, uint256 amount) returns (bool)",
    "function transfer(address to, uint256 amount) returns (bool)",
    "function decimals() view returns (uint8)",
];

pub const UNISWAP_V2_ROUTER_ABI: &[&str] = &[
    "function swapExactETHForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) payable returns (uint256[] amounts)",
    "function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) payable",
];

/// Register the interface-only artifacts for external contracts.
pub fn register_external_artifacts(store: &ArtifactStore) -> Result<(), DeployError> {
    store.insert(Artifact::from_signatures(ERC20, ERC20_ABI, Bytes::new())?);
    store.insert(Artifact::from_signatures(
        UNISWAP_V2_ROUTER,
        UNISWAP_V2_ROUTER_ABI,
        Bytes::new(),
    )?);
    Ok(())
}
