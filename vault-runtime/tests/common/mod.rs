#![allow(dead_code)]

pub mod recording;
pub mod simulated;

use std::sync::Once;

use alloy::primitives::{Address, Bytes, address};
use vault_runtime::artifacts::{Artifact, ArtifactStore};
use vault_runtime::chain::Identity;
use vault_runtime::config::DeployConfig;
use vault_runtime::contracts::register_external_artifacts;

static LOG_INIT: Once = Once::new();

pub fn setup_log() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

pub const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const ALICE: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const WBTC: Address = address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const UNISWAP_V2_ROUTER: Address = address!("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

/// Contract name, human-readable ABI.
pub const ARTIFACTS: &[(&str, &[&str])] = &[
    (
        "ProxyAdmin",
        &["function upgrade(address proxy, address implementation)"],
    ),
    (
        "TransparentUpgradeableProxy",
        &["constructor(address _logic, address admin_, bytes _data)"],
    ),
    (
        "DepositApprover",
        &[
            "constructor(address _asset)",
            "function setVault(address _vault)",
            "function deposit(uint256 _amount)",
        ],
    ),
    (
        "EFVault",
        &[
            "function initialize(address _asset, string _name, string _symbol)",
            "function setDepositApprover(address _depositApprover)",
            "function setController(address _controller)",
            "function setSubStrategy(address _subStrategy)",
            "function totalAssets() view returns (uint256)",
            "function balanceOf(address account) view returns (uint256)",
            "function withdraw(uint256 assets, address receiver) returns (uint256 shares)",
        ],
    ),
    (
        "Controller",
        &[
            "function initialize(address _vault, address _asset, address _treasury, address _weth)",
            "function registerSubStrategy(address _subStrategy, uint256 _allocPoint)",
            "function totalAllocPoint() view returns (uint256)",
            "function subStrategyLength() view returns (uint256)",
        ],
    ),
    (
        "WBTCBorrowETH",
        &[
            "function initialize(address _baseToken, address _aToken, address _weth, uint256 _mlr, address _aave, address _vault, address _controller, address _aaveOracle, address _ethLeverage, address _feePool, uint256 _harvestFee)",
            "function setDepositSlippage(uint256 _slippage)",
            "function setWithdrawSlippage(uint256 _slippage)",
            "function setSwapInfo(address _router, uint24 _fee)",
            "function setMLR(uint256 _mlr)",
            "function raiseLTV()",
            "function reduceLTV()",
            "function getDebt() view returns (uint256)",
            "function getCollateral() view returns (uint256)",
            "function harvest()",
            "function ownerDeposit(uint256 _amount)",
            "function emergencyWithdraw()",
            "function totalAssets(bool fetch) view returns (uint256)",
        ],
    ),
];

/// Fake creation bytecode, unique per artifact so test chains can tell
/// deployments apart.
pub fn bytecode_for(name: &str) -> Bytes {
    let index = ARTIFACTS
        .iter()
        .position(|(n, _)| *n == name)
        .unwrap_or_else(|| panic!("unknown test artifact {name}"));
    Bytes::from(vec![0x60, 0x80, index as u8])
}

pub fn test_artifact(name: &str) -> Artifact {
    let (_, signatures) = ARTIFACTS.iter().find(|(n, _)| *n == name).unwrap();
    Artifact::from_signatures(name, signatures, bytecode_for(name)).unwrap()
}

/// Store preloaded with every system artifact and the external ABIs.
pub fn test_artifacts() -> ArtifactStore {
    let store = ArtifactStore::default();
    for (name, _) in ARTIFACTS {
        store.insert(test_artifact(name));
    }
    register_external_artifacts(&store).unwrap();
    store
}

pub fn test_config() -> DeployConfig {
    DeployConfig::from_toml(&format!(
        r#"
        treasury = "0x00000000000000000000000000000000000000f0"

        [tokens]
        wbtc = "{WBTC}"
        awbtc = "0x9ff58f4fFB29fA2266Ab25e75e2A8b3503311656"
        weth = "{WETH}"

        [protocols]
        aave = "0x7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9"
        aave_oracle = "0xA50ba011c48153De246E5192C8f9258A2ba79Ca9"
        eth_leverage = "0x00000000000000000000000000000000000000e1"
        uniswap_v3_router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
        uniswap_v2_router = "{UNISWAP_V2_ROUTER}"
        "#
    ))
    .unwrap()
}

pub fn identities() -> Vec<Identity> {
    vec![
        Identity {
            label: "deployer".into(),
            address: DEPLOYER,
        },
        Identity {
            label: "alice".into(),
            address: ALICE,
        },
    ]
}
