//! The ENF WBTC-borrow-ETH system: what gets deployed, how it is wired and
//! configured, and the lifecycle scenario run against it.

use alloy::primitives::U256;

use crate::chain::Identity;
use crate::config::{DEPLOYER, DeployConfig};
use crate::configure::ConfigItem;
use crate::contracts;
use crate::descriptor::{ArgValue, ContractDescriptor, WiringStep, addr_of};
use crate::error::DeployError;
use crate::orchestrator::DeploymentPlan;
use crate::registry::Registry;
use crate::revert::RevertReason;
use crate::scenario::{Check, Probe, ScenarioStep, World};
use crate::units::{SHARE_DECIMALS, WBTC_DECIMALS, parse_amount};

pub const PROXY_ADMIN: &str = "ProxyAdmin";
pub const DEPOSIT_APPROVER: &str = "DepositApprover";
pub const VAULT: &str = "EFVault";
pub const CONTROLLER: &str = "Controller";
pub const STRATEGY: &str = "WBTCBorrowETH";

/// External contracts attached to the scenario world.
pub const WBTC: &str = "WBTC";
pub const UNISWAP_V2: &str = "UniswapV2Router";

/// Deploy order and cross-wiring. Strategy registration is kept separate so
/// the scenario can exercise it.
pub fn deployment_plan(config: &DeployConfig) -> DeploymentPlan {
    let tokens = &config.tokens;
    let protocols = &config.protocols;
    let params = &config.strategy;

    let descriptors = vec![
        ContractDescriptor::named(PROXY_ADMIN, vec![]),
        ContractDescriptor::named(DEPOSIT_APPROVER, vec![tokens.wbtc.into()]),
        ContractDescriptor::named(
            VAULT,
            vec![
                tokens.wbtc.into(),
                params.vault_name.as_str().into(),
                params.vault_symbol.as_str().into(),
            ],
        )
        .upgradeable(),
        ContractDescriptor::named(
            CONTROLLER,
            vec![
                addr_of(VAULT),
                tokens.wbtc.into(),
                config.treasury.into(),
                tokens.weth.into(),
            ],
        )
        .upgradeable(),
        ContractDescriptor::named(
            STRATEGY,
            vec![
                tokens.wbtc.into(),
                tokens.awbtc.into(),
                tokens.weth.into(),
                ArgValue::uint(params.mlr),
                protocols.aave.into(),
                addr_of(VAULT),
                addr_of(CONTROLLER),
                protocols.aave_oracle.into(),
                protocols.eth_leverage.into(),
                config.treasury.into(),
                ArgValue::uint(params.harvest_fee),
            ],
        )
        .upgradeable(),
    ];

    let wiring = vec![
        WiringStep::set(DEPOSIT_APPROVER, "setVault", VAULT),
        WiringStep::set(VAULT, "setDepositApprover", DEPOSIT_APPROVER),
        WiringStep::set(VAULT, "setController", CONTROLLER),
        WiringStep::set(VAULT, "setSubStrategy", STRATEGY),
    ];

    DeploymentPlan {
        descriptors,
        wiring,
    }
}

/// `Controller.registerSubStrategy(strategy, allocPoint)`.
pub fn strategy_registration(config: &DeployConfig) -> WiringStep {
    WiringStep::with_args(
        CONTROLLER,
        "registerSubStrategy",
        STRATEGY,
        vec![addr_of(STRATEGY), ArgValue::uint(config.strategy.alloc_point)],
    )
}

pub fn configuration(config: &DeployConfig) -> Vec<ConfigItem> {
    let params = &config.strategy;
    let wired = "EFVault.setSubStrategy";
    vec![
        ConfigItem::new(
            "deposit slippage",
            STRATEGY,
            "setDepositSlippage",
            vec![ArgValue::uint(params.deposit_slippage)],
        )
        .requires(wired),
        ConfigItem::new(
            "withdraw slippage",
            STRATEGY,
            "setWithdrawSlippage",
            vec![ArgValue::uint(params.withdraw_slippage)],
        )
        .requires(wired),
        ConfigItem::new(
            "swap info",
            STRATEGY,
            "setSwapInfo",
            vec![
                config.protocols.uniswap_v3_router.into(),
                ArgValue::uint(params.swap_fee_tier),
            ],
        )
        .requires(wired),
    ]
}

/// Registry plus the token and router the scenario talks to.
pub fn scenario_world(config: &DeployConfig, registry: Registry, identities: Vec<Identity>) -> World {
    let mut world = World::new(registry, identities);
    world.attach(WBTC, contracts::ERC20, config.tokens.wbtc);
    world.attach(
        UNISWAP_V2,
        contracts::UNISWAP_V2_ROUTER,
        config.protocols.uniswap_v2_router,
    );
    world
}

fn wbtc(amount: &str) -> Result<ArgValue, DeployError> {
    Ok(ArgValue::Uint(parse_amount(amount, WBTC_DECIMALS)?))
}

fn balance_of(contract: &str, owner: &str) -> Probe {
    Probe::call(contract, "balanceOf", vec![addr_of(owner)])
}

/// Swap, register, deposit, withdraw, leverage, harvest and emergency paths
/// of a freshly deployed (unregistered) system.
pub fn vault_lifecycle_scenario(config: &DeployConfig) -> Result<Vec<ScenarioStep>, DeployError> {
    let user = config.scenario.user.as_str();
    let owner = DEPLOYER;
    let scenario = &config.scenario;
    let alloc = config.strategy.alloc_point;

    let total_alloc = || Probe::call(CONTROLLER, "totalAllocPoint", vec![]);
    let strategy_count = || Probe::call(CONTROLLER, "subStrategyLength", vec![]);
    let vault_assets = || Probe::call(VAULT, "totalAssets", vec![]);
    let ltv = || {
        Probe::ratio(
            Probe::call(STRATEGY, "getDebt", vec![]),
            Probe::call(STRATEGY, "getCollateral", vec![]),
        )
    };

    let swap_value = parse_amount(&scenario.swap_eth, SHARE_DECIMALS)?;
    let swap = |label: &str, who: &str| {
        ScenarioStep::invoke(
            label,
            who,
            UNISWAP_V2,
            "swapExactETHForTokensSupportingFeeOnTransferTokens",
            vec![
                ArgValue::uint(0),
                ArgValue::Array(vec![config.tokens.weth.into(), config.tokens.wbtc.into()]),
                addr_of(who),
                ArgValue::uint(config.scripts.swap_deadline),
            ],
        )
        .with_value(swap_value)
        .check(Check::Increased(balance_of(WBTC, who)))
    };

    let register = |label: &str, who: &str| {
        ScenarioStep::invoke(
            label,
            who,
            CONTROLLER,
            "registerSubStrategy",
            vec![addr_of(STRATEGY), ArgValue::uint(alloc)],
        )
    };

    let deposit = wbtc(&scenario.deposit_wbtc)?;
    let approve = |label: &str, who: &str, spender: &str, amount: ArgValue| {
        ScenarioStep::invoke(label, who, WBTC, "approve", vec![addr_of(spender), amount])
    };
    let deposit_step = |label: &str| {
        ScenarioStep::invoke(label, user, DEPOSIT_APPROVER, "deposit", vec![deposit.clone()])
            .check(Check::Increased(balance_of(VAULT, user)))
            .check(Check::Increased(vault_assets()))
    };

    let set_mlr = |label: &str, mlr: u64| {
        ScenarioStep::invoke(label, owner, STRATEGY, "setMLR", vec![ArgValue::uint(mlr)])
    };

    let owner_deposit = wbtc(&scenario.owner_deposit_wbtc)?;

    Ok(vec![
        swap("swap ether to wbtc as user", user),
        swap("swap ether to wbtc as owner", owner),
        register("register strategy as non-owner", user)
            .expect_revert(RevertReason::NotOwner)
            .check(Check::Unchanged(total_alloc()))
            .check(Check::Unchanged(strategy_count())),
        register("register strategy", owner)
            .check(Check::Equals(total_alloc(), U256::from(alloc)))
            .check(Check::Equals(strategy_count(), U256::from(1))),
        register("register strategy twice", owner)
            .expect_revert(RevertReason::AlreadyRegistered)
            .check(Check::Unchanged(total_alloc()))
            .check(Check::Unchanged(strategy_count())),
        approve("approve first deposit", user, DEPOSIT_APPROVER, deposit.clone()),
        deposit_step("first deposit"),
        approve("approve second deposit", user, DEPOSIT_APPROVER, deposit.clone()),
        deposit_step("second deposit"),
        ScenarioStep::invoke(
            "withdraw more than deposited",
            user,
            VAULT,
            "withdraw",
            vec![wbtc(&scenario.excess_withdraw_wbtc)?, addr_of(user)],
        )
        .expect_revert(RevertReason::ExceedTotalDeposit)
        .check(Check::Unchanged(balance_of(VAULT, user)))
        .check(Check::Unchanged(vault_assets())),
        ScenarioStep::invoke(
            "withdraw",
            user,
            VAULT,
            "withdraw",
            vec![wbtc(&scenario.withdraw_wbtc)?, addr_of(user)],
        )
        .check(Check::Decreased(balance_of(VAULT, user)))
        .check(Check::Increased(balance_of(WBTC, user))),
        set_mlr("raise max leverage ratio", scenario.raised_mlr),
        ScenarioStep::invoke("raise LTV", owner, STRATEGY, "raiseLTV", vec![])
            .check(Check::Increased(ltv())),
        set_mlr("restore max leverage ratio", config.strategy.mlr),
        ScenarioStep::invoke("reduce LTV", owner, STRATEGY, "reduceLTV", vec![])
            .check(Check::NotIncreased(ltv())),
        ScenarioStep::invoke("emergency withdraw as non-owner", user, STRATEGY, "emergencyWithdraw", vec![])
            .expect_revert(RevertReason::NotOwner)
            .check(Check::Unchanged(vault_assets())),
        ScenarioStep::invoke(
            "owner deposit as non-owner",
            user,
            STRATEGY,
            "ownerDeposit",
            vec![owner_deposit.clone()],
        )
        .expect_revert(RevertReason::NotOwner)
        .check(Check::Unchanged(vault_assets())),
        ScenarioStep::advance_time("pass time", owner, scenario.harvest_delay_secs),
        ScenarioStep::invoke("harvest", owner, STRATEGY, "harvest", vec![]),
        approve("approve owner deposit", owner, STRATEGY, owner_deposit.clone()),
        ScenarioStep::invoke("owner deposit", owner, STRATEGY, "ownerDeposit", vec![owner_deposit])
            .check(Check::Increased(Probe::call(
                STRATEGY,
                "totalAssets",
                vec![ArgValue::Bool(true)],
            ))),
        ScenarioStep::invoke("emergency withdraw", owner, STRATEGY, "emergencyWithdraw", vec![])
            .check(Check::Increased(balance_of(WBTC, owner))),
    ])
}
