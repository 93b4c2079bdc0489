//! An in-memory model of the ENF vault system behind the `ChainRpc` facade.
//!
//! Calldata is decoded against the same human-readable ABIs the tests
//! register as artifacts, so anything the harness encodes wrong fails here.
//! Shares are minted 1:1 with deposited WBTC (18 vs 8 decimals) and
//! debt = collateral * ltv.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::{JsonAbi, StateMutability};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use vault_runtime::contracts::{ERC20_ABI, UNISWAP_V2_ROUTER_ABI};
use vault_runtime::error::DeployError;
use vault_runtime::revert::RevertReason;
use vault_runtime::rpc::{ChainRpc, TxHandle, TxReceipt};

use super::{ARTIFACTS, UNISWAP_V2_ROUTER, WBTC, bytecode_for};

const NOT_OWNER: &str = "Ownable: caller is not the owner";
const BPS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    ProxyAdmin,
    Proxy,
    DepositApprover,
    Vault,
    Controller,
    Strategy,
    Token,
    Router,
}

fn kind_of(name: &str) -> Kind {
    match name {
        "ProxyAdmin" => Kind::ProxyAdmin,
        "TransparentUpgradeableProxy" => Kind::Proxy,
        "DepositApprover" => Kind::DepositApprover,
        "EFVault" => Kind::Vault,
        "Controller" => Kind::Controller,
        "WBTCBorrowETH" => Kind::Strategy,
        other => panic!("no simulated kind for {other}"),
    }
}

#[derive(Default)]
struct State {
    nonce: u64,
    created: u64,
    kinds: HashMap<Address, Kind>,
    implementations: HashMap<Address, Address>,
    receipts: HashMap<TxHash, TxReceipt>,
    calls: Vec<String>,
    elapsed: u64,

    wbtc: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,

    approver_vault: Option<Address>,
    vault_links: HashSet<&'static str>,
    shares: HashMap<Address, U256>,
    total_assets: U256,

    strategies: Vec<Address>,
    total_alloc: U256,

    mlr: U256,
    ltv_bps: U256,
    collateral: U256,
    debt: U256,
    harvests: u64,
}

impl State {
    fn balance(&self, who: Address) -> U256 {
        self.wbtc.get(&who).copied().unwrap_or_default()
    }

    fn credit(&mut self, who: Address, amount: U256) {
        *self.wbtc.entry(who).or_default() += amount;
    }

    /// `transferFrom(owner, spender, amount)` on WBTC.
    fn pull(&mut self, owner: Address, spender: Address, amount: U256) -> Result<(), String> {
        let allowance = self.allowances.get(&(owner, spender)).copied().unwrap_or_default();
        if allowance < amount {
            return Err("ERC20: insufficient allowance".into());
        }
        if self.balance(owner) < amount {
            return Err("ERC20: transfer amount exceeds balance".into());
        }
        self.allowances.insert((owner, spender), allowance - amount);
        *self.wbtc.entry(owner).or_default() -= amount;
        Ok(())
    }

    fn rebalance(&mut self) {
        self.debt = self.collateral * self.ltv_bps / U256::from(BPS);
    }

    fn share_scale() -> U256 {
        U256::from(10u64).pow(U256::from(10))
    }
}

fn uint(value: &DynSolValue) -> U256 {
    value.as_uint().map(|(v, _)| v).unwrap()
}

fn addr(value: &DynSolValue) -> Address {
    value.as_address().unwrap()
}

fn ret(value: U256) -> Result<Vec<DynSolValue>, String> {
    Ok(vec![DynSolValue::Uint(value, 256)])
}

pub struct SimulatedChain {
    owner: Address,
    abis: HashMap<Kind, JsonAbi>,
    state: Mutex<State>,
}

impl SimulatedChain {
    /// `owner` deploys everything and passes every `onlyOwner` check.
    pub fn new(owner: Address) -> Self {
        let mut abis: HashMap<Kind, JsonAbi> = ARTIFACTS
            .iter()
            .map(|(name, sigs)| (kind_of(name), JsonAbi::parse(sigs.iter().copied()).unwrap()))
            .collect();
        abis.insert(Kind::Token, JsonAbi::parse(ERC20_ABI.iter().copied()).unwrap());
        abis.insert(Kind::Router, JsonAbi::parse(UNISWAP_V2_ROUTER_ABI.iter().copied()).unwrap());

        let mut state = State::default();
        state.kinds.insert(WBTC, Kind::Token);
        state.kinds.insert(UNISWAP_V2_ROUTER, Kind::Router);

        Self {
            owner,
            abis,
            state: Mutex::new(state),
        }
    }

    /// `"Kind.method"` for every successful state-changing call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn wbtc_balance(&self, who: Address) -> U256 {
        self.state.lock().unwrap().balance(who)
    }

    pub fn implementation(&self, proxy: Address) -> Option<Address> {
        self.state.lock().unwrap().implementations.get(&proxy).copied()
    }

    pub fn elapsed(&self) -> u64 {
        self.state.lock().unwrap().elapsed
    }

    pub fn harvests(&self) -> u64 {
        self.state.lock().unwrap().harvests
    }

    fn receipt(state: &mut State, contract_address: Option<Address>, context: &str) -> TxHandle {
        state.nonce += 1;
        let tx_hash = TxHash::left_padding_from(&state.nonce.to_be_bytes());
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(state.nonce),
                gas_used: 50_000,
                contract_address,
            },
        );
        TxHandle {
            tx_hash,
            context: context.to_string(),
        }
    }

    fn reverted(context: &str, message: String) -> DeployError {
        DeployError::RemoteCall {
            context: context.to_string(),
            reason: Some(RevertReason::from_reason(&message)),
            message: format!("execution reverted: {message}"),
        }
    }

    fn execute(
        &self,
        st: &mut State,
        from: Address,
        to: Address,
        data: &[u8],
        value: U256,
    ) -> Result<Vec<DynSolValue>, String> {
        let kind = *st.kinds.get(&to).ok_or_else(|| format!("no contract at {to}"))?;
        let selector = data.get(..4).ok_or("calldata shorter than a selector")?;
        let function = self.abis[&kind]
            .functions()
            .find(|f| f.selector().as_slice() == selector)
            .ok_or_else(|| format!("{kind:?} has no function with selector {selector:?}"))?;
        let args = function
            .abi_decode_input(&data[4..])
            .map_err(|e| format!("bad calldata for {kind:?}.{}: {e}", function.name))?;

        let owner = self.owner;
        let only_owner = || {
            if from == owner {
                Ok(())
            } else {
                Err(NOT_OWNER.to_string())
            }
        };

        let out = match (kind, function.name.as_str()) {
            (Kind::Token, "balanceOf") => ret(st.balance(addr(&args[0]))),
            (Kind::Token, "allowance") => {
                let key = (addr(&args[0]), addr(&args[1]));
                ret(st.allowances.get(&key).copied().unwrap_or_default())
            }
            (Kind::Token, "approve") => {
                st.allowances.insert((from, addr(&args[0])), uint(&args[1]));
                Ok(vec![DynSolValue::Bool(true)])
            }
            (Kind::Router, "swapExactETHForTokens") => {
                let bought = value / U256::from(100_000_000_000u64);
                st.credit(addr(&args[2]), bought);
                Ok(vec![DynSolValue::Array(vec![
                    DynSolValue::Uint(value, 256),
                    DynSolValue::Uint(bought, 256),
                ])])
            }
            (Kind::Router, "swapExactETHForTokensSupportingFeeOnTransferTokens") => {
                st.credit(addr(&args[2]), value / U256::from(100_000_000_000u64));
                Ok(vec![])
            }

            (Kind::ProxyAdmin, "upgrade") => {
                only_owner()?;
                st.implementations.insert(addr(&args[0]), addr(&args[1]));
                Ok(vec![])
            }

            (Kind::DepositApprover, "setVault") => {
                only_owner()?;
                st.approver_vault = Some(addr(&args[0]));
                Ok(vec![])
            }
            (Kind::DepositApprover, "deposit") => {
                let amount = uint(&args[0]);
                if st.approver_vault.is_none() {
                    return Err("VAULT_NOT_SET".into());
                }
                st.pull(from, to, amount)?;
                *st.shares.entry(from).or_default() += amount * State::share_scale();
                st.total_assets += amount;
                st.collateral += amount;
                st.rebalance();
                Ok(vec![])
            }

            (Kind::Vault, "initialize") | (Kind::Controller, "initialize") => Ok(vec![]),
            (Kind::Vault, "setDepositApprover") => {
                only_owner()?;
                st.vault_links.insert("depositApprover");
                Ok(vec![])
            }
            (Kind::Vault, "setController") => {
                only_owner()?;
                st.vault_links.insert("controller");
                Ok(vec![])
            }
            (Kind::Vault, "setSubStrategy") => {
                only_owner()?;
                st.vault_links.insert("subStrategy");
                Ok(vec![])
            }
            (Kind::Vault, "totalAssets") => ret(st.total_assets),
            (Kind::Vault, "balanceOf") => {
                ret(st.shares.get(&addr(&args[0])).copied().unwrap_or_default())
            }
            (Kind::Vault, "withdraw") => {
                let assets = uint(&args[0]);
                if assets > st.total_assets {
                    return Err("EXCEED_TOTAL_DEPOSIT".into());
                }
                let burn = assets * State::share_scale();
                let held = st.shares.get(&from).copied().unwrap_or_default();
                if held < burn {
                    return Err("ERC20: burn amount exceeds balance".into());
                }
                st.shares.insert(from, held - burn);
                st.total_assets -= assets;
                let released = assets.min(st.collateral);
                st.collateral -= released;
                st.rebalance();
                st.credit(addr(&args[1]), assets);
                ret(burn)
            }

            (Kind::Controller, "registerSubStrategy") => {
                only_owner()?;
                let strategy = addr(&args[0]);
                if st.strategies.contains(&strategy) {
                    return Err("ALREADY_REGISTERED".into());
                }
                st.strategies.push(strategy);
                st.total_alloc += uint(&args[1]);
                Ok(vec![])
            }
            (Kind::Controller, "totalAllocPoint") => ret(st.total_alloc),
            (Kind::Controller, "subStrategyLength") => ret(U256::from(st.strategies.len())),

            (Kind::Strategy, "initialize") => {
                st.mlr = uint(&args[3]);
                st.ltv_bps = st.mlr - U256::from(500);
                Ok(vec![])
            }
            (Kind::Strategy, "setDepositSlippage" | "setWithdrawSlippage" | "setSwapInfo") => {
                only_owner()?;
                Ok(vec![])
            }
            (Kind::Strategy, "setMLR") => {
                only_owner()?;
                st.mlr = uint(&args[0]);
                Ok(vec![])
            }
            (Kind::Strategy, "raiseLTV") => {
                only_owner()?;
                let target = st.mlr - U256::from(100);
                if target > st.ltv_bps {
                    st.ltv_bps = target;
                }
                st.rebalance();
                Ok(vec![])
            }
            (Kind::Strategy, "reduceLTV") => {
                only_owner()?;
                st.ltv_bps = st.ltv_bps.min(st.mlr - U256::from(100));
                st.rebalance();
                Ok(vec![])
            }
            (Kind::Strategy, "getDebt") => ret(st.debt),
            (Kind::Strategy, "getCollateral") => ret(st.collateral),
            (Kind::Strategy, "totalAssets") => ret(st.collateral),
            (Kind::Strategy, "harvest") => {
                only_owner()?;
                st.harvests += 1;
                Ok(vec![])
            }
            (Kind::Strategy, "ownerDeposit") => {
                only_owner()?;
                let amount = uint(&args[0]);
                st.pull(from, to, amount)?;
                st.collateral += amount;
                st.rebalance();
                Ok(vec![])
            }
            (Kind::Strategy, "emergencyWithdraw") => {
                only_owner()?;
                let collateral = st.collateral;
                st.credit(owner, collateral);
                st.collateral = U256::ZERO;
                st.rebalance();
                Ok(vec![])
            }

            (kind, name) => Err(format!("{kind:?}.{name} is not simulated")),
        }?;

        if !matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            st.calls.push(format!("{kind:?}.{}", function.name));
        }
        Ok(out)
    }
}

#[async_trait]
impl ChainRpc for SimulatedChain {
    async fn deploy(
        &self,
        from: Address,
        init_code: Bytes,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let mut st = self.state.lock().unwrap();
        let (name, _) = ARTIFACTS
            .iter()
            .find(|(name, _)| init_code.starts_with(&bytecode_for(name)))
            .ok_or_else(|| Self::reverted(context, "unknown creation code".into()))?;
        let kind = kind_of(name);

        st.created += 1;
        let address = Address::left_padding_from(&(0x1000 + st.created).to_be_bytes());

        if kind == Kind::Proxy {
            let constructor = self.abis[&Kind::Proxy].constructor.as_ref().unwrap();
            let args = constructor
                .abi_decode_input(&init_code[bytecode_for(name).len()..])
                .map_err(|e| Self::reverted(context, e.to_string()))?;
            let logic = addr(&args[0]);
            let logic_kind = *st
                .kinds
                .get(&logic)
                .ok_or_else(|| Self::reverted(context, "logic not deployed".into()))?;
            st.kinds.insert(address, logic_kind);
            st.implementations.insert(address, logic);

            let data = args[2].as_bytes().unwrap_or_default().to_vec();
            if !data.is_empty() {
                self.execute(&mut st, from, address, &data, U256::ZERO)
                    .map_err(|m| Self::reverted(context, m))?;
            }
        } else {
            st.kinds.insert(address, kind);
        }

        Ok(Self::receipt(&mut st, Some(address), context))
    }

    async fn send(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
        context: &str,
    ) -> Result<TxHandle, DeployError> {
        let mut st = self.state.lock().unwrap();
        self.execute(&mut st, from, to, &calldata, value)
            .map_err(|m| Self::reverted(context, m))?;
        Ok(Self::receipt(&mut st, None, context))
    }

    async fn call(&self, from: Address, to: Address, calldata: Bytes) -> Result<Bytes, DeployError> {
        let mut st = self.state.lock().unwrap();
        let out = self
            .execute(&mut st, from, to, &calldata, U256::ZERO)
            .map_err(|m| Self::reverted("eth_call", m))?;
        Ok(Bytes::from(DynSolValue::Tuple(out).abi_encode_params()))
    }

    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt, DeployError> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&tx.tx_hash)
            .cloned()
            .ok_or_else(|| Self::reverted(&tx.context, "unknown transaction".into()))
    }

    async fn increase_time(&self, seconds: u64) -> Result<(), DeployError> {
        self.state.lock().unwrap().elapsed += seconds;
        Ok(())
    }
}
