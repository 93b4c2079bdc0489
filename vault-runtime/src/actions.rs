//! Typed one-off vault operations used by the follow-up scripts.
//!
//! Each helper encodes calldata with the `sol!` bindings from
//! [`crate::contracts`], submits it through [`ChainRpc`] and waits for
//! finality.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use tracing::info;

use crate::contracts::{IDepositApprover, IEFVault, IERC20, IUniswapV2Router};
use crate::error::DeployError;
use crate::rpc::{ChainRpc, TxReceipt};

async fn submit<R: ChainRpc + ?Sized>(
    rpc: &R,
    from: Address,
    to: Address,
    calldata: Vec<u8>,
    value: U256,
    context: &str,
) -> Result<TxReceipt, DeployError> {
    let tx = rpc.send(from, to, Bytes::from(calldata), value, context).await?;
    rpc.wait_for_finality(&tx).await
}

async fn read<R: ChainRpc + ?Sized, C: SolCall<Return = U256>>(
    rpc: &R,
    from: Address,
    to: Address,
    call: C,
    context: &str,
) -> Result<U256, DeployError> {
    let output = rpc.call(from, to, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&output)
        .map_err(|e| DeployError::AbiError(format!("{context} output: {e}")))
}

pub async fn token_balance<R: ChainRpc + ?Sized>(
    rpc: &R,
    token: Address,
    owner: Address,
) -> Result<U256, DeployError> {
    read(rpc, owner, token, IERC20::balanceOfCall { account: owner }, "balanceOf").await
}

pub async fn vault_shares<R: ChainRpc + ?Sized>(
    rpc: &R,
    vault: Address,
    owner: Address,
) -> Result<U256, DeployError> {
    read(rpc, owner, vault, IEFVault::balanceOfCall { account: owner }, "EFVault.balanceOf").await
}

pub async fn vault_total_assets<R: ChainRpc + ?Sized>(
    rpc: &R,
    from: Address,
    vault: Address,
) -> Result<U256, DeployError> {
    read(rpc, from, vault, IEFVault::totalAssetsCall {}, "EFVault.totalAssets").await
}

/// Approve the deposit approver for `amount` of `token`, then deposit it.
pub async fn deposit<R: ChainRpc + ?Sized>(
    rpc: &R,
    from: Address,
    token: Address,
    approver: Address,
    amount: U256,
) -> Result<TxReceipt, DeployError> {
    let approve = IERC20::approveCall {
        spender: approver,
        amount,
    };
    submit(rpc, from, token, approve.abi_encode(), U256::ZERO, "approve").await?;

    let call = IDepositApprover::depositCall { _amount: amount };
    let receipt = submit(
        rpc,
        from,
        approver,
        call.abi_encode(),
        U256::ZERO,
        "DepositApprover.deposit",
    )
    .await?;
    info!(%from, %amount, tx_hash = %receipt.tx_hash, "Deposited");
    Ok(receipt)
}

/// Withdraw `assets` from the vault to `receiver`.
pub async fn withdraw<R: ChainRpc + ?Sized>(
    rpc: &R,
    from: Address,
    vault: Address,
    assets: U256,
    receiver: Address,
) -> Result<TxReceipt, DeployError> {
    let call = IEFVault::withdrawCall { assets, receiver };
    let receipt = submit(rpc, from, vault, call.abi_encode(), U256::ZERO, "EFVault.withdraw").await?;
    info!(%from, %assets, tx_hash = %receipt.tx_hash, "Withdrew");
    Ok(receipt)
}

/// Buy `path.last()` with `value` of native ether through a Uniswap V2 router.
pub async fn swap_exact_eth<R: ChainRpc + ?Sized>(
    rpc: &R,
    from: Address,
    router: Address,
    path: Vec<Address>,
    value: U256,
    deadline: U256,
) -> Result<TxReceipt, DeployError> {
    let call = IUniswapV2Router::swapExactETHForTokensCall {
        amountOutMin: U256::ZERO,
        path,
        to: from,
        deadline,
    };
    let receipt = submit(
        rpc,
        from,
        router,
        call.abi_encode(),
        value,
        "UniswapV2Router.swapExactETHForTokens",
    )
    .await?;
    info!(%from, %value, tx_hash = %receipt.tx_hash, "Swapped");
    Ok(receipt)
}
