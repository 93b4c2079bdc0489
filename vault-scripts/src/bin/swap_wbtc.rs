//! Buy WBTC with ether through the Uniswap V2 router.

use alloy::primitives::U256;
use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::actions;
use vault_runtime::units::{SHARE_DECIMALS, WBTC_DECIMALS, format_amount, parse_amount};
use vault_scripts::{Session, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let config = &session.config;
    let from = session.deployer();
    let wbtc = config.tokens.wbtc;
    let value = parse_amount(&config.scripts.swap_eth, SHARE_DECIMALS)?;

    let before = actions::token_balance(&session.rpc, wbtc, from).await?;
    info!(%from, wbtc = %format_amount(before, WBTC_DECIMALS), "WBTC balance");

    actions::swap_exact_eth(
        &session.rpc,
        from,
        config.protocols.uniswap_v2_router,
        vec![config.tokens.weth, wbtc],
        value,
        U256::from(config.scripts.swap_deadline),
    )
    .await
    .context("swapping ether for WBTC")?;

    let after = actions::token_balance(&session.rpc, wbtc, from).await?;
    info!(
        eth = %format_amount(value, SHARE_DECIMALS),
        wbtc = %format_amount(after, WBTC_DECIMALS),
        "Swap complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Swap failed: {e:#}");
        std::process::exit(1);
    }
}
