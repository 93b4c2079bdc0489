//! Deposit WBTC into the vault through the deposit approver.

use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::actions;
use vault_runtime::plan::{DEPOSIT_APPROVER, VAULT};
use vault_runtime::units::{SHARE_DECIMALS, WBTC_DECIMALS, format_amount, parse_amount};
use vault_scripts::{Session, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let addresses = session.load_addresses()?;
    let approver = addresses.address(DEPOSIT_APPROVER)?;
    let vault = addresses.address(VAULT)?;
    let wbtc = session.config.tokens.wbtc;
    let from = session.deployer();
    let amount = parse_amount(&session.config.scripts.deposit_wbtc, WBTC_DECIMALS)?;

    let balance = actions::token_balance(&session.rpc, wbtc, from).await?;
    info!(%from, wbtc = %format_amount(balance, WBTC_DECIMALS), "WBTC balance");

    actions::deposit(&session.rpc, from, wbtc, approver, amount)
        .await
        .context("depositing WBTC")?;

    let shares = actions::vault_shares(&session.rpc, vault, from).await?;
    info!(
        deposited = %format_amount(amount, WBTC_DECIMALS),
        shares = %format_amount(shares, SHARE_DECIMALS),
        "Deposit complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Deposit failed: {e:#}");
        std::process::exit(1);
    }
}
