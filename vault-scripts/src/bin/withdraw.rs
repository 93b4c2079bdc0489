//! Withdraw WBTC from the vault back to the caller.

use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::actions;
use vault_runtime::plan::VAULT;
use vault_runtime::units::{SHARE_DECIMALS, WBTC_DECIMALS, format_amount, parse_amount};
use vault_scripts::{Session, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let vault = session.load_addresses()?.address(VAULT)?;
    let wbtc = session.config.tokens.wbtc;
    let from = session.deployer();
    let amount = parse_amount(&session.config.scripts.withdraw_wbtc, WBTC_DECIMALS)?;

    let before = actions::vault_shares(&session.rpc, vault, from).await?;
    info!(%from, shares = %format_amount(before, SHARE_DECIMALS), "Vault shares");

    actions::withdraw(&session.rpc, from, vault, amount, from)
        .await
        .context("withdrawing from vault")?;

    let after = actions::vault_shares(&session.rpc, vault, from).await?;
    let balance = actions::token_balance(&session.rpc, wbtc, from).await?;
    info!(
        withdrawn = %format_amount(amount, WBTC_DECIMALS),
        shares = %format_amount(after, SHARE_DECIMALS),
        wbtc = %format_amount(balance, WBTC_DECIMALS),
        "Withdraw complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Withdraw failed: {e:#}");
        std::process::exit(1);
    }
}
