//! Point a deployed proxy at a fresh implementation.
//!
//! `UPGRADE_TARGET` names the proxy in the address snapshot (default
//! `WBTCBorrowETH`); `UPGRADE_ARTIFACT` names the new implementation's
//! artifact (default: the target name).

use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::orchestrator::Orchestrator;
use vault_runtime::plan::STRATEGY;
use vault_scripts::{Session, env_var, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let target = env_var("UPGRADE_TARGET").unwrap_or_else(|| STRATEGY.to_string());
    let artifact = env_var("UPGRADE_ARTIFACT").unwrap_or_else(|| target.clone());

    let mut snapshot = session.load_addresses()?;
    let implementation = Orchestrator::new(&session.rpc, &session.artifacts, session.deployer())
        .upgrade(&snapshot, &target, &artifact)
        .await
        .with_context(|| format!("upgrading {target}"))?;

    snapshot.push(format!("{target}.implementation"), implementation);
    session.save_addresses(&snapshot)?;
    info!(proxy = %target, artifact = %artifact, %implementation, "Upgrade complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Upgrade failed: {e:#}");
        std::process::exit(1);
    }
}
