//! Deploy the vault system, wire it, register the strategy, apply its
//! configuration and write the address snapshot.

use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::configure::ConfigApplier;
use vault_runtime::orchestrator::Orchestrator;
use vault_runtime::plan;
use vault_runtime::registry::Registry;
use vault_scripts::{Session, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let config = &session.config;
    let deployer = session.deployer();
    info!(%deployer, rpc_url = %config.network.rpc_url, "Deploying contracts");

    let orchestrator = Orchestrator::new(&session.rpc, &session.artifacts, deployer);
    let mut registry = Registry::new();
    orchestrator
        .run(&plan::deployment_plan(config), &mut registry)
        .await
        .context("deploying and wiring")?;
    orchestrator
        .wire(&[plan::strategy_registration(config)], &mut registry)
        .await
        .context("registering strategy")?;

    ConfigApplier::new(&session.rpc, &session.artifacts, deployer)
        .apply_all(&registry, &plan::configuration(config))
        .await
        .context("configuring strategy")?;

    let snapshot = registry.snapshot();
    for (label, address) in snapshot.iter() {
        info!(%address, "{label}");
    }
    session.save_addresses(&snapshot)?;
    info!(contracts = registry.len(), "Deployment complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Deployment failed: {e:#}");
        std::process::exit(1);
    }
}
