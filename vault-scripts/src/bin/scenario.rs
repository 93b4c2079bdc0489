//! Deploy a fresh, unregistered system and run the vault lifecycle scenario
//! against it. Needs the scenario user's key alongside the deployer's.

use anyhow::{Context, Result, bail};
use tracing::{error, info};
use vault_runtime::configure::ConfigApplier;
use vault_runtime::orchestrator::Orchestrator;
use vault_runtime::plan;
use vault_runtime::registry::Registry;
use vault_runtime::scenario::ScenarioRunner;
use vault_scripts::{Session, setup_log};

async fn run() -> Result<()> {
    let session = Session::open().await?;
    let config = &session.config;
    let client = session.rpc.client();
    if client.identity(&config.scenario.user).is_none() {
        bail!(
            "no key for scenario user '{}'; set {}_PRIVATE_KEY",
            config.scenario.user,
            config.scenario.user.to_uppercase()
        );
    }
    let deployer = session.deployer();

    let mut registry = Registry::new();
    Orchestrator::new(&session.rpc, &session.artifacts, deployer)
        .run(&plan::deployment_plan(config), &mut registry)
        .await
        .context("deploying scenario system")?;
    ConfigApplier::new(&session.rpc, &session.artifacts, deployer)
        .apply_all(&registry, &plan::configuration(config))
        .await
        .context("configuring scenario system")?;

    let world = plan::scenario_world(config, registry, client.identities().to_vec());
    let steps = plan::vault_lifecycle_scenario(config)?;
    let report = ScenarioRunner::new(&session.rpc, &session.artifacts)
        .run(&world, &steps)
        .await
        .context("running vault lifecycle scenario")?;

    for step in &report.steps {
        for reading in &step.readings {
            info!(
                step = step.index,
                label = %step.label,
                probe = %reading.probe,
                before = ?reading.before,
                after = %reading.after,
                "Reading"
            );
        }
    }
    info!(steps = report.len(), "Scenario complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_log();
    if let Err(e) = run().await {
        error!("Scenario failed: {e:#}");
        std::process::exit(1);
    }
}
