//! CLI command handlers.
//!
//! Each handler returns the text to print so the dispatcher owns stdout.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gantry_admin::AdminClient;
use gantry_events::StateSnapshot;
use gantry_reconciler::{DesiredState, Reconciler, RunReport};
use tracing::{info, warn};

use crate::cli::Commands;
use crate::config::GantryConfig;

/// Execute a CLI command against the configured gateway.
///
/// # Errors
///
/// Returns an error if the gateway cannot be reached or reconciliation stops.
pub async fn execute_command(command: &Commands, config: &GantryConfig) -> Result<String> {
    let client = AdminClient::with_config(config.admin()?)
        .context("Failed to build the admin client")?;

    match command {
        Commands::Apply { file } => cmd_apply(client, config, file).await,
        Commands::Plan { file } => cmd_plan(&client, config, file).await,
        Commands::Dump => cmd_dump(&client, config).await,
    }
}

async fn cmd_apply(client: AdminClient, config: &GantryConfig, file: &Path) -> Result<String> {
    let desired = load_desired(file)?;
    let initial = fetch(&client, config, &desired).await?;

    let mut reconciler = Reconciler::new(Arc::new(client), initial);
    match reconciler.reconcile(&desired).await {
        Ok(report) => Ok(summary(&report)),
        Err(e) => {
            warn!(error = %e, "Reconciliation stopped");
            Err(e).with_context(|| {
                format!("Reconciliation stopped, {}", summary(reconciler.report()))
            })
        }
    }
}

async fn cmd_plan(client: &AdminClient, config: &GantryConfig, file: &Path) -> Result<String> {
    let desired = load_desired(file)?;
    let initial = fetch(client, config, &desired).await?;

    let mut reconciler = Reconciler::planning(initial);
    let report = reconciler.reconcile(&desired).await?;
    plan_lines(&report)
}

async fn cmd_dump(client: &AdminClient, config: &GantryConfig) -> Result<String> {
    let state = client
        .fetch_state(&config.credential_plugins)
        .await
        .context("Failed to fetch gateway state")?;
    serde_yaml::to_string(&state).context("Failed to render state as YAML")
}

/// Fetch the live state, listing every credential plugin the config or the
/// document mentions.
async fn fetch(
    client: &AdminClient,
    config: &GantryConfig,
    desired: &DesiredState,
) -> Result<StateSnapshot> {
    let plugins: Vec<String> = config
        .credential_plugins
        .iter()
        .cloned()
        .chain(desired.credential_plugins())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    client
        .fetch_state(&plugins)
        .await
        .context("Failed to fetch gateway state")
}

/// Read a desired-state document, JSON for `.json` files and YAML otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_desired(path: &Path) -> Result<DesiredState> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let desired = if is_json {
        DesiredState::from_json_str(&source)
    } else {
        DesiredState::from_yaml_str(&source)
    }
    .with_context(|| format!("Invalid desired state in {}", path.display()))?;

    info!(path = %path.display(), entities = desired.len(), "Loaded desired state");
    Ok(desired)
}

/// One-line account of a run.
pub fn summary(report: &RunReport) -> String {
    if report.converged() && report.noops().next().is_none() {
        return format!("Already converged, {} entities unchanged", report.unchanged);
    }
    format!(
        "{} actions applied, {} noops, {} unchanged",
        report.actions().count(),
        report.noops().count(),
        report.unchanged
    )
}

/// Planned actions and noops, one JSON document per line.
///
/// # Errors
///
/// Returns an error if an outcome fails to serialize.
pub fn plan_lines(report: &RunReport) -> Result<String> {
    let lines = report
        .outcomes
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to render plan")?;
    Ok(lines.join("\n"))
}
