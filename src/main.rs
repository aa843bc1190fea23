//! # Gantry
//!
//! Entry point for the `gantry` command.
//!
//! ## Startup
//!
//! 1. **Parse flags** - global options and the subcommand
//! 2. **Tracing** - `--log-level`, else `RUST_LOG`, else `info`
//! 3. **Configuration** - defaults, `--config`, environment, `--admin-url`
//! 4. **Command** - `apply`, `plan` or `dump` against the admin API
//!
//! Any failure is reported through `anyhow` and exits non-zero.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gantry::cli::Cli;
use gantry::commands::execute_command;
use gantry::config::GantryConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref(), cli.json_logs)?;

    let config = GantryConfig::resolve(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        cli.admin_url.as_deref(),
    )
    .context("Failed to load configuration")?;
    info!(admin_url = %config.admin_url, "Using admin API");

    let output = execute_command(&cli.command, &config).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    debug!("Finished in {:?}", start_time.elapsed());
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(log_level: Option<&str>, json: bool) -> Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
