//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gantry - declarative gateway configuration
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(version)]
#[command(about = "Converge an API gateway's admin state to a declarative description")]
#[command(
    long_about = "Gantry reads a YAML or JSON description of services, routes, APIs, consumers and plugins, compares it with the gateway's current configuration and issues only the admin requests needed to make them match."
)]
pub struct Cli {
    /// Config file (TOML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Admin API root, overrides config and environment
    #[arg(long, global = true)]
    pub admin_url: Option<String>,

    /// Log filter, e.g. `debug` or `gantry_reconciler=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the gateway against a desired-state document
    Apply {
        /// Desired-state document (YAML or JSON)
        file: PathBuf,
    },

    /// Show the changes `apply` would make without sending them
    Plan {
        /// Desired-state document (YAML or JSON)
        file: PathBuf,
    },

    /// Print the gateway's current configuration as YAML
    Dump,
}
