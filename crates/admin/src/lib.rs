#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # gantry-admin
//!
//! Client for the gateway admin API.
//!
//! ## Features
//!
//! - Resolve named endpoints to URLs with [`Router`]
//! - Execute reconciler actions over HTTP ([`AdminClient`] implements
//!   [`Transport`](gantry_reconciler::Transport))
//! - List the current configuration, following pagination, into a
//!   [`StateSnapshot`](gantry_events::StateSnapshot)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use gantry_admin::{AdminClient, AdminConfig};
//! use gantry_reconciler::{DesiredState, Reconciler};
//!
//! let client = Arc::new(AdminClient::with_config(AdminConfig::new(url))?);
//! let desired = DesiredState::from_yaml_str(&source)?;
//! let initial = client.fetch_state(&desired.credential_plugins()).await?;
//! let mut reconciler = Reconciler::new(client, initial);
//! let report = reconciler.reconcile(&desired).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod router;

// Re-export commonly used items
pub use client::{expand_dotted, AdminClient};
pub use config::{AdminConfig, DEFAULT_ADMIN_URL};
pub use error::{Error, Result};
pub use router::Router;
