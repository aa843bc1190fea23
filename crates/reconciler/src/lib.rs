//! Declarative reconciliation of gateway configuration.
//!
//! This crate converges a gateway towards a desired-state document:
//!
//! - **Desired State**: services, APIs, consumers and global plugins keyed by
//!   natural identity, with nested routes, plugins, credentials and ACLs
//! - **Current State**: a snapshot projected from the initial listing and the
//!   log of executed actions, queried through [`StateView`]
//! - **Differs**: desired specs to [`PendingChange`]s, validated up front
//! - **Executor**: resolves each pending change against the current view,
//!   executes it through a [`Transport`] and folds the response back in
//!
//! # Reconciliation
//!
//! A run:
//! 1. Diffs the whole document (services, APIs, consumers, global plugins)
//! 2. Resolves one pending change at a time against the current snapshot
//! 3. Executes the resulting action, logs request and response
//! 4. Projects the response into the snapshot before the next change
//!
//! Present entities that already match produce nothing. Removed entities
//! that are already gone produce a [`NoopAction`].
//!
//! # Example
//!
//! ```ignore
//! use gantry_events::StateSnapshot;
//! use gantry_reconciler::{DesiredState, Reconciler};
//!
//! let desired = DesiredState::from_yaml_str("services: [{name: svc}]")?;
//! let mut reconciler = Reconciler::planning(StateSnapshot::new());
//! let report = reconciler.reconcile(&desired).await?;
//! for outcome in &report.outcomes {
//!     println!("{}", serde_json::to_string(outcome)?);
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod desired;
pub mod diff;
pub mod error;
pub mod executor;
pub mod pending;
pub mod scope;
pub mod types;
pub mod view;

#[cfg(test)]
mod test_support;

pub use desired::{Collection, DesiredEntitySpec, DesiredState, Ensure};
pub use error::{Error, Result};
pub use executor::{PlanningTransport, Reconciler, Transport};
pub use pending::{NoopAction, PendingChange, Resolved};
pub use scope::{PluginOwner, RouteKey, Scope};
pub use types::RunReport;
pub use view::{lookup_attribute, matches_declared, record_at, StateView};
