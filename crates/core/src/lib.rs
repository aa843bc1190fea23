//! Core vocabulary shared by the Gantry crates.
//!
//! - **Entity kinds** and **operations**, combined into [`ActionKind`] tags
//! - **Actions**: descriptors of one mutating admin request
//! - **Endpoints**: named admin routes plus their parameters
//! - **Errors**: configuration failures common to every crate

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod action;
pub mod error;
pub mod types;

pub use action::{params, Action, Endpoint, EndpointName, PluginParent};
pub use error::{Error, Result};
pub use types::{
    credential_identity_field, ActionKind, Attributes, EntityKind, Method, Operation, PluginScope,
};
