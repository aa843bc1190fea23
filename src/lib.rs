#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Gantry
//!
//! Converge an API gateway's admin state to a declarative description.
//!
//! The binary wires the workspace crates together: configuration layering,
//! the command line and the `apply`, `plan` and `dump` handlers.

pub mod cli;
pub mod commands;
pub mod config;

pub use gantry_admin;
pub use gantry_core;
pub use gantry_events;
pub use gantry_reconciler;
