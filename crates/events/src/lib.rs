//! Action log and log-replay projection of gateway state.
//!
//! This crate reconstructs "current state" without mirroring the gateway:
//!
//! - **Log**: append-only record of executed requests and their responses
//! - **Parsers**: admin API response bodies to entity records
//! - **Projector**: a pure fold of response entries onto a snapshot
//! - **Snapshot**: persistent collections of services, APIs, consumers and
//!   global plugins with their nested children
//!
//! # Example
//!
//! ```ignore
//! use gantry_core::{Action, Attributes};
//! use gantry_events::{project, LogEntry};
//! use serde_json::json;
//!
//! let entries = vec![LogEntry::response(
//!     Action::create_service("svc", &Attributes::new()),
//!     json!({"id": "abcd-1234", "name": "svc"}),
//! )];
//! let state = project(&entries)?;
//! assert!(state.service("svc").is_some());
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod log;
pub mod parse;
pub mod projection;
mod reducers;
pub mod snapshot;

// Re-export main types
pub use error::{Error, Result};
pub use log::{ActionLog, LogEntry, Phase};
pub use parse::{key_field, parse_credential, parse_entity};
pub use projection::{project, project_from, Projection, Projector};
pub use snapshot::{
    find_plugin, ApiState, ConsumerState, CredentialRecord, EntityInfo, EntityRecord, Identified,
    RouteState, ServiceState, StateSnapshot,
};
