//! Log-replay projection of gateway state.

use gantry_core::{EntityKind, PluginScope};

use crate::error::Result;
use crate::log::LogEntry;
use crate::reducers::{apis, consumers, plugins, services};
use crate::snapshot::StateSnapshot;

/// Trait for projections (state derived by folding log entries).
pub trait Projection {
    /// The state type this projection produces.
    type State: Clone;

    /// Get the initial state.
    fn initial_state(&self) -> Self::State;

    /// Derive the state that follows `state` once `entry` is applied.
    fn apply(&self, state: &Self::State, entry: &LogEntry) -> Result<Self::State>;

    /// Rebuild the state from the beginning of a log.
    fn rebuild(&self, entries: &[LogEntry]) -> Result<Self::State> {
        self.rebuild_from(self.initial_state(), entries)
    }

    /// Fold `entries` on top of an existing state.
    fn rebuild_from(&self, state: Self::State, entries: &[LogEntry]) -> Result<Self::State> {
        entries
            .iter()
            .try_fold(state, |state, entry| self.apply(&state, entry))
    }
}

/// Projects a [`StateSnapshot`] from executed requests and their responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector;

impl Projector {
    pub const fn new() -> Self {
        Self
    }
}

impl Projection for Projector {
    type State = StateSnapshot;

    fn initial_state(&self) -> Self::State {
        StateSnapshot::new()
    }

    fn apply(&self, state: &Self::State, entry: &LogEntry) -> Result<Self::State> {
        if !entry.is_response() {
            return Ok(state.clone());
        }

        let next = match entry.action.kind.entity {
            EntityKind::Service
            | EntityKind::Route
            | EntityKind::Plugin(PluginScope::Service | PluginScope::Route) => StateSnapshot {
                services: services::reduce(&state.services, entry)?,
                ..state.clone()
            },
            EntityKind::Api | EntityKind::Plugin(PluginScope::Api) => StateSnapshot {
                apis: apis::reduce(&state.apis, entry)?,
                ..state.clone()
            },
            EntityKind::Consumer
            | EntityKind::Credential
            | EntityKind::Acl
            | EntityKind::Plugin(PluginScope::Consumer) => StateSnapshot {
                consumers: consumers::reduce(&state.consumers, entry)?,
                ..state.clone()
            },
            EntityKind::Plugin(PluginScope::Global) => StateSnapshot {
                plugins: plugins::reduce(&state.plugins, entry)?,
                ..state.clone()
            },
        };
        Ok(next)
    }
}

/// Project a snapshot from a whole log.
///
/// # Errors
///
/// Returns an error if a response in the log cannot be parsed.
pub fn project(entries: &[LogEntry]) -> Result<StateSnapshot> {
    Projector.rebuild(entries)
}

/// Project a snapshot by folding `entries` onto `initial`.
///
/// # Errors
///
/// Returns an error if a response in the log cannot be parsed.
pub fn project_from(initial: &StateSnapshot, entries: &[LogEntry]) -> Result<StateSnapshot> {
    Projector.rebuild_from(initial.clone(), entries)
}
