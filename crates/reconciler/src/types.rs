//! Run reports.

use gantry_core::Action;
use serde::Serialize;

use crate::pending::{NoopAction, Resolved};

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Executed actions and recorded noops, in the order they were decided.
    pub outcomes: Vec<Resolved>,
    /// Present entities that already matched.
    pub unchanged: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Resolved::Action(action) => Some(action),
            Resolved::Noop(_) => None,
        })
    }

    pub fn noops(&self) -> impl Iterator<Item = &NoopAction> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Resolved::Noop(noop) => Some(noop),
            Resolved::Action(_) => None,
        })
    }

    /// True when the run had nothing to change.
    pub fn converged(&self) -> bool {
        self.actions().next().is_none()
    }
}
