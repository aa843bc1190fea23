//! Scripted state view for unit tests.

use std::collections::HashMap;

use gantry_core::Attributes;

use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::view::StateView;

struct Entry {
    id: String,
    up_to_date: bool,
}

/// A view that answers from a fixed script keyed by scope.
#[derive(Default)]
pub struct ScriptedView {
    entries: HashMap<String, Entry>,
}

impl ScriptedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity exists and matches whatever is declared.
    #[must_use]
    pub fn current(self, scope: &Scope, id: &str) -> Self {
        self.with(scope, id, true)
    }

    /// The entity exists but differs from what is declared.
    #[must_use]
    pub fn stale(self, scope: &Scope, id: &str) -> Self {
        self.with(scope, id, false)
    }

    fn with(mut self, scope: &Scope, id: &str, up_to_date: bool) -> Self {
        self.entries.insert(
            key(scope),
            Entry {
                id: id.to_string(),
                up_to_date,
            },
        );
        self
    }
}

fn key(scope: &Scope) -> String {
    format!("{scope:?}")
}

impl StateView for ScriptedView {
    fn exists(&self, scope: &Scope) -> bool {
        self.entries.contains_key(&key(scope))
    }

    fn is_up_to_date(&self, scope: &Scope, _desired: &Attributes) -> bool {
        self.entries
            .get(&key(scope))
            .is_some_and(|entry| entry.up_to_date)
    }

    fn resolve_id(&self, scope: &Scope) -> Result<String> {
        self.entries
            .get(&key(scope))
            .map(|entry| entry.id.clone())
            .ok_or_else(|| Error::state_inconsistency(scope, "not scripted"))
    }
}
