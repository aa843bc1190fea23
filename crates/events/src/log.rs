//! The append-only log of executed actions.

use gantry_core::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Lifecycle phase of a log entry. Only responses change projected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The request is about to be sent.
    Request,
    /// The request succeeded and `content` holds the parsed response body.
    Response,
}

/// One request or response recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub phase: Phase,
    pub action: Action,
    #[serde(default)]
    pub content: Value,
}

impl LogEntry {
    /// Record an outgoing request.
    pub const fn request(action: Action) -> Self {
        Self {
            phase: Phase::Request,
            action,
            content: Value::Null,
        }
    }

    /// Record a successful response.
    pub const fn response(action: Action, content: Value) -> Self {
        Self {
            phase: Phase::Response,
            action,
            content,
        }
    }

    pub const fn is_response(&self) -> bool {
        matches!(self.phase, Phase::Response)
    }
}

/// Append-only sequence of log entries in execution order.
///
/// Entries are never edited, reordered or removed; the only mutation is
/// [`ActionLog::append`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its position.
    pub fn append(&mut self, entry: LogEntry) -> usize {
        let position = self.entries.len();
        tracing::trace!(
            phase = ?entry.phase,
            kind = %entry.action.kind,
            position,
            "Appending log entry"
        );
        self.entries.push(entry);
        position
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended at or after `position`.
    pub fn since(&self, position: usize) -> &[LogEntry] {
        self.entries.get(position..).unwrap_or_default()
    }

    pub fn responses(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|entry| entry.is_response())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One JSON document per line, in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry fails to serialize.
    pub fn to_jsonl(&self) -> Result<String> {
        self.entries
            .iter()
            .map(|entry| {
                serde_json::to_string(entry).map_err(|e| Error::serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()
            .map(|lines| lines.join("\n"))
    }
}

impl FromIterator<LogEntry> for ActionLog {
    fn from_iter<I: IntoIterator<Item = LogEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
