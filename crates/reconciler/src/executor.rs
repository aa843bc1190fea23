//! Reconciliation executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::{Action, Operation};
use gantry_events::{project_from, ActionLog, LogEntry, StateSnapshot};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::desired::DesiredState;
use crate::diff;
use crate::error::Result;
use crate::pending::Resolved;
use crate::types::RunReport;

/// Executes actions against the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `action` and return the parsed response body (`Null` when the
    /// gateway sent none).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] when the request or the gateway fails.
    async fn execute(&self, action: &Action) -> Result<Value>;
}

/// A transport that never performs I/O: it answers every action with the
/// response the gateway would plausibly send.
///
/// Creations get deterministic ids `planned-1`, `planned-2`, ... so that
/// later changes in the same run can address what was planned.
#[derive(Debug, Default)]
pub struct PlanningTransport {
    created: AtomicUsize,
}

impl PlanningTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn response(&self, action: &Action) -> Value {
        let id = match action.kind.operation {
            Operation::Remove => return Value::Null,
            Operation::Create => {
                let n = self.created.fetch_add(1, Ordering::Relaxed).saturating_add(1);
                format!("planned-{n}")
            }
            Operation::Update => action.target_id().unwrap_or_default().to_string(),
        };
        let mut body = action.body.clone().unwrap_or_default();
        body.insert("id".to_string(), Value::String(id));
        Value::Object(body)
    }
}

#[async_trait]
impl Transport for PlanningTransport {
    async fn execute(&self, action: &Action) -> Result<Value> {
        Ok(self.response(action))
    }
}

/// Drives a desired-state document to convergence, one change at a time.
///
/// The reconciler owns the log of the run and the snapshot projected from
/// it. Each executed action is logged as a request and a response, and the
/// response is folded into the snapshot before the next change is decided.
pub struct Reconciler {
    transport: Arc<dyn Transport>,
    initial: StateSnapshot,
    state: StateSnapshot,
    log: ActionLog,
    report: RunReport,
}

impl Reconciler {
    /// Create a reconciler starting from `initial` live state.
    pub fn new(transport: Arc<dyn Transport>, initial: StateSnapshot) -> Self {
        Self {
            transport,
            state: initial.clone(),
            initial,
            log: ActionLog::new(),
            report: RunReport::new(),
        }
    }

    /// A dry-run reconciler backed by [`PlanningTransport`].
    pub fn planning(initial: StateSnapshot) -> Self {
        Self::new(Arc::new(PlanningTransport::new()), initial)
    }

    /// Current projected state.
    pub const fn state(&self) -> &StateSnapshot {
        &self.state
    }

    /// Every request and response so far, across runs.
    pub const fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Report of the latest run, including a run that failed part way.
    pub const fn report(&self) -> &RunReport {
        &self.report
    }

    /// Re-project the initial state plus the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if a logged response cannot be parsed.
    pub fn replayed_state(&self) -> Result<StateSnapshot> {
        Ok(project_from(&self.initial, self.log.entries())?)
    }

    /// Reconcile `desired` against the current state.
    ///
    /// Validation errors abort before any request. A transport failure stops
    /// the run; actions already executed stay in the log and the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid or a transport call fails.
    /// Executed actions stay in [`Reconciler::report`].
    pub async fn reconcile(&mut self, desired: &DesiredState) -> Result<RunReport> {
        let changes = diff::document(desired)?;
        info!(changes = changes.len(), "Starting reconciliation run");
        self.report = RunReport::new();

        for change in &changes {
            match change.resolve(&self.state)? {
                None => self.report.unchanged = self.report.unchanged.saturating_add(1),
                Some(Resolved::Noop(noop)) => {
                    debug!(kind = %noop.entity.noop_tag(), scope = %change.scope, "Recording noop");
                    self.report.outcomes.push(Resolved::Noop(noop));
                }
                Some(Resolved::Action(action)) => {
                    self.execute(&action).await?;
                    self.report.outcomes.push(Resolved::Action(action));
                }
            }
        }

        info!(
            actions = self.report.actions().count(),
            noops = self.report.noops().count(),
            unchanged = self.report.unchanged,
            "Reconciliation run complete"
        );
        Ok(self.report.clone())
    }

    async fn execute(&mut self, action: &Action) -> Result<()> {
        info!(kind = %action.kind, endpoint = %action.endpoint, "Executing action");
        let position = self.log.append(LogEntry::request(action.clone()));

        let content = self
            .transport
            .execute(action)
            .await
            .inspect_err(|e| warn!(kind = %action.kind, error = %e, "Action failed"))?;

        self.log.append(LogEntry::response(action.clone(), content));
        self.state = project_from(&self.state, self.log.since(position))?;
        Ok(())
    }
}
