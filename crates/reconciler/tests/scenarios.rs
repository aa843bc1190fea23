//! End-to-end reconciliation scenarios over a projected snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gantry_core::{params, Action, Attributes, EntityKind, Operation};
use gantry_events::{EntityRecord, Identified, RouteState, ServiceState, StateSnapshot};
use gantry_reconciler::{
    diff, DesiredEntitySpec, DesiredState, Error, NoopAction, PlanningTransport, Reconciler,
    Resolved, Result, StateView, Transport,
};
use serde_json::{json, Value};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().unwrap_or_default()
}

fn snapshot_with_service(attributes: Value) -> StateSnapshot {
    let mut state = StateSnapshot::new();
    state.services.push_back(ServiceState::new(EntityRecord::new(
        "abcd-1234",
        "svc",
        attrs(attributes),
    )));
    state
}

fn resolve_all(desired: &DesiredState, view: &dyn StateView) -> Result<Vec<Resolved>> {
    let mut outcomes = Vec::new();
    for change in diff::document(desired)? {
        outcomes.extend(change.resolve(view)?);
    }
    Ok(outcomes)
}

fn one_service(spec: DesiredEntitySpec) -> DesiredState {
    DesiredState {
        services: vec![spec],
        ..DesiredState::default()
    }
}

/// Answers like the gateway: ids from a script for creations, the request
/// body echoed back otherwise. Optionally fails the first action of a kind.
struct FakeGateway {
    ids: Mutex<Vec<&'static str>>,
    seen: Mutex<Vec<Action>>,
    fail_once: Option<String>,
    failed: AtomicBool,
    fallback: PlanningTransport,
}

impl FakeGateway {
    fn new(ids: Vec<&'static str>) -> Self {
        Self {
            ids: Mutex::new(ids),
            seen: Mutex::new(Vec::new()),
            fail_once: None,
            failed: AtomicBool::new(false),
            fallback: PlanningTransport::new(),
        }
    }

    fn failing_once(mut self, kind: &str) -> Self {
        self.fail_once = Some(kind.to_string());
        self
    }

    fn seen(&self) -> Vec<Action> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FakeGateway {
    async fn execute(&self, action: &Action) -> Result<Value> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(action.clone());
        }
        if self.fail_once.as_deref() == Some(action.kind.to_string().as_str())
            && !self.failed.swap(true, Ordering::SeqCst)
        {
            return Err(Error::transport(action.clone(), "502 Bad Gateway"));
        }

        let scripted = match action.kind.operation {
            Operation::Create => self.ids.lock().ok().and_then(|mut ids| ids.pop()),
            Operation::Update | Operation::Remove => None,
        };
        match scripted {
            Some(id) => {
                let mut body = action.body.clone().unwrap_or_default();
                body.insert("id".to_string(), json!(id));
                Ok(Value::Object(body))
            }
            None => self.fallback.execute(action).await,
        }
    }
}

#[test]
fn scenario_absent_service_is_created() -> TestResult {
    let desired = one_service(
        DesiredEntitySpec::named("svc")
            .ensure("present")
            .attribute("url", "bar"),
    );

    let outcomes = resolve_all(&desired, &StateSnapshot::new())?;

    assert_eq!(outcomes.len(), 1);
    let Some(Resolved::Action(action)) = outcomes.first() else {
        return Err("expected an action".into());
    };
    assert_eq!(action.kind.to_string(), "create-service");
    assert_eq!(action.body, Some(attrs(json!({"url": "bar", "name": "svc"}))));
    Ok(())
}

#[test]
fn scenario_matching_service_yields_nothing() -> TestResult {
    let desired = one_service(DesiredEntitySpec::named("svc").attribute("url", "bar"));
    let state = snapshot_with_service(json!({"name": "svc", "url": "bar", "retries": 5}));

    assert!(resolve_all(&desired, &state)?.is_empty());
    Ok(())
}

#[test]
fn scenario_present_service_is_removed_by_id() -> TestResult {
    let desired = one_service(DesiredEntitySpec::named("svc").ensure("removed"));
    let state = snapshot_with_service(json!({"name": "svc"}));

    let outcomes = resolve_all(&desired, &state)?;
    let [Resolved::Action(action)] = outcomes.as_slice() else {
        return Err("expected exactly one action".into());
    };
    assert_eq!(action.kind.to_string(), "remove-service");
    assert_eq!(action.endpoint.param(params::SERVICE_ID), Some("abcd-1234"));
    Ok(())
}

#[test]
fn scenario_absent_removed_service_is_noop() -> TestResult {
    let spec = DesiredEntitySpec::named("svc").ensure("removed");
    let outcomes = resolve_all(&one_service(spec.clone()), &StateSnapshot::new())?;

    assert_eq!(
        outcomes,
        vec![Resolved::Noop(NoopAction::new(EntityKind::Service, spec))]
    );
    Ok(())
}

#[tokio::test]
async fn scenario_plugin_addresses_service_created_in_same_run() -> TestResult {
    let desired = one_service(
        DesiredEntitySpec::named("svc")
            .plugin(DesiredEntitySpec::named("cors").attribute("config.foo", "bar")),
    );
    let gateway = Arc::new(FakeGateway::new(vec!["p-1", "abcd-1234"]));
    let mut reconciler = Reconciler::new(gateway.clone(), StateSnapshot::new());

    reconciler.reconcile(&desired).await?;

    let seen = gateway.seen();
    let kinds: Vec<String> = seen.iter().map(|a| a.kind.to_string()).collect();
    assert_eq!(kinds, ["create-service", "add-service-plugin"]);
    let plugin = seen.get(1).ok_or("missing plugin action")?;
    assert_eq!(plugin.endpoint.param(params::SERVICE_ID), Some("abcd-1234"));
    assert_eq!(
        plugin.body,
        Some(attrs(json!({"config.foo": "bar", "name": "cors"})))
    );
    Ok(())
}

#[test]
fn invalid_ensure_is_raised_before_any_change() {
    let desired = DesiredState {
        services: vec![DesiredEntitySpec::named("svc")],
        consumers: vec![DesiredEntitySpec::named("ada").ensure("not-valid")],
        ..DesiredState::default()
    };
    let err = diff::document(&desired);
    assert!(matches!(err, Err(Error::InvalidEnsure { .. })));
}

#[tokio::test]
async fn rerun_after_partial_failure_converges() -> TestResult {
    let desired = DesiredState::from_yaml_str(
        r#"
services:
  - name: svc
    attributes:
      url: http://svc.internal
    routes:
      - name: root
        attributes:
          paths: ["/"]
        plugins:
          - name: rate-limiting
            attributes:
              config.minute: 20
consumers:
  - username: ada
    credentials:
      - name: key-auth
        attributes:
          key: secret
    acls:
      - group: admins
plugins:
  - name: cors
"#,
    )?;

    let gateway = Arc::new(FakeGateway::new(Vec::new()).failing_once("add-route-plugin"));
    let mut first = Reconciler::new(gateway.clone(), StateSnapshot::new());
    let err = first
        .reconcile(&desired)
        .await
        .err()
        .ok_or("first run should fail")?;
    assert_eq!(
        err.failed_action().map(|a| a.kind.to_string()),
        Some("add-route-plugin".to_string())
    );
    assert_eq!(first.report().actions().count(), 2);

    // a later run starts from whatever the gateway holds now
    let mut second = Reconciler::new(gateway.clone(), first.state().clone());
    let report = second.reconcile(&desired).await?;
    let kinds: Vec<String> = report.actions().map(|a| a.kind.to_string()).collect();
    assert_eq!(
        kinds,
        [
            "add-route-plugin",
            "create-consumer",
            "add-consumer-credential",
            "add-consumer-acl",
            "add-global-plugin",
        ]
    );

    let third = second.reconcile(&desired).await?;
    assert!(third.converged());
    assert_eq!(third.unchanged, 7);
    Ok(())
}

#[tokio::test]
async fn removing_a_service_drops_its_subtree() -> TestResult {
    let mut state = snapshot_with_service(json!({"name": "svc"}));
    if let Some(service) = state.services.get_mut(0) {
        service.plugins.push_back(EntityRecord::new(
            "p-1",
            "cors",
            attrs(json!({"name": "cors"})),
        ));
    }
    let desired = one_service(
        DesiredEntitySpec::named("svc")
            .ensure("removed")
            .plugin(DesiredEntitySpec::named("cors").ensure("removed")),
    );

    let mut reconciler = Reconciler::planning(state);
    let report = reconciler.reconcile(&desired).await?;

    assert_eq!(report.actions().count(), 1);
    assert!(reconciler.state().service("svc").is_none());
    assert_eq!(reconciler.state().entity_count(), 0);
    Ok(())
}

#[tokio::test]
async fn removed_routes_go_before_their_service() -> TestResult {
    let mut state = snapshot_with_service(json!({"name": "svc"}));
    if let Some(service) = state.services.get_mut(0) {
        service.routes.push_back(RouteState::new(EntityRecord::new(
            "r-1",
            "root",
            attrs(json!({"name": "root", "paths": ["/"]})),
        )));
    }
    let desired = one_service(
        DesiredEntitySpec::named("svc")
            .ensure("removed")
            .route(DesiredEntitySpec::named("root").ensure("removed")),
    );

    let mut reconciler = Reconciler::planning(state);
    let report = reconciler.reconcile(&desired).await?;

    let kinds: Vec<String> = report.actions().map(|a| a.kind.to_string()).collect();
    assert_eq!(kinds, ["remove-route", "remove-service"]);
    assert_eq!(
        report.actions().next().and_then(Action::target_id),
        Some("r-1")
    );
    assert_eq!(reconciler.state().entity_count(), 0);
    Ok(())
}

#[tokio::test]
async fn nameless_route_converges_on_rerun() -> TestResult {
    let desired = DesiredState::from_yaml_str(
        r#"
services:
  - name: leads
    routes:
      - attributes:
          paths: ["/leads"]
          strip_path: true
"#,
    )?;

    let gateway = Arc::new(FakeGateway::new(vec!["r-1", "s-1"]));
    let mut reconciler = Reconciler::new(gateway.clone(), StateSnapshot::new());
    let first = reconciler.reconcile(&desired).await?;
    let kinds: Vec<String> = first.actions().map(|a| a.kind.to_string()).collect();
    assert_eq!(kinds, ["create-service", "create-route"]);

    let second = reconciler.reconcile(&desired).await?;
    assert!(second.converged());
    assert_eq!(second.unchanged, 2);

    // a changed non-identifying attribute updates the same route
    let changed = DesiredState::from_yaml_str(
        r#"
services:
  - name: leads
    routes:
      - attributes:
          paths: ["/leads"]
          strip_path: false
"#,
    )?;
    let third = reconciler.reconcile(&changed).await?;
    let updates: Vec<&Action> = third.actions().collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates.first().map(|a| a.kind.to_string()),
        Some("update-route".to_string())
    );
    assert_eq!(updates.first().and_then(|a| a.target_id()), Some("r-1"));
    assert_eq!(gateway.seen().len(), 3);
    Ok(())
}

#[tokio::test]
async fn stale_attributes_update_in_place() -> TestResult {
    let state = snapshot_with_service(json!({"name": "svc", "host": "old", "port": 80}));
    let desired = one_service(DesiredEntitySpec::named("svc").attribute("host", "new"));

    let mut reconciler = Reconciler::planning(state);
    let report = reconciler.reconcile(&desired).await?;

    let actions: Vec<&Action> = report.actions().collect();
    assert_eq!(actions.len(), 1);
    assert_eq!(
        actions.first().map(|a| a.body.clone()),
        Some(Some(attrs(json!({"host": "new"}))))
    );

    let service = reconciler.state().service("svc").ok_or("service vanished")?;
    assert_eq!(service.id(), "abcd-1234");
    assert_eq!(service.record.attributes.get("host"), Some(&json!("new")));
    assert_eq!(service.record.attributes.get("port"), Some(&json!(80)));
    Ok(())
}
