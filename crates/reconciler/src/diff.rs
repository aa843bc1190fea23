//! Entity differs.
//!
//! A differ turns a list of desired specs into [`PendingChange`]s, one per
//! spec and one per nested child, in pre-order. A removed service is the
//! exception: its removed routes come first and its other children are left
//! to the gateway. The whole input, nested collections included, is
//! validated before anything is produced.

use gantry_core::{EntityKind, PluginScope};
use itertools::Itertools;
use tracing::debug;

use crate::desired::{Collection, DesiredEntitySpec, DesiredState, Ensure};
use crate::error::{Error, Result};
use crate::pending::PendingChange;
use crate::scope::{PluginOwner, RouteKey, Scope};

/// Diff `specs` of kind `entity` nested under `parent` (`None` at top level).
pub fn diff(
    entity: EntityKind,
    parent: Option<&Scope>,
    specs: &[DesiredEntitySpec],
) -> Result<Vec<PendingChange>> {
    validate(entity, specs)?;
    let mut changes = Vec::new();
    collect(entity, parent, specs, &mut changes)?;
    Ok(changes)
}

/// Top-level services.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn services(specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Service, None, specs)
}

/// Top-level APIs.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn apis(specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Api, None, specs)
}

/// Top-level consumers.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn consumers(specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Consumer, None, specs)
}

/// Plugins attached to no entity.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn global_plugins(specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Plugin(PluginScope::Global), None, specs)
}

/// Routes of the service named `service`.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn routes(service: &str, specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Route, Some(&Scope::service(service)), specs)
}

/// Plugins attached to `owner`.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn plugins(owner: &PluginOwner, specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(
        EntityKind::Plugin(owner.scope()),
        owner.owner_scope().as_ref(),
        specs,
    )
}

/// Credentials of the consumer named `consumer`.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn credentials(consumer: &str, specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Credential, Some(&Scope::consumer(consumer)), specs)
}

/// ACL entries of the consumer named `consumer`.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn acls(consumer: &str, specs: &[DesiredEntitySpec]) -> Result<Vec<PendingChange>> {
    diff(EntityKind::Acl, Some(&Scope::consumer(consumer)), specs)
}

/// Every change a document asks for: services, APIs, consumers, then global
/// plugins, each in declared order.
///
/// # Errors
///
/// Returns a configuration error if a spec lacks its identity, declares an
/// unknown `ensure`, or nests a collection its kind does not allow.
pub fn document(desired: &DesiredState) -> Result<Vec<PendingChange>> {
    let sections = [
        (EntityKind::Service, desired.services.as_slice()),
        (EntityKind::Api, desired.apis.as_slice()),
        (EntityKind::Consumer, desired.consumers.as_slice()),
        (EntityKind::Plugin(PluginScope::Global), desired.plugins.as_slice()),
    ];

    sections
        .iter()
        .try_for_each(|(entity, specs)| validate(*entity, specs))?;

    sections
        .iter()
        .map(|(entity, specs)| diff(*entity, None, specs))
        .flatten_ok()
        .collect()
}

/// Field that carries the natural key of `entity` in a desired document.
pub const fn identity_field(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Consumer => "username",
        EntityKind::Acl => "group",
        EntityKind::Service
        | EntityKind::Route
        | EntityKind::Api
        | EntityKind::Plugin(_)
        | EntityKind::Credential => "name",
    }
}

/// Kind of the children `entity` holds in `collection`, if it can hold any.
pub const fn child_kind(entity: EntityKind, collection: Collection) -> Option<EntityKind> {
    match (entity, collection) {
        (EntityKind::Service, Collection::Routes) => Some(EntityKind::Route),
        (EntityKind::Service, Collection::Plugins) => Some(EntityKind::Plugin(PluginScope::Service)),
        (EntityKind::Route, Collection::Plugins) => Some(EntityKind::Plugin(PluginScope::Route)),
        (EntityKind::Api, Collection::Plugins) => Some(EntityKind::Plugin(PluginScope::Api)),
        (EntityKind::Consumer, Collection::Plugins) => {
            Some(EntityKind::Plugin(PluginScope::Consumer))
        }
        (EntityKind::Consumer, Collection::Credentials) => Some(EntityKind::Credential),
        (EntityKind::Consumer, Collection::Acls) => Some(EntityKind::Acl),
        _ => None,
    }
}

fn nested_kind(entity: EntityKind, collection: Collection) -> Result<EntityKind> {
    child_kind(entity, collection)
        .ok_or_else(|| Error::unexpected_nested(entity, collection.as_str()))
}

fn name(entity: EntityKind, spec: &DesiredEntitySpec) -> Result<&str> {
    spec.name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::missing_identity(entity, identity_field(entity)))
}

fn route_key(spec: &DesiredEntitySpec) -> Result<RouteKey> {
    RouteKey::declared(spec.name.as_deref(), &spec.attributes)
        .ok_or_else(|| Error::missing_identity(EntityKind::Route, "name\" or \"attributes"))
}

/// Routes may go without a name; everything else needs its natural key.
fn check_identity(entity: EntityKind, spec: &DesiredEntitySpec) -> Result<()> {
    match entity {
        EntityKind::Route => route_key(spec).map(|_| ()),
        _ => name(entity, spec).map(|_| ()),
    }
}

fn validate(entity: EntityKind, specs: &[DesiredEntitySpec]) -> Result<()> {
    specs.iter().try_for_each(|spec| {
        Ensure::of(entity, spec)?;
        check_identity(entity, spec)?;
        spec.nested()
            .into_iter()
            .try_for_each(|(collection, children)| {
                validate(nested_kind(entity, collection)?, children)
            })
    })
}

fn collect(
    entity: EntityKind,
    parent: Option<&Scope>,
    specs: &[DesiredEntitySpec],
    changes: &mut Vec<PendingChange>,
) -> Result<()> {
    for spec in specs {
        let ensure = Ensure::of(entity, spec)?;
        let scope = scope_of(entity, parent, spec)?;

        if ensure == Ensure::Removed {
            // routes keep their service from being deleted; plugins and
            // consumer children go with their owner
            let removed_routes: Vec<DesiredEntitySpec> = spec
                .routes
                .iter()
                .filter(|route| matches!(Ensure::of(EntityKind::Route, route), Ok(Ensure::Removed)))
                .cloned()
                .collect();
            if !removed_routes.is_empty() {
                collect(
                    nested_kind(entity, Collection::Routes)?,
                    Some(&scope),
                    &removed_routes,
                    changes,
                )?;
            }
            if spec.nested().iter().map(|(_, children)| children.len()).sum::<usize>()
                > removed_routes.len()
            {
                debug!(%scope, "not diffing children that go with a removed entity");
            }
            changes.push(PendingChange::new(ensure, scope, spec.clone()));
            continue;
        }

        changes.push(PendingChange::new(ensure, scope.clone(), spec.clone()));
        for (collection, children) in spec.nested() {
            collect(nested_kind(entity, collection)?, Some(&scope), children, changes)?;
        }
    }
    Ok(())
}

fn scope_of(entity: EntityKind, parent: Option<&Scope>, spec: &DesiredEntitySpec) -> Result<Scope> {
    let key = || name(entity, spec);
    let scope = match (entity, parent) {
        (EntityKind::Service, None) => Scope::service(key()?),
        (EntityKind::Api, None) => Scope::api(key()?),
        (EntityKind::Consumer, None) => Scope::consumer(key()?),
        (EntityKind::Plugin(PluginScope::Global), None) => {
            Scope::plugin(PluginOwner::Global, key()?)
        }
        (EntityKind::Route, Some(Scope::Service { name: service })) => {
            Scope::route(service, route_key(spec)?)
        }
        (EntityKind::Plugin(_), Some(Scope::Service { name: service })) => {
            Scope::plugin(PluginOwner::Service(service.clone()), key()?)
        }
        (EntityKind::Plugin(_), Some(Scope::Route { service, route })) => Scope::plugin(
            PluginOwner::Route {
                service: service.clone(),
                route: route.clone(),
            },
            key()?,
        ),
        (EntityKind::Plugin(_), Some(Scope::Api { name: api })) => {
            Scope::plugin(PluginOwner::Api(api.clone()), key()?)
        }
        (EntityKind::Plugin(_), Some(Scope::Consumer { username })) => {
            Scope::plugin(PluginOwner::Consumer(username.clone()), key()?)
        }
        (EntityKind::Credential, Some(Scope::Consumer { username })) => {
            Scope::credential(username, key()?, &spec.attributes)
        }
        (EntityKind::Acl, Some(Scope::Consumer { username })) => Scope::acl(username, key()?),
        (entity, Some(parent)) => return Err(Error::unexpected_parent(entity, parent)),
        (entity, None) => return Err(Error::unexpected_parent(entity, "the document root")),
    };
    Ok(scope)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use gantry_core::{params, Action, Attributes};
    use serde_json::json;

    use super::*;
    use crate::pending::{NoopAction, Resolved};
    use crate::test_support::ScriptedView;
    use crate::view::StateView;

    fn resolve_all(changes: &[PendingChange], view: &dyn StateView) -> Vec<Resolved> {
        changes
            .iter()
            .filter_map(|change| change.resolve(view).unwrap())
            .collect()
    }

    fn only_action(resolved: &[Resolved]) -> &Action {
        let action = match resolved {
            [Resolved::Action(action)] => Some(action),
            _ => None,
        };
        action.unwrap()
    }

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_absent_service() {
        let specs = [DesiredEntitySpec::named("svc").attribute("url", "bar")];
        let changes = services(&specs).unwrap();

        let resolved = resolve_all(&changes, &ScriptedView::new());
        let action = only_action(&resolved);
        assert_eq!(action.kind.to_string(), "create-service");
        assert_eq!(action.body, Some(attrs(json!({"url": "bar", "name": "svc"}))));
    }

    #[test]
    fn test_stale_service_plugin_updates_declared_keys_only() {
        let owner = PluginOwner::Service("svc".to_string());
        let view = ScriptedView::new()
            .current(&Scope::service("svc"), "abcd-1234")
            .stale(&Scope::plugin(owner.clone(), "cors"), "p-1");
        let specs = [DesiredEntitySpec::named("cors").attribute("config.foo", "bar")];

        let resolved = resolve_all(&plugins(&owner, &specs).unwrap(), &view);
        let action = only_action(&resolved);
        assert_eq!(action.kind.to_string(), "update-service-plugin");
        assert_eq!(action.endpoint.param(params::SERVICE_ID), Some("abcd-1234"));
        assert_eq!(action.endpoint.param(params::PLUGIN_ID), Some("p-1"));
        assert_eq!(action.body, Some(attrs(json!({"config.foo": "bar"}))));
    }

    #[test]
    fn test_up_to_date_emits_nothing() {
        let view = ScriptedView::new().current(&Scope::service("svc"), "abcd-1234");
        let specs = [DesiredEntitySpec::named("svc").attribute("host", "foo")];
        assert!(resolve_all(&services(&specs).unwrap(), &view).is_empty());
    }

    #[test]
    fn test_removed_and_absent_emits_one_noop() {
        let spec = DesiredEntitySpec::named("svc").ensure("removed");
        let resolved = resolve_all(&services(&[spec.clone()]).unwrap(), &ScriptedView::new());
        assert_eq!(
            resolved,
            vec![Resolved::Noop(NoopAction::new(EntityKind::Service, spec))]
        );
    }

    #[test]
    fn test_removed_and_present_removes_by_id() {
        let view = ScriptedView::new().current(&Scope::api("legacy"), "a-1");
        let specs = [DesiredEntitySpec::named("legacy").ensure("removed")];
        let resolved = resolve_all(&apis(&specs).unwrap(), &view);
        let action = only_action(&resolved);
        assert_eq!(action.kind.to_string(), "remove-api");
        assert_eq!(action.target_id(), Some("a-1"));
    }

    #[test]
    fn test_invalid_ensure_fails_before_any_change() {
        let specs = [
            DesiredEntitySpec::named("ok"),
            DesiredEntitySpec::named("not-working").ensure("not-valid"),
        ];
        let err = services(&specs).unwrap_err();
        assert!(err.to_string().contains("Invalid ensure"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_nested_ensure_fails_whole_list() {
        let specs = [
            DesiredEntitySpec::named("first"),
            DesiredEntitySpec::named("second")
                .plugin(DesiredEntitySpec::named("cors").ensure("absent")),
        ];
        assert!(matches!(
            services(&specs),
            Err(Error::InvalidEnsure { .. })
        ));
    }

    #[test]
    fn test_missing_identity() {
        let specs = [DesiredEntitySpec::default().attribute("url", "bar")];
        assert_eq!(
            services(&specs).unwrap_err(),
            Error::missing_identity(EntityKind::Service, "name")
        );
        let consumers_specs = [DesiredEntitySpec::default()];
        assert_eq!(
            consumers(&consumers_specs).unwrap_err(),
            Error::missing_identity(EntityKind::Consumer, "username")
        );
    }

    #[test]
    fn test_unexpected_nested_collection() {
        let specs = [DesiredEntitySpec::named("legacy").route(DesiredEntitySpec::named("root"))];
        assert_eq!(
            apis(&specs).unwrap_err(),
            Error::unexpected_nested(EntityKind::Api, "routes")
        );
    }

    #[test]
    fn test_pre_order_parent_before_children() {
        let specs = [DesiredEntitySpec::named("svc")
            .plugin(DesiredEntitySpec::named("cors"))
            .route(
                DesiredEntitySpec::named("root").plugin(DesiredEntitySpec::named("rate-limiting")),
            )];
        let changes = services(&specs).unwrap();
        let scopes: Vec<String> = changes.iter().map(|c| c.scope.to_string()).collect();
        assert_eq!(
            scopes,
            [
                "service \"svc\"",
                "service \"svc\"/route \"root\"",
                "service \"svc\"/route \"root\"/route-plugin \"rate-limiting\"",
                "service \"svc\"/service-plugin \"cors\"",
            ]
        );
    }

    #[test]
    fn test_nameless_route_is_keyed_by_matchers() {
        let desired = DesiredState::from_yaml_str(
            "services:\n  - name: leads\n    routes:\n      - attributes: {paths: [\"/\"], strip_path: true}\n",
        )
        .unwrap();
        let changes = document(&desired).unwrap();
        let scopes: Vec<String> = changes.iter().map(|c| c.scope.to_string()).collect();
        assert_eq!(
            scopes,
            [
                "service \"leads\"",
                "service \"leads\"/route matching {\"paths\":[\"/\"]}",
            ]
        );

        let view = ScriptedView::new().current(&Scope::service("leads"), "s-1");
        let resolved = resolve_all(changes.get(1..).unwrap(), &view);
        let action = only_action(&resolved);
        assert_eq!(action.kind.to_string(), "create-route");
        assert_eq!(action.endpoint.param(params::SERVICE_ID), Some("s-1"));
        assert_eq!(
            action.body,
            Some(attrs(json!({"paths": ["/"], "strip_path": true})))
        );
    }

    #[test]
    fn test_route_without_name_or_attributes() {
        let specs = [DesiredEntitySpec::named("leads").route(DesiredEntitySpec::default())];
        assert_eq!(
            services(&specs).unwrap_err(),
            Error::missing_identity(EntityKind::Route, "name\" or \"attributes")
        );
    }

    #[test]
    fn test_removed_routes_precede_removed_service() {
        let specs = [DesiredEntitySpec::named("svc")
            .ensure("removed")
            .route(
                DesiredEntitySpec::named("old")
                    .ensure("removed")
                    .plugin(DesiredEntitySpec::named("cors")),
            )
            .route(DesiredEntitySpec::named("kept"))
            .plugin(DesiredEntitySpec::named("cors"))];
        let changes = services(&specs).unwrap();
        let order: Vec<(String, Ensure)> = changes
            .iter()
            .map(|c| (c.scope.to_string(), c.ensure))
            .collect();
        assert_eq!(
            order,
            [
                ("service \"svc\"/route \"old\"".to_string(), Ensure::Removed),
                ("service \"svc\"".to_string(), Ensure::Removed),
            ]
        );

        let view = ScriptedView::new()
            .current(&Scope::service("svc"), "s-1")
            .current(&Scope::route("svc", "old"), "r-1");
        let kinds: Vec<String> = resolve_all(&changes, &view)
            .iter()
            .filter_map(|resolved| match resolved {
                Resolved::Action(action) => Some(action.kind.to_string()),
                Resolved::Noop(_) => None,
            })
            .collect();
        assert_eq!(kinds, ["remove-route", "remove-service"]);
    }

    #[test]
    fn test_children_of_removed_parent_are_skipped() {
        let specs = [DesiredEntitySpec::named("svc")
            .ensure("removed")
            .plugin(DesiredEntitySpec::named("cors"))];
        let changes = services(&specs).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.first().unwrap().ensure, Ensure::Removed);
    }

    #[test]
    fn test_consumer_children() {
        let specs = [DesiredEntitySpec::named("ada")
            .credential(DesiredEntitySpec::named("key-auth").attribute("key", "secret"))
            .acl(DesiredEntitySpec::named("admins"))];
        let changes = consumers(&specs).unwrap();
        let kinds: Vec<EntityKind> = changes.iter().map(PendingChange::entity).collect();
        assert_eq!(
            kinds,
            [EntityKind::Consumer, EntityKind::Credential, EntityKind::Acl]
        );

        let view = ScriptedView::new().current(&Scope::consumer("ada"), "c-1");
        let resolved = resolve_all(&changes, &view);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_document_order() {
        let doc = DesiredState {
            plugins: vec![DesiredEntitySpec::named("cors")],
            consumers: vec![DesiredEntitySpec::named("ada")],
            apis: vec![DesiredEntitySpec::named("legacy")],
            services: vec![DesiredEntitySpec::named("svc")],
        };
        let kinds: Vec<EntityKind> = document(&doc)
            .unwrap()
            .iter()
            .map(PendingChange::entity)
            .collect();
        assert_eq!(
            kinds,
            [
                EntityKind::Service,
                EntityKind::Api,
                EntityKind::Consumer,
                EntityKind::Plugin(PluginScope::Global),
            ]
        );
    }

    #[test]
    fn test_document_validates_every_section_first() {
        let doc = DesiredState {
            services: vec![DesiredEntitySpec::named("svc")],
            plugins: vec![DesiredEntitySpec::named("cors").ensure("maybe")],
            ..DesiredState::default()
        };
        assert!(matches!(
            document(&doc),
            Err(Error::InvalidEnsure { .. })
        ));
    }

    #[test]
    fn test_nested_kind_needs_matching_parent() {
        let specs = [DesiredEntitySpec::named("root")];
        assert!(matches!(
            diff(EntityKind::Route, None, &specs),
            Err(Error::UnexpectedParent { .. })
        ));
        assert!(matches!(
            diff(EntityKind::Route, Some(&Scope::api("legacy")), &specs),
            Err(Error::UnexpectedParent { .. })
        ));
    }
}
