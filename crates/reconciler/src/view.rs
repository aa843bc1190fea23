//! Queries the differs may ask about current state.

use gantry_core::Attributes;
use gantry_events::{
    find_plugin, CredentialRecord, EntityRecord, Identified, RouteState, StateSnapshot,
};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::scope::{PluginOwner, RouteKey, Scope};

/// Read-only capability over current gateway state.
pub trait StateView {
    /// Whether the entity at `scope` exists.
    fn exists(&self, scope: &Scope) -> bool;

    /// Whether every declared attribute matches the live entity. Keys absent
    /// from `desired` are never compared.
    fn is_up_to_date(&self, scope: &Scope, desired: &Attributes) -> bool;

    /// Gateway id of the entity at `scope`.
    fn resolve_id(&self, scope: &Scope) -> Result<String>;
}

impl StateView for StateSnapshot {
    fn exists(&self, scope: &Scope) -> bool {
        record_at(self, scope).is_some()
    }

    fn is_up_to_date(&self, scope: &Scope, desired: &Attributes) -> bool {
        record_at(self, scope).is_some_and(|record| matches_declared(&record.attributes, desired))
    }

    fn resolve_id(&self, scope: &Scope) -> Result<String> {
        record_at(self, scope)
            .map(|record| record.id().to_string())
            .ok_or_else(|| Error::state_inconsistency(scope, "no such entity in current state"))
    }
}

/// The live record addressed by `scope`.
pub fn record_at<'a>(state: &'a StateSnapshot, scope: &Scope) -> Option<&'a EntityRecord> {
    match scope {
        Scope::Service { name } => state.service(name).map(|s| &s.record),
        Scope::Route { service, route } => route_at(state, service, route).map(|r| &r.record),
        Scope::Api { name } => state.api(name).map(|a| &a.record),
        Scope::Consumer { username } => state.consumer(username).map(|c| &c.record),
        Scope::Plugin { owner, name } => match owner {
            PluginOwner::Global => state.global_plugin(name),
            PluginOwner::Service(service) => state
                .service(service)
                .and_then(|s| find_plugin(&s.plugins, name)),
            PluginOwner::Route { service, route } => {
                route_at(state, service, route).and_then(|r| find_plugin(&r.plugins, name))
            }
            PluginOwner::Api(api) => state.api(api).and_then(|a| find_plugin(&a.plugins, name)),
            PluginOwner::Consumer(consumer) => state
                .consumer(consumer)
                .and_then(|c| find_plugin(&c.plugins, name)),
        },
        Scope::Credential {
            consumer,
            plugin,
            identity,
        } => state.consumer(consumer).and_then(|c| {
            c.credentials
                .iter()
                .find(|credential| is_credential(credential, plugin, identity))
                .map(|credential| &credential.record)
        }),
        Scope::Acl { consumer, group } => state
            .consumer(consumer)
            .and_then(|c| c.acls.iter().find(|acl| acl.key == *group)),
    }
}

/// A nameless route is the first of its service's routes carrying every
/// identifying attribute.
fn route_at<'a>(state: &'a StateSnapshot, service: &str, route: &RouteKey) -> Option<&'a RouteState> {
    match route {
        RouteKey::Named(name) => state.route(service, name),
        RouteKey::Matching(identity) => state.service(service).and_then(|s| {
            s.routes
                .iter()
                .find(|r| matches_declared(&r.record.attributes, identity))
        }),
    }
}

fn is_credential(credential: &CredentialRecord, plugin: &str, identity: &Attributes) -> bool {
    credential.plugin == plugin && matches_declared(&credential.record.attributes, identity)
}

/// Partial comparison: every declared key must be present with an equal value.
pub fn matches_declared(live: &Attributes, desired: &Attributes) -> bool {
    desired
        .iter()
        .all(|(key, value)| lookup_attribute(live, key) == Some(value))
}

/// Find `key` in `live`, first literally, then as a dotted path into nested
/// objects (`config.foo` → `config` → `foo`).
pub fn lookup_attribute<'a>(live: &'a Attributes, key: &str) -> Option<&'a Value> {
    live.get(key).or_else(|| {
        let mut segments = key.split('.');
        let first = segments.next()?;
        segments.try_fold(live.get(first)?, |value, segment| value.get(segment))
    })
}
