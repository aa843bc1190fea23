//! Pending changes and their resolution against a state view.
//!
//! A [`PendingChange`] records what a differ decided without committing to a
//! request: the entity's scope, its desired lifecycle and the declared spec.
//! It only becomes an [`Action`] when resolved against the state current at
//! that moment, so a child can address a parent created earlier in the run.

use gantry_core::{Action, EntityKind, Operation, PluginParent};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::desired::{DesiredEntitySpec, Ensure};
use crate::error::Result;
use crate::scope::{PluginOwner, Scope};
use crate::view::StateView;

/// One undecided change, produced by the differs.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub ensure: Ensure,
    pub scope: Scope,
    pub spec: DesiredEntitySpec,
}

/// A removal that was already satisfied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoopAction {
    #[serde(rename = "type", serialize_with = "noop_tag")]
    pub entity: EntityKind,
    pub context: DesiredEntitySpec,
}

impl NoopAction {
    pub const fn new(entity: EntityKind, context: DesiredEntitySpec) -> Self {
        Self { entity, context }
    }
}

fn noop_tag<S: Serializer>(
    entity: &EntityKind,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&entity.noop_tag())
}

/// Outcome of resolving a pending change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    Action(Action),
    Noop(NoopAction),
}

impl PendingChange {
    pub const fn new(ensure: Ensure, scope: Scope, spec: DesiredEntitySpec) -> Self {
        Self {
            ensure,
            scope,
            spec,
        }
    }

    pub const fn entity(&self) -> EntityKind {
        self.scope.entity()
    }

    /// Decide the change against `view`.
    ///
    /// `None` means the entity is present and already matches.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent the change depends on is absent from the view.
    pub fn resolve(&self, view: &dyn StateView) -> Result<Option<Resolved>> {
        match (self.ensure, view.exists(&self.scope)) {
            (Ensure::Present, false) => self.create(view).map(|a| Some(Resolved::Action(a))),
            (Ensure::Present, true) => {
                let supports_update = self.entity().operations().contains(&Operation::Update);
                if !supports_update || view.is_up_to_date(&self.scope, &self.spec.attributes) {
                    debug!(scope = %self.scope, "already up to date");
                    return Ok(None);
                }
                self.update(view).map(|a| a.map(Resolved::Action))
            }
            (Ensure::Removed, true) => self.remove(view).map(|a| Some(Resolved::Action(a))),
            (Ensure::Removed, false) => {
                debug!(scope = %self.scope, "already removed");
                Ok(Some(Resolved::Noop(NoopAction::new(
                    self.entity(),
                    self.spec.clone(),
                ))))
            }
        }
    }

    fn create(&self, view: &dyn StateView) -> Result<Action> {
        let attributes = &self.spec.attributes;
        let action = match &self.scope {
            Scope::Service { name } => Action::create_service(name, attributes),
            Scope::Route { service, route } => {
                let service_id = view.resolve_id(&Scope::service(service))?;
                Action::create_route(&service_id, route.name(), attributes)
            }
            Scope::Api { name } => Action::create_api(name, attributes),
            Scope::Consumer { username } => Action::create_consumer(username, attributes),
            Scope::Plugin { owner, name } => {
                Action::add_plugin(&plugin_parent(view, owner)?, name, attributes)
            }
            Scope::Credential {
                consumer, plugin, ..
            } => Action::add_credential(&consumer_id(view, consumer)?, plugin, attributes),
            Scope::Acl { consumer, group } => Action::add_acl(&consumer_id(view, consumer)?, group),
        };
        Ok(action)
    }

    /// `None` for kinds the admin API cannot update in place.
    fn update(&self, view: &dyn StateView) -> Result<Option<Action>> {
        let attributes = &self.spec.attributes;
        let id = view.resolve_id(&self.scope)?;
        let action = match &self.scope {
            Scope::Service { .. } => Action::update_service(&id, attributes),
            Scope::Route { .. } => Action::update_route(&id, attributes),
            Scope::Api { .. } => Action::update_api(&id, attributes),
            Scope::Consumer { .. } => Action::update_consumer(&id, attributes),
            Scope::Plugin { owner, .. } => {
                Action::update_plugin(&plugin_parent(view, owner)?, &id, attributes)
            }
            Scope::Credential {
                consumer, plugin, ..
            } => Action::update_credential(&consumer_id(view, consumer)?, plugin, &id, attributes),
            Scope::Acl { .. } => return Ok(None),
        };
        Ok(Some(action))
    }

    fn remove(&self, view: &dyn StateView) -> Result<Action> {
        let id = view.resolve_id(&self.scope)?;
        let action = match &self.scope {
            Scope::Service { .. } => Action::remove_service(&id),
            Scope::Route { .. } => Action::remove_route(&id),
            Scope::Api { .. } => Action::remove_api(&id),
            Scope::Consumer { .. } => Action::remove_consumer(&id),
            Scope::Plugin { owner, .. } => Action::remove_plugin(&plugin_parent(view, owner)?, &id),
            Scope::Credential {
                consumer, plugin, ..
            } => Action::remove_credential(&consumer_id(view, consumer)?, plugin, &id),
            Scope::Acl { consumer, .. } => Action::remove_acl(&consumer_id(view, consumer)?, &id),
        };
        Ok(action)
    }
}

fn consumer_id(view: &dyn StateView, username: &str) -> Result<String> {
    view.resolve_id(&Scope::consumer(username))
}

fn plugin_parent(view: &dyn StateView, owner: &PluginOwner) -> Result<PluginParent> {
    let parent = match owner {
        PluginOwner::Global => PluginParent::Global,
        PluginOwner::Service(name) => PluginParent::Service(view.resolve_id(&Scope::service(name))?),
        PluginOwner::Route { service, route } => {
            PluginParent::Route(view.resolve_id(&Scope::route(service, route.clone()))?)
        }
        PluginOwner::Api(name) => PluginParent::Api(view.resolve_id(&Scope::api(name))?),
        PluginOwner::Consumer(username) => PluginParent::Consumer(consumer_id(view, username)?),
    };
    Ok(parent)
}
