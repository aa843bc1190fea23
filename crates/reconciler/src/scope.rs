//! Natural-key addresses of gateway entities.

use std::fmt;

use gantry_core::{credential_identity_field, Attributes, EntityKind, PluginScope};

/// Route attributes that tell nameless routes apart.
const ROUTE_MATCHERS: [&str; 3] = ["paths", "hosts", "methods"];

/// How a route is recognised among its service's routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKey {
    Named(String),
    /// A nameless route, matched by these attributes.
    Matching(Attributes),
}

impl RouteKey {
    /// Key of a declared route: its name when given, otherwise the declared
    /// `paths`, `hosts` and `methods`, falling back to every declared
    /// attribute. `None` when the route declares nothing at all.
    pub fn declared(name: Option<&str>, attributes: &Attributes) -> Option<Self> {
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            return Some(Self::Named(name.to_string()));
        }
        let matchers: Attributes = attributes
            .iter()
            .filter(|(key, _)| ROUTE_MATCHERS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let identity = if matchers.is_empty() {
            attributes.clone()
        } else {
            matchers
        };
        (!identity.is_empty()).then_some(Self::Matching(identity))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Matching(_) => None,
        }
    }
}

impl From<&str> for RouteKey {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for RouteKey {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "\"{name}\""),
            Self::Matching(identity) => {
                let rendered = serde_json::to_string(identity).map_err(|_| fmt::Error)?;
                write!(f, "matching {rendered}")
            }
        }
    }
}

/// Owner of a plugin, by natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOwner {
    Global,
    Service(String),
    Route { service: String, route: RouteKey },
    Api(String),
    Consumer(String),
}

impl PluginOwner {
    pub const fn scope(&self) -> PluginScope {
        match self {
            Self::Global => PluginScope::Global,
            Self::Service(_) => PluginScope::Service,
            Self::Route { .. } => PluginScope::Route,
            Self::Api(_) => PluginScope::Api,
            Self::Consumer(_) => PluginScope::Consumer,
        }
    }

    /// Scope of the owning entity, `None` for global plugins.
    pub fn owner_scope(&self) -> Option<Scope> {
        match self {
            Self::Global => None,
            Self::Service(name) => Some(Scope::service(name)),
            Self::Route { service, route } => Some(Scope::route(service, route.clone())),
            Self::Api(name) => Some(Scope::api(name)),
            Self::Consumer(username) => Some(Scope::consumer(username)),
        }
    }
}

/// Where an entity lives, by natural key of itself and of its ancestors.
///
/// Gateway ids are deliberately absent: they are looked up through a
/// [`StateView`](crate::view::StateView) when a change is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Service {
        name: String,
    },
    Route {
        service: String,
        route: RouteKey,
    },
    Api {
        name: String,
    },
    Consumer {
        username: String,
    },
    Plugin {
        owner: PluginOwner,
        name: String,
    },
    Credential {
        consumer: String,
        plugin: String,
        /// Attributes a live credential must carry to be this one.
        identity: Attributes,
    },
    Acl {
        consumer: String,
        group: String,
    },
}

impl Scope {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service { name: name.into() }
    }

    pub fn route(service: impl Into<String>, route: impl Into<RouteKey>) -> Self {
        Self::Route {
            service: service.into(),
            route: route.into(),
        }
    }

    pub fn api(name: impl Into<String>) -> Self {
        Self::Api { name: name.into() }
    }

    pub fn consumer(username: impl Into<String>) -> Self {
        Self::Consumer {
            username: username.into(),
        }
    }

    pub fn plugin(owner: PluginOwner, name: impl Into<String>) -> Self {
        Self::Plugin {
            owner,
            name: name.into(),
        }
    }

    /// Credential scope; the identity is the plugin's identifying attribute
    /// when declared, otherwise every declared attribute.
    pub fn credential(
        consumer: impl Into<String>,
        plugin: impl Into<String>,
        declared: &Attributes,
    ) -> Self {
        let plugin = plugin.into();
        let identity = credential_identity_field(&plugin)
            .and_then(|field| {
                declared.get(field).map(|value| {
                    let mut identity = Attributes::new();
                    identity.insert(field.to_string(), value.clone());
                    identity
                })
            })
            .unwrap_or_else(|| declared.clone());
        Self::Credential {
            consumer: consumer.into(),
            plugin,
            identity,
        }
    }

    pub fn acl(consumer: impl Into<String>, group: impl Into<String>) -> Self {
        Self::Acl {
            consumer: consumer.into(),
            group: group.into(),
        }
    }

    pub const fn entity(&self) -> EntityKind {
        match self {
            Self::Service { .. } => EntityKind::Service,
            Self::Route { .. } => EntityKind::Route,
            Self::Api { .. } => EntityKind::Api,
            Self::Consumer { .. } => EntityKind::Consumer,
            Self::Plugin { owner, .. } => EntityKind::Plugin(owner.scope()),
            Self::Credential { .. } => EntityKind::Credential,
            Self::Acl { .. } => EntityKind::Acl,
        }
    }

    /// Scope of the direct parent, if nested.
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Service { .. } | Self::Api { .. } | Self::Consumer { .. } => None,
            Self::Route { service, .. } => Some(Self::service(service)),
            Self::Plugin { owner, .. } => owner.owner_scope(),
            Self::Credential { consumer, .. } | Self::Acl { consumer, .. } => {
                Some(Self::consumer(consumer))
            }
        }
    }

    /// Natural key of the entity itself; `None` for a nameless route.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Service { name } | Self::Api { name } | Self::Plugin { name, .. } => Some(name),
            Self::Route { route, .. } => route.name(),
            Self::Consumer { username } => Some(username),
            Self::Credential { plugin, .. } => Some(plugin),
            Self::Acl { group, .. } => Some(group),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent}/")?;
        }
        match self {
            Self::Route { route, .. } => write!(f, "{} {route}", self.entity()),
            _ => write!(f, "{} \"{}\"", self.entity(), self.key().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parents() {
        let plugin = Scope::plugin(
            PluginOwner::Route {
                service: "svc".to_string(),
                route: "root".into(),
            },
            "cors",
        );
        assert_eq!(plugin.entity(), EntityKind::Plugin(PluginScope::Route));
        assert_eq!(plugin.parent(), Some(Scope::route("svc", "root")));
        assert_eq!(
            Scope::route("svc", "root").parent(),
            Some(Scope::service("svc"))
        );
        assert_eq!(Scope::plugin(PluginOwner::Global, "cors").parent(), None);
    }

    #[test]
    fn test_credential_identity() {
        let declared = json!({"key": "secret", "ttl": 10});
        let declared = declared.as_object().cloned().unwrap_or_default();

        let Scope::Credential { identity, .. } = Scope::credential("ada", "key-auth", &declared)
        else {
            return;
        };
        assert_eq!(identity.len(), 1);
        assert_eq!(identity.get("key"), Some(&json!("secret")));

        let Scope::Credential { identity, .. } = Scope::credential("ada", "custom", &declared)
        else {
            return;
        };
        assert_eq!(identity, declared);
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::service("svc").to_string(), "service \"svc\"");
        assert_eq!(
            Scope::acl("ada", "admins").to_string(),
            "consumer \"ada\"/consumer-acl \"admins\""
        );

        let declared = json!({"paths": ["/"]});
        let route = RouteKey::declared(None, declared.as_object().unwrap_or(&Attributes::new()));
        let scope = Scope::route("svc", route.unwrap_or_else(|| "missing".into()));
        assert_eq!(
            scope.to_string(),
            "service \"svc\"/route matching {\"paths\":[\"/\"]}"
        );
    }

    #[test]
    fn test_route_key_prefers_name_then_matchers() {
        let declared = json!({"paths": ["/v1"], "strip_path": true});
        let declared = declared.as_object().cloned().unwrap_or_default();

        assert_eq!(
            RouteKey::declared(Some("root"), &declared),
            Some(RouteKey::Named("root".to_string()))
        );

        let Some(RouteKey::Matching(identity)) = RouteKey::declared(None, &declared) else {
            return;
        };
        assert_eq!(identity.len(), 1);
        assert_eq!(identity.get("paths"), Some(&json!(["/v1"])));

        let unmatched = json!({"strip_path": true});
        let unmatched = unmatched.as_object().cloned().unwrap_or_default();
        assert_eq!(
            RouteKey::declared(Some(""), &unmatched),
            Some(RouteKey::Matching(unmatched.clone()))
        );
        assert_eq!(RouteKey::declared(None, &Attributes::new()), None);
    }
}
