//! Entity and operation vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ordered attribute map, keys in declaration order.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Attribute that identifies a credential among its consumer's credentials
/// of the same plugin. `None` for plugins without a natural key.
pub fn credential_identity_field(plugin: &str) -> Option<&'static str> {
    match plugin {
        "key-auth" | "jwt" => Some("key"),
        "basic-auth" | "hmac-auth" => Some("username"),
        "oauth2" => Some("client_id"),
        _ => None,
    }
}

/// Where a plugin is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginScope {
    /// Applies to every request the gateway proxies.
    Global,
    Service,
    Route,
    Api,
    Consumer,
}

impl PluginScope {
    /// All plugin scopes.
    pub const ALL: [Self; 5] = [
        Self::Global,
        Self::Service,
        Self::Route,
        Self::Api,
        Self::Consumer,
    ];

    /// Tag fragment used in action kinds.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Service => "service",
            Self::Route => "route",
            Self::Api => "api",
            Self::Consumer => "consumer",
        }
    }
}

/// The kinds of gateway entity the reconciler manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Service,
    Route,
    Api,
    Consumer,
    Plugin(PluginScope),
    Credential,
    Acl,
}

impl EntityKind {
    /// Every entity kind, parents before children.
    pub fn all() -> Vec<Self> {
        let mut kinds = vec![Self::Service, Self::Route, Self::Api, Self::Consumer];
        kinds.extend(PluginScope::ALL.into_iter().map(Self::Plugin));
        kinds.extend([Self::Credential, Self::Acl]);
        kinds
    }

    /// Stable slug, e.g. `service`, `route-plugin`, `consumer-acl`.
    pub fn slug(self) -> String {
        match self {
            Self::Service => "service".to_string(),
            Self::Route => "route".to_string(),
            Self::Api => "api".to_string(),
            Self::Consumer => "consumer".to_string(),
            Self::Plugin(scope) => format!("{}-plugin", scope.as_str()),
            Self::Credential => "consumer-credential".to_string(),
            Self::Acl => "consumer-acl".to_string(),
        }
    }

    /// Tag recorded for a removal that was already satisfied.
    pub fn noop_tag(self) -> String {
        format!("noop-{}", self.slug())
    }

    /// Whether this kind lives inside a parent collection.
    pub const fn is_nested(self) -> bool {
        !matches!(
            self,
            Self::Service | Self::Api | Self::Consumer | Self::Plugin(PluginScope::Global)
        )
    }

    /// Operations the admin API supports for this kind.
    pub fn operations(self) -> &'static [Operation] {
        match self {
            Self::Acl => &[Operation::Create, Operation::Remove],
            _ => &[Operation::Create, Operation::Update, Operation::Remove],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| Error::unknown_action_kind(s))
    }
}

impl Serialize for EntityKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.slug())
    }
}

impl<'de> Deserialize<'de> for EntityKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slug = String::deserialize(deserializer)?;
        slug.parse().map_err(serde::de::Error::custom)
    }
}

/// Mutating operation applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Remove,
}

/// An entity kind paired with the operation applied to it.
///
/// Serialized as the kebab-case tag the rest of the tooling logs, for example
/// `create-service`, `add-route-plugin` or `remove-consumer-acl`. Nested
/// kinds are "added" rather than "created".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionKind {
    pub entity: EntityKind,
    pub operation: Operation,
}

impl ActionKind {
    pub const fn new(entity: EntityKind, operation: Operation) -> Self {
        Self { entity, operation }
    }

    /// Every valid action kind.
    pub fn all() -> Vec<Self> {
        EntityKind::all()
            .into_iter()
            .flat_map(|entity| {
                entity
                    .operations()
                    .iter()
                    .map(move |operation| Self::new(entity, *operation))
            })
            .collect()
    }

    fn verb(self) -> &'static str {
        match (self.operation, self.entity) {
            (
                Operation::Create,
                EntityKind::Plugin(_) | EntityKind::Credential | EntityKind::Acl,
            ) => "add",
            (Operation::Create, _) => "create",
            (Operation::Update, _) => "update",
            (Operation::Remove, _) => "remove",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.verb(), self.entity.slug())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| Error::unknown_action_kind(s))
    }
}

impl TryFrom<String> for ActionKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.to_string()
    }
}

/// HTTP method of an admin request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
