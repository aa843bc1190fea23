//! Projected gateway state.
//!
//! Collections are persistent vectors, so deriving a new snapshot from an old
//! one shares structure and leaves the old one intact.

use gantry_core::Attributes;
use im::Vector;
use serde::{Deserialize, Serialize};

/// Gateway-assigned identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A live entity as reported by the admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "_info")]
    pub info: EntityInfo,
    /// Natural key: name, username, group or credential key.
    pub key: String,
    pub attributes: Attributes,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, key: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            info: EntityInfo {
                id: id.into(),
                created_at: None,
            },
            key: key.into(),
            attributes,
        }
    }

    /// Overlay a newer record, keeping fields the newer one omits.
    #[must_use]
    pub fn merged(&self, newer: &Self) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.extend(newer.attributes.clone());
        Self {
            info: EntityInfo {
                id: newer.info.id.clone(),
                created_at: newer.info.created_at.or(self.info.created_at),
            },
            key: if newer.key.is_empty() {
                self.key.clone()
            } else {
                newer.key.clone()
            },
            attributes,
        }
    }
}

/// Anything addressed by its gateway id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for EntityRecord {
    fn id(&self) -> &str {
        &self.info.id
    }
}

/// A consumer credential, tagged with the plugin that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub plugin: String,
    #[serde(flatten)]
    pub record: EntityRecord,
}

impl Identified for CredentialRecord {
    fn id(&self) -> &str {
        &self.record.info.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteState {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(default)]
    pub plugins: Vector<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(default)]
    pub routes: Vector<RouteState>,
    #[serde(default)]
    pub plugins: Vector<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiState {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(default)]
    pub plugins: Vector<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerState {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(default)]
    pub plugins: Vector<EntityRecord>,
    #[serde(default)]
    pub credentials: Vector<CredentialRecord>,
    #[serde(default)]
    pub acls: Vector<EntityRecord>,
}

macro_rules! leaf_state {
    ($ty:ident { $($field:ident),* }) => {
        impl $ty {
            /// Wrap a record with empty nested collections.
            pub fn new(record: EntityRecord) -> Self {
                Self {
                    record,
                    $($field: Vector::new(),)*
                }
            }

            /// Same entity with its record merged, nested collections kept.
            #[must_use]
            pub fn with_record(&self, newer: &EntityRecord) -> Self {
                Self {
                    record: self.record.merged(newer),
                    ..self.clone()
                }
            }
        }

        impl Identified for $ty {
            fn id(&self) -> &str {
                &self.record.info.id
            }
        }
    };
}

leaf_state!(RouteState { plugins });
leaf_state!(ServiceState { routes, plugins });
leaf_state!(ApiState { plugins });
leaf_state!(ConsumerState { plugins, credentials, acls });

/// Current gateway state reconstructed from an initial listing and the log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub services: Vector<ServiceState>,
    #[serde(default)]
    pub apis: Vector<ApiState>,
    #[serde(default)]
    pub consumers: Vector<ConsumerState>,
    /// Global plugins.
    #[serde(default)]
    pub plugins: Vector<EntityRecord>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceState> {
        self.services.iter().find(|s| s.record.key == name)
    }

    pub fn route(&self, service: &str, name: &str) -> Option<&RouteState> {
        self.service(service)
            .and_then(|s| s.routes.iter().find(|r| r.record.key == name))
    }

    pub fn api(&self, name: &str) -> Option<&ApiState> {
        self.apis.iter().find(|a| a.record.key == name)
    }

    pub fn consumer(&self, username: &str) -> Option<&ConsumerState> {
        self.consumers.iter().find(|c| c.record.key == username)
    }

    pub fn global_plugin(&self, name: &str) -> Option<&EntityRecord> {
        find_plugin(&self.plugins, name)
    }

    /// Total number of records, nested ones included.
    pub fn entity_count(&self) -> usize {
        let services = self.services.iter().map(|s| {
            let routes = s.routes.iter().map(|r| r.plugins.len().saturating_add(1));
            counted(routes.chain([s.plugins.len(), 1]))
        });
        let apis = self.apis.iter().map(|a| a.plugins.len().saturating_add(1));
        let consumers = self
            .consumers
            .iter()
            .map(|c| counted([c.plugins.len(), c.credentials.len(), c.acls.len(), 1]));
        counted(
            services
                .chain(apis)
                .chain(consumers)
                .chain([self.plugins.len()]),
        )
    }
}

fn counted(counts: impl IntoIterator<Item = usize>) -> usize {
    counts.into_iter().fold(0, usize::saturating_add)
}

/// Plugin with the given name in a collection.
pub fn find_plugin<'a>(plugins: &'a Vector<EntityRecord>, name: &str) -> Option<&'a EntityRecord> {
    plugins.iter().find(|p| p.key == name)
}
