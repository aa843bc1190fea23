//! Desired state declarations.
//!
//! A desired-state document lists the entities that should (or should not)
//! exist, keyed by natural identity. Gateway ids never appear here.

use gantry_core::{Attributes, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Desired lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    Present,
    Removed,
}

impl Ensure {
    /// Validate the raw `ensure` of `spec`; absent means present.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared `ensure` is neither `present` nor `removed`.
    pub fn of(entity: EntityKind, spec: &DesiredEntitySpec) -> Result<Self> {
        match spec.ensure.as_deref() {
            None | Some("present") => Ok(Self::Present),
            Some("removed") => Ok(Self::Removed),
            Some(other) => Err(Error::invalid_ensure(
                entity,
                spec.name.clone().unwrap_or_default(),
                other,
            )),
        }
    }
}

/// A nested collection of a desired entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Routes,
    Plugins,
    Credentials,
    Acls,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Routes => "routes",
            Self::Plugins => "plugins",
            Self::Credentials => "credentials",
            Self::Acls => "acls",
        }
    }
}

/// One desired entity and its nested children.
///
/// The identity field is `name` for services, routes, APIs and plugins,
/// `username` for consumers, `group` for ACL entries and the plugin name for
/// credentials. `ensure` is kept verbatim and validated by the differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredEntitySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<String>,
    #[serde(
        default,
        alias = "username",
        alias = "group",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<DesiredEntitySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<DesiredEntitySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<DesiredEntitySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acls: Vec<DesiredEntitySpec>,
}

impl DesiredEntitySpec {
    /// An entity with the given natural key and no attributes.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ensure(mut self, ensure: impl Into<String>) -> Self {
        self.ensure = Some(ensure.into());
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn route(mut self, route: Self) -> Self {
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: Self) -> Self {
        self.plugins.push(plugin);
        self
    }

    #[must_use]
    pub fn credential(mut self, credential: Self) -> Self {
        self.credentials.push(credential);
        self
    }

    #[must_use]
    pub fn acl(mut self, acl: Self) -> Self {
        self.acls.push(acl);
        self
    }

    /// Non-empty nested collections, in processing order.
    pub fn nested(&self) -> Vec<(Collection, &[Self])> {
        [
            (Collection::Routes, self.routes.as_slice()),
            (Collection::Plugins, self.plugins.as_slice()),
            (Collection::Credentials, self.credentials.as_slice()),
            (Collection::Acls, self.acls.as_slice()),
        ]
        .into_iter()
        .filter(|(_, specs)| !specs.is_empty())
        .collect()
    }
}

/// A whole desired-state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub services: Vec<DesiredEntitySpec>,
    #[serde(default)]
    pub apis: Vec<DesiredEntitySpec>,
    #[serde(default)]
    pub consumers: Vec<DesiredEntitySpec>,
    /// Global plugins.
    #[serde(default)]
    pub plugins: Vec<DesiredEntitySpec>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document (JSON is valid YAML).
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this shape.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| Error::invalid_document(e.to_string()))
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this shape.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| Error::invalid_document(e.to_string()))
    }

    /// Credential plugins named anywhere in the document.
    pub fn credential_plugins(&self) -> Vec<String> {
        let mut plugins: Vec<String> = self
            .consumers
            .iter()
            .flat_map(|consumer| consumer.credentials.iter())
            .filter_map(|credential| credential.name.clone())
            .collect();
        plugins.sort();
        plugins.dedup();
        plugins
    }

    /// Number of top-level entities.
    pub fn len(&self) -> usize {
        [&self.services, &self.apis, &self.consumers, &self.plugins]
            .iter()
            .map(|specs| specs.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn test_ensure_defaults_to_present() {
        let spec = DesiredEntitySpec::named("cors");
        assert_eq!(
            Ensure::of(EntityKind::Service, &spec).unwrap(),
            Ensure::Present
        );
    }

    #[test]
    fn test_ensure_rejects_unknown() {
        let spec = DesiredEntitySpec::named("not-working").ensure("not-valid");
        let err = Ensure::of(EntityKind::Service, &spec).unwrap_err();
        assert!(err.to_string().contains("Invalid ensure"));
    }

    #[test]
    fn test_parse_yaml_document() {
        let doc = DesiredState::from_yaml_str(
            r#"
services:
  - name: leads
    ensure: present
    attributes:
      url: http://leads.internal
    routes:
      - name: leads-root
        attributes:
          paths: ["/leads"]
    plugins:
      - name: cors
        attributes:
          config.origins: "*"
consumers:
  - username: ada
    attributes:
      custom_id: "42"
    credentials:
      - name: key-auth
        attributes:
          key: secret
    acls:
      - group: admins
"#,
        )
        .unwrap();

        let service = doc.services.first().unwrap();
        assert_eq!(service.name.as_deref(), Some("leads"));
        assert_eq!(service.routes.len(), 1);
        assert_eq!(
            service.plugins.first().unwrap().attributes.get("config.origins"),
            Some(&json!("*"))
        );

        let consumer = doc.consumers.first().unwrap();
        assert_eq!(consumer.name.as_deref(), Some("ada"));
        assert_eq!(consumer.acls.first().unwrap().name.as_deref(), Some("admins"));
        assert_eq!(doc.credential_plugins(), vec!["key-auth".to_string()]);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let spec = DesiredEntitySpec::named("svc")
            .attribute("url", "bar")
            .attribute("retries", 5)
            .attribute("connect_timeout", 1000);
        let keys: Vec<&String> = spec.attributes.keys().collect();
        assert_eq!(keys, ["url", "retries", "connect_timeout"]);
    }

    #[test]
    fn test_invalid_document() {
        let err = DesiredState::from_yaml_str("services: 12").unwrap_err();
        assert!(err.is_configuration());
    }
}
