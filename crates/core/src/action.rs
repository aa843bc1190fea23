//! Request descriptors handed to the transport.
//!
//! An [`Action`] names one mutating admin request without executing it. The
//! constructors in this module are the only place request bodies and
//! endpoint parameters are shaped, so the projector can rely on them when it
//! replays the log.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ActionKind, Attributes, EntityKind, Method, Operation, PluginScope};

/// Endpoint parameter keys.
pub mod params {
    pub const SERVICE_ID: &str = "serviceId";
    pub const ROUTE_ID: &str = "routeId";
    pub const API_ID: &str = "apiId";
    pub const CONSUMER_ID: &str = "consumerId";
    pub const PLUGIN_ID: &str = "pluginId";
    pub const PLUGIN: &str = "plugin";
    pub const CREDENTIAL_ID: &str = "credentialId";
    pub const ACL_ID: &str = "aclId";
}

macro_rules! endpoint_names {
    ($($variant:ident => $tag:literal),+ $(,)?) => {
        /// Named admin API endpoint, resolved to a URL by the router.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum EndpointName {
            $($variant,)+
        }

        impl EndpointName {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl FromStr for EndpointName {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(Error::unknown_endpoint(other)),
                }
            }
        }
    };
}

endpoint_names! {
    Services => "services",
    Service => "service",
    ServicePlugins => "service-plugins",
    ServicePlugin => "service-plugin",
    ServiceRoutes => "service-routes",
    Routes => "routes",
    Route => "route",
    RoutePlugins => "route-plugins",
    RoutePlugin => "route-plugin",
    Apis => "apis",
    Api => "api",
    ApiPlugins => "api-plugins",
    ApiPlugin => "api-plugin",
    Consumers => "consumers",
    Consumer => "consumer",
    ConsumerPlugins => "consumer-plugins",
    ConsumerPlugin => "consumer-plugin",
    ConsumerCredentials => "consumer-credentials",
    ConsumerCredential => "consumer-credential",
    ConsumerAcls => "consumer-acls",
    ConsumerAcl => "consumer-acl",
    Plugins => "plugins",
    Plugin => "plugin",
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EndpointName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EndpointName> for String {
    fn from(name: EndpointName) -> Self {
        name.as_str().to_string()
    }
}

/// Endpoint name plus the parameters its URL template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: EndpointName,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Endpoint {
    pub const fn new(name: EndpointName) -> Self {
        Self {
            name,
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Look up a parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Look up a parameter the URL template cannot do without.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the missing parameter.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.param(key)
            .ok_or_else(|| Error::missing_endpoint_param(self.name.as_str(), key))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let rendered: Vec<String> = self
                .params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, "({})", rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Resolved owner of a plugin: the scope and, unless global, the owner's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginParent {
    Global,
    Service(String),
    Route(String),
    Api(String),
    Consumer(String),
}

impl PluginParent {
    pub const fn scope(&self) -> PluginScope {
        match self {
            Self::Global => PluginScope::Global,
            Self::Service(_) => PluginScope::Service,
            Self::Route(_) => PluginScope::Route,
            Self::Api(_) => PluginScope::Api,
            Self::Consumer(_) => PluginScope::Consumer,
        }
    }

    /// Parameter key and value identifying the owner.
    fn param(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Global => None,
            Self::Service(id) => Some((params::SERVICE_ID, id)),
            Self::Route(id) => Some((params::ROUTE_ID, id)),
            Self::Api(id) => Some((params::API_ID, id)),
            Self::Consumer(id) => Some((params::CONSUMER_ID, id)),
        }
    }

    fn endpoint(&self, collection: bool) -> Endpoint {
        let name = match (self.scope(), collection) {
            (PluginScope::Global, true) => EndpointName::Plugins,
            (PluginScope::Global, false) => EndpointName::Plugin,
            (PluginScope::Service, true) => EndpointName::ServicePlugins,
            (PluginScope::Service, false) => EndpointName::ServicePlugin,
            (PluginScope::Route, true) => EndpointName::RoutePlugins,
            (PluginScope::Route, false) => EndpointName::RoutePlugin,
            (PluginScope::Api, true) => EndpointName::ApiPlugins,
            (PluginScope::Api, false) => EndpointName::ApiPlugin,
            (PluginScope::Consumer, true) => EndpointName::ConsumerPlugins,
            (PluginScope::Consumer, false) => EndpointName::ConsumerPlugin,
        };
        match self.param() {
            Some((key, id)) => Endpoint::new(name).with(key, id),
            None => Endpoint::new(name),
        }
    }
}

/// One mutating admin request, not yet executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub endpoint: Endpoint,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Attributes>,
}

impl Action {
    fn new(
        entity: EntityKind,
        operation: Operation,
        endpoint: Endpoint,
        body: Option<Attributes>,
    ) -> Self {
        let method = match operation {
            Operation::Create => Method::Post,
            Operation::Update => Method::Patch,
            Operation::Remove => Method::Delete,
        };
        Self {
            kind: ActionKind::new(entity, operation),
            endpoint,
            method,
            body,
        }
    }

    /// Short description for logs, e.g. `POST add-service-plugin service-plugins(serviceId=..)`.
    pub fn description(&self) -> String {
        format!("{} {} {}", self.method, self.kind, self.endpoint)
    }

    /// Id of the entity an update or removal addresses.
    pub fn target_id(&self) -> Option<&str> {
        let key = match self.kind.entity {
            EntityKind::Service => params::SERVICE_ID,
            EntityKind::Route => params::ROUTE_ID,
            EntityKind::Api => params::API_ID,
            EntityKind::Consumer => params::CONSUMER_ID,
            EntityKind::Plugin(_) => params::PLUGIN_ID,
            EntityKind::Credential => params::CREDENTIAL_ID,
            EntityKind::Acl => params::ACL_ID,
        };
        match self.kind.operation {
            Operation::Create => None,
            Operation::Update | Operation::Remove => self.endpoint.param(key),
        }
    }

    pub fn create_service(name: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Service,
            Operation::Create,
            Endpoint::new(EndpointName::Services),
            Some(with_identity(attributes, "name", name)),
        )
    }

    pub fn update_service(service_id: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Service,
            Operation::Update,
            Endpoint::new(EndpointName::Service).with(params::SERVICE_ID, service_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_service(service_id: &str) -> Self {
        Self::new(
            EntityKind::Service,
            Operation::Remove,
            Endpoint::new(EndpointName::Service).with(params::SERVICE_ID, service_id),
            None,
        )
    }

    /// Routes may be created without a name; the body is then the declared
    /// attributes alone.
    pub fn create_route(service_id: &str, name: Option<&str>, attributes: &Attributes) -> Self {
        let body = name.map_or_else(
            || attributes.clone(),
            |name| with_identity(attributes, "name", name),
        );
        Self::new(
            EntityKind::Route,
            Operation::Create,
            Endpoint::new(EndpointName::ServiceRoutes).with(params::SERVICE_ID, service_id),
            Some(body),
        )
    }

    pub fn update_route(route_id: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Route,
            Operation::Update,
            Endpoint::new(EndpointName::Route).with(params::ROUTE_ID, route_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_route(route_id: &str) -> Self {
        Self::new(
            EntityKind::Route,
            Operation::Remove,
            Endpoint::new(EndpointName::Route).with(params::ROUTE_ID, route_id),
            None,
        )
    }

    pub fn create_api(name: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Api,
            Operation::Create,
            Endpoint::new(EndpointName::Apis),
            Some(with_identity(attributes, "name", name)),
        )
    }

    pub fn update_api(api_id: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Api,
            Operation::Update,
            Endpoint::new(EndpointName::Api).with(params::API_ID, api_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_api(api_id: &str) -> Self {
        Self::new(
            EntityKind::Api,
            Operation::Remove,
            Endpoint::new(EndpointName::Api).with(params::API_ID, api_id),
            None,
        )
    }

    pub fn create_consumer(username: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Consumer,
            Operation::Create,
            Endpoint::new(EndpointName::Consumers),
            Some(with_identity(attributes, "username", username)),
        )
    }

    pub fn update_consumer(consumer_id: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Consumer,
            Operation::Update,
            Endpoint::new(EndpointName::Consumer).with(params::CONSUMER_ID, consumer_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_consumer(consumer_id: &str) -> Self {
        Self::new(
            EntityKind::Consumer,
            Operation::Remove,
            Endpoint::new(EndpointName::Consumer).with(params::CONSUMER_ID, consumer_id),
            None,
        )
    }

    pub fn add_plugin(parent: &PluginParent, name: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Plugin(parent.scope()),
            Operation::Create,
            parent.endpoint(true),
            Some(with_identity(attributes, "name", name)),
        )
    }

    pub fn update_plugin(parent: &PluginParent, plugin_id: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Plugin(parent.scope()),
            Operation::Update,
            parent.endpoint(false).with(params::PLUGIN_ID, plugin_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_plugin(parent: &PluginParent, plugin_id: &str) -> Self {
        Self::new(
            EntityKind::Plugin(parent.scope()),
            Operation::Remove,
            parent.endpoint(false).with(params::PLUGIN_ID, plugin_id),
            None,
        )
    }

    pub fn add_credential(consumer_id: &str, plugin: &str, attributes: &Attributes) -> Self {
        Self::new(
            EntityKind::Credential,
            Operation::Create,
            Endpoint::new(EndpointName::ConsumerCredentials)
                .with(params::CONSUMER_ID, consumer_id)
                .with(params::PLUGIN, plugin),
            Some(attributes.clone()),
        )
    }

    pub fn update_credential(
        consumer_id: &str,
        plugin: &str,
        credential_id: &str,
        attributes: &Attributes,
    ) -> Self {
        Self::new(
            EntityKind::Credential,
            Operation::Update,
            credential_endpoint(consumer_id, plugin, credential_id),
            Some(attributes.clone()),
        )
    }

    pub fn remove_credential(consumer_id: &str, plugin: &str, credential_id: &str) -> Self {
        Self::new(
            EntityKind::Credential,
            Operation::Remove,
            credential_endpoint(consumer_id, plugin, credential_id),
            None,
        )
    }

    pub fn add_acl(consumer_id: &str, group: &str) -> Self {
        let mut body = Attributes::new();
        body.insert("group".to_string(), group.into());
        Self::new(
            EntityKind::Acl,
            Operation::Create,
            Endpoint::new(EndpointName::ConsumerAcls).with(params::CONSUMER_ID, consumer_id),
            Some(body),
        )
    }

    pub fn remove_acl(consumer_id: &str, acl_id: &str) -> Self {
        Self::new(
            EntityKind::Acl,
            Operation::Remove,
            Endpoint::new(EndpointName::ConsumerAcl)
                .with(params::CONSUMER_ID, consumer_id)
                .with(params::ACL_ID, acl_id),
            None,
        )
    }
}

fn credential_endpoint(consumer_id: &str, plugin: &str, credential_id: &str) -> Endpoint {
    Endpoint::new(EndpointName::ConsumerCredential)
        .with(params::CONSUMER_ID, consumer_id)
        .with(params::PLUGIN, plugin)
        .with(params::CREDENTIAL_ID, credential_id)
}

/// Declared attributes followed by the identity field.
fn with_identity(attributes: &Attributes, field: &str, value: &str) -> Attributes {
    let mut body = attributes.clone();
    body.insert(field.to_string(), value.into());
    body
}
