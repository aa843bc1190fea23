//! Endpoint names to admin API URLs.

use gantry_core::{params, Endpoint, EndpointName};
use url::Url;

use crate::error::Result;

/// Resolves named endpoints against the admin API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    root: Url,
}

impl Router {
    pub fn new(root: Url) -> Self {
        Self { root }
    }

    pub const fn root(&self) -> &Url {
        &self.root
    }

    /// Absolute URL of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if a path parameter is missing or the joined URL is invalid.
    pub fn url(&self, endpoint: &Endpoint) -> Result<Url> {
        self.join(&path(endpoint)?)
    }

    /// Resolve a path or absolute URL returned by the admin API, such as a
    /// pagination cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference cannot be joined to the base URL.
    pub fn join(&self, reference: &str) -> Result<Url> {
        let base = self.root.as_str().trim_end_matches('/');
        if reference.starts_with('/') {
            Ok(Url::parse(&format!("{base}{reference}"))?)
        } else {
            Ok(self.root.join(reference)?)
        }
    }
}

/// URL path of `endpoint`, relative to the admin API root.
///
/// # Errors
///
/// Returns an error if the endpoint lacks one of its path parameters.
pub fn path(endpoint: &Endpoint) -> Result<String> {
    let param = |key: &str| endpoint.require(key);

    let path = match endpoint.name {
        EndpointName::Services => "/services".to_string(),
        EndpointName::Service => format!("/services/{}", param(params::SERVICE_ID)?),
        EndpointName::ServicePlugins => {
            format!("/services/{}/plugins", param(params::SERVICE_ID)?)
        }
        EndpointName::ServicePlugin => format!(
            "/services/{}/plugins/{}",
            param(params::SERVICE_ID)?,
            param(params::PLUGIN_ID)?
        ),
        EndpointName::ServiceRoutes => {
            format!("/services/{}/routes", param(params::SERVICE_ID)?)
        }
        EndpointName::Routes => "/routes".to_string(),
        EndpointName::Route => format!("/routes/{}", param(params::ROUTE_ID)?),
        EndpointName::RoutePlugins => format!("/routes/{}/plugins", param(params::ROUTE_ID)?),
        EndpointName::RoutePlugin => format!(
            "/routes/{}/plugins/{}",
            param(params::ROUTE_ID)?,
            param(params::PLUGIN_ID)?
        ),
        EndpointName::Apis => "/apis".to_string(),
        EndpointName::Api => format!("/apis/{}", param(params::API_ID)?),
        EndpointName::ApiPlugins => format!("/apis/{}/plugins", param(params::API_ID)?),
        EndpointName::ApiPlugin => format!(
            "/apis/{}/plugins/{}",
            param(params::API_ID)?,
            param(params::PLUGIN_ID)?
        ),
        EndpointName::Consumers => "/consumers".to_string(),
        EndpointName::Consumer => format!("/consumers/{}", param(params::CONSUMER_ID)?),
        EndpointName::ConsumerPlugins => {
            format!("/consumers/{}/plugins", param(params::CONSUMER_ID)?)
        }
        EndpointName::ConsumerPlugin => format!(
            "/consumers/{}/plugins/{}",
            param(params::CONSUMER_ID)?,
            param(params::PLUGIN_ID)?
        ),
        EndpointName::ConsumerCredentials => format!(
            "/consumers/{}/{}",
            param(params::CONSUMER_ID)?,
            param(params::PLUGIN)?
        ),
        EndpointName::ConsumerCredential => format!(
            "/consumers/{}/{}/{}",
            param(params::CONSUMER_ID)?,
            param(params::PLUGIN)?,
            param(params::CREDENTIAL_ID)?
        ),
        EndpointName::ConsumerAcls => format!("/consumers/{}/acls", param(params::CONSUMER_ID)?),
        EndpointName::ConsumerAcl => format!(
            "/consumers/{}/acls/{}",
            param(params::CONSUMER_ID)?,
            param(params::ACL_ID)?
        ),
        EndpointName::Plugins => "/plugins".to_string(),
        EndpointName::Plugin => format!("/plugins/{}", param(params::PLUGIN_ID)?),
    };
    Ok(path)
}
