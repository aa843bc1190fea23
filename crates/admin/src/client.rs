//! Admin API client.
//!
//! [`AdminClient`] turns [`Action`]s into HTTP requests and implements the
//! reconciler's [`Transport`], so a reconciliation run can drive a live
//! gateway.

use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::{Action, Attributes, Method};
use gantry_reconciler::Transport;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::AdminConfig;
use crate::error::{Error, Result};
use crate::router::Router;

/// Client for the gateway admin API.
#[derive(Debug, Clone)]
pub struct AdminClient {
    /// Configuration for the client.
    config: Arc<AdminConfig>,
    /// Endpoint resolution against the configured root.
    router: Router,
    /// HTTP client.
    http_client: reqwest::Client,
}

impl AdminClient {
    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header is invalid or the HTTP client
    /// cannot be built.
    pub fn with_config(config: AdminConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers(&config)?)
            .build()?;

        Ok(Self {
            router: Router::new(config.base_url.clone()),
            config: Arc::new(config),
            http_client,
        })
    }

    /// Create a client for the admin API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_url(base_url: Url) -> Result<Self> {
        Self::with_config(AdminConfig::new(base_url))
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Send `action` and return the parsed response body.
    ///
    /// Dotted attribute keys (`config.foo`) are sent as nested objects. An
    /// empty body, such as a 204 for a deletion, yields `Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the gateway answers with a
    /// non-success status, or the body is not JSON.
    pub async fn send(&self, action: &Action) -> Result<Value> {
        let url = self.router.url(&action.endpoint)?;
        debug!(method = %action.method, %url, "Sending admin request");

        let mut request = self.http_client.request(http_method(action.method), url);
        if let Some(body) = &action.body {
            request = request.json(&expand_dotted(body));
        }
        read_body(request.send().await?).await
    }

    /// GET an arbitrary admin API URL.
    pub(crate) async fn get(&self, url: Url) -> Result<Value> {
        debug!(%url, "Listing");
        read_body(self.http_client.get(url).send().await?).await
    }
}

#[async_trait]
impl Transport for AdminClient {
    async fn execute(&self, action: &Action) -> gantry_reconciler::Result<Value> {
        self.send(action)
            .await
            .map_err(|e| gantry_reconciler::Error::transport(action.clone(), e.to_string()))
    }
}

async fn read_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(Error::status(status.as_u16(), body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| Error::invalid_response(e.to_string()))
}

fn default_headers(config: &AdminConfig) -> Result<HeaderMap> {
    config
        .headers
        .iter()
        .map(|(name, value)| {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config_error(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config_error(format!("invalid value for {name}: {e}")))?;
            Ok((name, value))
        })
        .collect()
}

const fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Nest dotted keys: `{"config.foo": 1}` becomes `{"config": {"foo": 1}}`.
/// Keys without a dot are kept as they are.
pub fn expand_dotted(attributes: &Attributes) -> Value {
    let mut expanded = Map::new();
    for (key, value) in attributes {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut expanded, &segments, value.clone());
    }
    Value::Object(expanded)
}

fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let slot = target
                .entry((*first).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(nested) = slot {
                insert_path(nested, rest, value);
            }
        }
    }
}
