//! Listing the gateway's current configuration as a snapshot.

use std::collections::HashSet;

use gantry_core::{params, Endpoint, EndpointName, EntityKind, PluginScope};
use gantry_events::{
    parse_credential, parse_entity, ApiState, ConsumerState, Identified, RouteState,
    ServiceState, StateSnapshot,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::AdminClient;
use crate::error::{Error, Result};

impl AdminClient {
    /// Every item of a paginated collection, following `next` links.
    ///
    /// A collection the gateway does not know (404) is listed as empty.
    /// Listing stops at a `next` link that was already visited.
    ///
    /// # Errors
    ///
    /// Returns an error if a page request fails or a page is not a listing.
    pub async fn list(&self, endpoint: &Endpoint) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(self.router().url(endpoint)?);

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                debug!(%endpoint, %url, "Pagination cursor repeats, stopping");
                break;
            }
            let page = match self.get(url).await {
                Ok(page) => page,
                Err(e) if e.is_not_found() => {
                    debug!(%endpoint, "Collection not available, treating as empty");
                    return Ok(items);
                }
                Err(e) => return Err(e),
            };

            let data = page
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::invalid_response(format!("{endpoint}: missing \"data\"")))?;
            items.extend(data.iter().cloned());

            next = match page.get("next").and_then(Value::as_str) {
                Some(cursor) if !cursor.is_empty() => Some(self.router().join(cursor)?),
                _ => None,
            };
        }
        Ok(items)
    }

    /// Snapshot of services, routes, APIs, consumers and plugins, with the
    /// ACLs of every consumer and its credentials for `credential_plugins`.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing fails or a listed entity cannot be parsed.
    pub async fn fetch_state(&self, credential_plugins: &[String]) -> Result<StateSnapshot> {
        let services = self.list(&Endpoint::new(EndpointName::Services)).await?;
        let routes = self.list(&Endpoint::new(EndpointName::Routes)).await?;
        let apis = self.list(&Endpoint::new(EndpointName::Apis)).await?;
        let consumers = self.list(&Endpoint::new(EndpointName::Consumers)).await?;
        let plugins = self.list(&Endpoint::new(EndpointName::Plugins)).await?;

        let mut state = StateSnapshot::new();
        for item in &services {
            state
                .services
                .push_back(ServiceState::new(parse_entity(EntityKind::Service, item)?));
        }
        for item in &routes {
            attach_route(&mut state, item)?;
        }
        for item in &apis {
            state
                .apis
                .push_back(ApiState::new(parse_entity(EntityKind::Api, item)?));
        }
        for item in &consumers {
            let consumer = ConsumerState::new(parse_entity(EntityKind::Consumer, item)?);
            state
                .consumers
                .push_back(self.consumer_children(consumer, credential_plugins).await?);
        }
        for item in &plugins {
            attach_plugin(&mut state, item)?;
        }

        info!(entities = state.entity_count(), "Fetched gateway state");
        Ok(state)
    }

    async fn consumer_children(
        &self,
        mut consumer: ConsumerState,
        credential_plugins: &[String],
    ) -> Result<ConsumerState> {
        let consumer_id = consumer.id().to_string();

        let acls =
            Endpoint::new(EndpointName::ConsumerAcls).with(params::CONSUMER_ID, &consumer_id);
        for item in self.list(&acls).await? {
            consumer.acls.push_back(parse_entity(EntityKind::Acl, &item)?);
        }

        for plugin in credential_plugins {
            let endpoint = Endpoint::new(EndpointName::ConsumerCredentials)
                .with(params::CONSUMER_ID, &consumer_id)
                .with(params::PLUGIN, plugin);
            for item in self.list(&endpoint).await? {
                consumer
                    .credentials
                    .push_back(parse_credential(plugin, &item)?);
            }
        }
        Ok(consumer)
    }
}

/// Id of the entity `item` references through `field`, either as
/// `{"field": {"id": ..}}` or as a flat `field_id`.
pub fn reference(item: &Value, field: &str) -> Option<String> {
    let nested = item.get(field).and_then(|owner| owner.get("id"));
    let flat = item.get(format!("{field}_id").as_str());
    nested.or(flat).and_then(|id| match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

fn attach_route(state: &mut StateSnapshot, item: &Value) -> Result<()> {
    let route = RouteState::new(parse_entity(EntityKind::Route, item)?);
    let Some(service_id) = reference(item, "service") else {
        debug!(route = %route.id(), "Skipping route without a service");
        return Ok(());
    };
    match state.services.iter_mut().find(|s| s.id() == service_id) {
        Some(service) => service.routes.push_back(route),
        None => debug!(route = %route.id(), "Skipping route of an unknown service"),
    }
    Ok(())
}

/// Attach a plugin to its most specific owner: route, service, API,
/// consumer, else global.
fn attach_plugin(state: &mut StateSnapshot, item: &Value) -> Result<()> {
    let record = parse_entity(EntityKind::Plugin(PluginScope::Global), item)?;

    if let Some(route_id) = reference(item, "route") {
        let route = state
            .services
            .iter_mut()
            .flat_map(|service| service.routes.iter_mut())
            .find(|route| route.id() == route_id);
        if let Some(route) = route {
            route.plugins.push_back(record);
        } else {
            debug!(plugin = %record.id(), "Skipping plugin of an unknown route");
        }
        return Ok(());
    }
    if let Some(service_id) = reference(item, "service") {
        match state.services.iter_mut().find(|s| s.id() == service_id) {
            Some(service) => service.plugins.push_back(record),
            None => debug!(plugin = %record.id(), "Skipping plugin of an unknown service"),
        }
        return Ok(());
    }
    if let Some(api_id) = reference(item, "api") {
        match state.apis.iter_mut().find(|a| a.id() == api_id) {
            Some(api) => api.plugins.push_back(record),
            None => debug!(plugin = %record.id(), "Skipping plugin of an unknown API"),
        }
        return Ok(());
    }
    if let Some(consumer_id) = reference(item, "consumer") {
        match state.consumers.iter_mut().find(|c| c.id() == consumer_id) {
            Some(consumer) => consumer.plugins.push_back(record),
            None => debug!(plugin = %record.id(), "Skipping plugin of an unknown consumer"),
        }
        return Ok(());
    }
    state.plugins.push_back(record);
    Ok(())
}
