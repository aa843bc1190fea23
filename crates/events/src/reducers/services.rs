//! Services, their routes, and the plugins attached to either.

use gantry_core::{params, EntityKind, Operation, PluginScope};
use im::Vector;

use super::{appended, map_by_id, records, without_id};
use crate::error::Result;
use crate::log::LogEntry;
use crate::parse::parse_entity;
use crate::snapshot::{RouteState, ServiceState};

pub(crate) fn reduce(services: &Vector<ServiceState>, entry: &LogEntry) -> Result<Vector<ServiceState>> {
    let endpoint = &entry.action.endpoint;
    let kind = entry.action.kind;

    match (kind.entity, kind.operation) {
        (EntityKind::Service, Operation::Create) => {
            let record = parse_entity(EntityKind::Service, &entry.content)?;
            Ok(appended(services, ServiceState::new(record)))
        }
        (EntityKind::Service, Operation::Update) => {
            let record = parse_entity(EntityKind::Service, &entry.content)?;
            map_by_id(services, endpoint.require(params::SERVICE_ID)?, |service| {
                Ok(service.with_record(&record))
            })
        }
        (EntityKind::Service, Operation::Remove) => {
            Ok(without_id(services, endpoint.require(params::SERVICE_ID)?))
        }
        (EntityKind::Plugin(PluginScope::Service), _) => {
            map_by_id(services, endpoint.require(params::SERVICE_ID)?, |service| {
                Ok(ServiceState {
                    plugins: records(&service.plugins, entry, params::PLUGIN_ID)?,
                    ..service.clone()
                })
            })
        }
        (EntityKind::Route, Operation::Create) => {
            let route = RouteState::new(parse_entity(EntityKind::Route, &entry.content)?);
            map_by_id(services, endpoint.require(params::SERVICE_ID)?, |service| {
                Ok(ServiceState {
                    routes: appended(&service.routes, route.clone()),
                    ..service.clone()
                })
            })
        }
        // Route requests carry only the route id, so every service is visited.
        (EntityKind::Route | EntityKind::Plugin(PluginScope::Route), _) => services
            .iter()
            .map(|service| {
                Ok(ServiceState {
                    routes: reduce_routes(&service.routes, entry)?,
                    ..service.clone()
                })
            })
            .collect(),
        _ => Ok(services.clone()),
    }
}

fn reduce_routes(routes: &Vector<RouteState>, entry: &LogEntry) -> Result<Vector<RouteState>> {
    let endpoint = &entry.action.endpoint;
    let kind = entry.action.kind;

    match (kind.entity, kind.operation) {
        (EntityKind::Route, Operation::Update) => {
            let record = parse_entity(EntityKind::Route, &entry.content)?;
            map_by_id(routes, endpoint.require(params::ROUTE_ID)?, |route| {
                Ok(route.with_record(&record))
            })
        }
        (EntityKind::Route, Operation::Remove) => {
            Ok(without_id(routes, endpoint.require(params::ROUTE_ID)?))
        }
        (EntityKind::Plugin(PluginScope::Route), _) => {
            map_by_id(routes, endpoint.require(params::ROUTE_ID)?, |route| {
                Ok(RouteState {
                    plugins: records(&route.plugins, entry, params::PLUGIN_ID)?,
                    ..route.clone()
                })
            })
        }
        _ => Ok(routes.clone()),
    }
}
