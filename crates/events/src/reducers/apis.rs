use gantry_core::{params, EntityKind, Operation, PluginScope};
use im::Vector;

use super::{appended, map_by_id, records, without_id};
use crate::error::Result;
use crate::log::LogEntry;
use crate::parse::parse_entity;
use crate::snapshot::ApiState;

pub(crate) fn reduce(apis: &Vector<ApiState>, entry: &LogEntry) -> Result<Vector<ApiState>> {
    let endpoint = &entry.action.endpoint;
    let kind = entry.action.kind;

    match (kind.entity, kind.operation) {
        (EntityKind::Api, Operation::Create) => {
            let record = parse_entity(EntityKind::Api, &entry.content)?;
            Ok(appended(apis, ApiState::new(record)))
        }
        (EntityKind::Api, Operation::Update) => {
            let record = parse_entity(EntityKind::Api, &entry.content)?;
            map_by_id(apis, endpoint.require(params::API_ID)?, |api| {
                Ok(api.with_record(&record))
            })
        }
        (EntityKind::Api, Operation::Remove) => {
            Ok(without_id(apis, endpoint.require(params::API_ID)?))
        }
        (EntityKind::Plugin(PluginScope::Api), _) => {
            map_by_id(apis, endpoint.require(params::API_ID)?, |api| {
                Ok(ApiState {
                    plugins: records(&api.plugins, entry, params::PLUGIN_ID)?,
                    ..api.clone()
                })
            })
        }
        _ => Ok(apis.clone()),
    }
}
