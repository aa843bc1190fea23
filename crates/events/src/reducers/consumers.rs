//! Consumers and everything scoped to them: plugins, credentials, ACLs.

use gantry_core::{params, EntityKind, Operation, PluginScope};
use im::Vector;

use super::{appended, map_by_id, records, without_id};
use crate::error::Result;
use crate::log::LogEntry;
use crate::parse::{parse_credential, parse_entity};
use crate::snapshot::{ConsumerState, CredentialRecord};

pub(crate) fn reduce(
    consumers: &Vector<ConsumerState>,
    entry: &LogEntry,
) -> Result<Vector<ConsumerState>> {
    let endpoint = &entry.action.endpoint;
    let kind = entry.action.kind;

    match (kind.entity, kind.operation) {
        (EntityKind::Consumer, Operation::Create) => {
            let record = parse_entity(EntityKind::Consumer, &entry.content)?;
            Ok(appended(consumers, ConsumerState::new(record)))
        }
        (EntityKind::Consumer, Operation::Update) => {
            let record = parse_entity(EntityKind::Consumer, &entry.content)?;
            map_by_id(consumers, endpoint.require(params::CONSUMER_ID)?, |consumer| {
                Ok(consumer.with_record(&record))
            })
        }
        (EntityKind::Consumer, Operation::Remove) => {
            Ok(without_id(consumers, endpoint.require(params::CONSUMER_ID)?))
        }
        (EntityKind::Plugin(PluginScope::Consumer), _) => {
            map_by_id(consumers, endpoint.require(params::CONSUMER_ID)?, |consumer| {
                Ok(ConsumerState {
                    plugins: records(&consumer.plugins, entry, params::PLUGIN_ID)?,
                    ..consumer.clone()
                })
            })
        }
        (EntityKind::Acl, _) => {
            map_by_id(consumers, endpoint.require(params::CONSUMER_ID)?, |consumer| {
                Ok(ConsumerState {
                    acls: records(&consumer.acls, entry, params::ACL_ID)?,
                    ..consumer.clone()
                })
            })
        }
        (EntityKind::Credential, _) => {
            map_by_id(consumers, endpoint.require(params::CONSUMER_ID)?, |consumer| {
                Ok(ConsumerState {
                    credentials: credentials(&consumer.credentials, entry)?,
                    ..consumer.clone()
                })
            })
        }
        _ => Ok(consumers.clone()),
    }
}

fn credentials(
    items: &Vector<CredentialRecord>,
    entry: &LogEntry,
) -> Result<Vector<CredentialRecord>> {
    let endpoint = &entry.action.endpoint;
    let plugin = endpoint.require(params::PLUGIN)?;

    match entry.action.kind.operation {
        Operation::Create => Ok(appended(items, parse_credential(plugin, &entry.content)?)),
        Operation::Update => {
            let newer = parse_credential(plugin, &entry.content)?;
            map_by_id(items, endpoint.require(params::CREDENTIAL_ID)?, |old| {
                Ok(CredentialRecord {
                    plugin: old.plugin.clone(),
                    record: old.record.merged(&newer.record),
                })
            })
        }
        Operation::Remove => Ok(without_id(
            items,
            endpoint.require(params::CREDENTIAL_ID)?,
        )),
    }
}
