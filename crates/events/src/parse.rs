//! Admin API response bodies to entity records.

use gantry_core::{credential_identity_field, Attributes, EntityKind};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::snapshot::{CredentialRecord, EntityRecord, EntityInfo};

/// Fields lifted out of the attribute map into [`EntityInfo`].
const INFO_FIELDS: [&str; 2] = ["id", "created_at"];

/// Field holding the natural key of an entity kind.
pub const fn key_field(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Service | EntityKind::Route | EntityKind::Api | EntityKind::Plugin(_) => {
            Some("name")
        }
        EntityKind::Consumer => Some("username"),
        EntityKind::Acl => Some("group"),
        EntityKind::Credential => None,
    }
}

/// Parse a response body for `kind`.
///
/// The natural key field stays in the attributes as well; only `id` and
/// `created_at` are moved into the record's info.
///
/// # Errors
///
/// Returns an error if the content is not an object or lacks its id or natural key.
pub fn parse_entity(kind: EntityKind, content: &Value) -> Result<EntityRecord> {
    let object = content
        .as_object()
        .ok_or_else(|| Error::parse(kind.slug(), "expected a JSON object"))?;

    let id = match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(Error::parse(kind.slug(), "missing \"id\"")),
    };

    let key = key_field(kind)
        .and_then(|field| object.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let attributes: Attributes = object
        .iter()
        .filter(|(field, _)| !INFO_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    Ok(EntityRecord {
        info: EntityInfo {
            id,
            created_at: object.get("created_at").and_then(Value::as_i64),
        },
        key,
        attributes,
    })
}

/// Parse a credential body; its key is the plugin's identifying attribute,
/// falling back to the id.
///
/// # Errors
///
/// Returns an error if the content is not an object or lacks its id or identifying field.
pub fn parse_credential(plugin: &str, content: &Value) -> Result<CredentialRecord> {
    let mut record = parse_entity(EntityKind::Credential, content)?;
    record.key = credential_identity_field(plugin)
        .and_then(|field| record.attributes.get(field))
        .and_then(Value::as_str)
        .map_or_else(|| record.info.id.clone(), str::to_string);
    Ok(CredentialRecord {
        plugin: plugin.to_string(),
        record,
    })
}
