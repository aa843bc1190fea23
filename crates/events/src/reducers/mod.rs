//! Per-entity reducers.
//!
//! Each reducer takes a collection and a response entry and returns the next
//! collection. Inputs are never modified.

pub(crate) mod apis;
pub(crate) mod consumers;
pub(crate) mod plugins;
pub(crate) mod services;

use gantry_core::Operation;
use im::Vector;

use crate::error::Result;
use crate::log::LogEntry;
use crate::parse::parse_entity;
use crate::snapshot::{EntityRecord, Identified};

pub(crate) fn appended<T: Clone>(items: &Vector<T>, item: T) -> Vector<T> {
    let mut next = items.clone();
    next.push_back(item);
    next
}

/// Rebuild `items`, passing the ones whose id is `id` through `f`.
pub(crate) fn map_by_id<T, F>(items: &Vector<T>, id: &str, f: F) -> Result<Vector<T>>
where
    T: Identified + Clone,
    F: Fn(&T) -> Result<T>,
{
    items
        .iter()
        .map(|item| {
            if item.id() == id {
                f(item)
            } else {
                Ok(item.clone())
            }
        })
        .collect()
}

pub(crate) fn without_id<T: Identified + Clone>(items: &Vector<T>, id: &str) -> Vector<T> {
    items.iter().filter(|item| item.id() != id).cloned().collect()
}

/// Create, update or remove a plain record collection. `id_param` names the
/// endpoint parameter carrying the target id for updates and removals.
pub(crate) fn records(
    items: &Vector<EntityRecord>,
    entry: &LogEntry,
    id_param: &str,
) -> Result<Vector<EntityRecord>> {
    let kind = entry.action.kind;
    match kind.operation {
        Operation::Create => Ok(appended(items, parse_entity(kind.entity, &entry.content)?)),
        Operation::Update => {
            let newer = parse_entity(kind.entity, &entry.content)?;
            let target = entry.action.endpoint.require(id_param)?;
            map_by_id(items, target, |old| Ok(old.merged(&newer)))
        }
        Operation::Remove => Ok(without_id(items, entry.action.endpoint.require(id_param)?)),
    }
}
