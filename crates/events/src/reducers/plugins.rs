use gantry_core::{params, EntityKind, PluginScope};
use im::Vector;

use super::records;
use crate::error::Result;
use crate::log::LogEntry;
use crate::snapshot::EntityRecord;

/// Global plugins.
pub(crate) fn reduce(
    plugins: &Vector<EntityRecord>,
    entry: &LogEntry,
) -> Result<Vector<EntityRecord>> {
    match entry.action.kind.entity {
        EntityKind::Plugin(PluginScope::Global) => records(plugins, entry, params::PLUGIN_ID),
        _ => Ok(plugins.clone()),
    }
}
