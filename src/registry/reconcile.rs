//! Join of the persisted watch list against the live host enumeration.

use crate::registry::model::{LiveResource, MonitoredEntry, WatchEntry};

/// Produces the monitored view: one entry per live resource that has a
/// case-insensitive match in the watch list. Unwatched live resources are dropped,
/// and watch entries without a live counterpart are dropped from the view but never
/// from the persisted list — a resource being temporarily absent from the host is
/// not the same as the operator removing interest in it.
pub fn join(watch: &[WatchEntry], live: Vec<LiveResource>) -> Vec<MonitoredEntry> {
    live.into_iter()
        .filter_map(|resource| {
            watch
                .iter()
                .find(|entry| entry.matches(&resource.identity))
                .map(|entry| MonitoredEntry::merge(resource, entry))
        })
        .collect()
}
