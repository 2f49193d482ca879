// src/core/topology.rs

//! The in-memory model of the current primary plus per-node status, and the
//! diff used to drive change notifications.

use std::collections::BTreeMap;

use crate::core::node::Status;

/// The orchestrator's authoritative view of the cluster until the next tick
/// replaces it. Invariant: at most one primary; any `Broken` node is not
/// the primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub primary: Option<String>,
    pub statuses: BTreeMap<String, Status>,
}

impl TopologySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the recognized-node set from the proxy's view (used only at
    /// startup and whenever a node is removed from the proxy).
    pub fn rebuild_from_proxy(&mut self, recognized: &BTreeMap<String, Status>) {
        let gone: Vec<String> = self
            .statuses
            .keys()
            .filter(|host| !recognized.contains_key(host.as_str()))
            .cloned()
            .collect();
        for host in gone {
            self.drop_node(&host);
        }
        for (host, status) in recognized {
            self.statuses.entry(host.clone()).or_insert(*status);
        }
    }

    pub fn mark(&mut self, hostname: &str, status: Status) {
        self.statuses.insert(hostname.to_string(), status);
    }

    pub fn set_primary(&mut self, hostname: Option<String>) {
        self.primary = hostname;
    }

    pub fn drop_node(&mut self, hostname: &str) {
        self.statuses.remove(hostname);
        if self.primary.as_deref() == Some(hostname) {
            self.primary = None;
        }
    }
}

/// The delta between two snapshots, used to decide whether a change
/// notification is due.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub primary_change: Option<(Option<String>, Option<String>)>,
    pub status_changes: Vec<(String, Option<Status>, Status)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.primary_change.is_none() && self.status_changes.is_empty()
    }
}

/// Compares `old` against `new` and reports what changed. Never performs I/O.
///
/// A node absent from `old` (first time it is ever tracked, e.g. freshly
/// discovered at startup) is not reported as a status change: there is
/// nothing to change *from*. The same holds for the primary: adopting the
/// proxy's existing writer when no primary was previously recorded is
/// discovery, not a change.
pub fn diff(old: &TopologySnapshot, new: &TopologySnapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    if old.primary.is_some() && old.primary != new.primary {
        changes.primary_change = Some((old.primary.clone(), new.primary.clone()));
    }

    for (host, new_status) in &new.statuses {
        if let Some(old_status) = old.statuses.get(host) {
            if old_status != new_status {
                changes
                    .status_changes
                    .push((host.clone(), Some(*old_status), *new_status));
            }
        }
    }

    changes
}
