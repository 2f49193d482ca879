// src/core/replication.rs

//! Applies the per-node state machine transition table on top of the node
//! probe's raw `configure_replica` outcome. `broken` is terminal under
//! automation.

use crate::core::node::{ReplicaOutcome, Status};

/// A non-primary node observed unreachable this tick.
pub fn on_unreachable(current: Status) -> Status {
    match current {
        Status::Online | Status::Offline => Status::Offline,
        Status::Broken => Status::Broken,
    }
}

/// A non-primary node observed reachable this tick, after
/// `configure_replica(n, primary)` has been called and classified.
///
/// `broken` has no automatic recovery path: only an external operator
/// action can return the node to `offline`/`online`.
pub fn on_reconfigured(current: Status, outcome: ReplicaOutcome) -> Status {
    match (current, outcome) {
        (Status::Broken, _) => Status::Broken,
        (_, ReplicaOutcome::Healthy) => Status::Online,
        (_, ReplicaOutcome::PersistentFailure) => Status::Broken,
        (_, ReplicaOutcome::TransientFailure) => Status::Offline,
    }
}
