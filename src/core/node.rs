// src/core/node.rs

//! The data model for a single cluster peer: observed status, GTID position,
//! and replication state. Peers are addressed by hostname string throughout
//! (see [`crate::core::topology::TopologySnapshot`]) rather than through a
//! dedicated identity type.

use std::fmt;

/// A node's last-observed reachability/health status.
///
/// `Broken` is terminal under automation: only an operator restores a
/// broken node to `Offline`/`Online`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Online,
    Offline,
    Broken,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Online => write!(f, "online"),
            Status::Offline => write!(f, "offline"),
            Status::Broken => write!(f, "broken"),
        }
    }
}

/// An opaque, comparable GTID set. Containment (`⊑`) is defined only by the
/// cluster itself (`GTID_SUBSET`, evaluated remotely by the election oracle);
/// this type never compares sets locally by string ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GtidSet(pub String);

impl GtidSet {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for GtidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The server's view of its own replication state, as reported by
/// `SHOW REPLICA STATUS` / `SHOW SLAVE STATUS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepStatus {
    pub source_host: String,
    pub io_running: bool,
    pub sql_running: bool,
    pub seconds_behind: Option<u64>,
    pub last_error: Option<String>,
}

impl RepStatus {
    /// Both replication threads must be running for the replica link to be
    /// considered healthy.
    pub fn is_healthy(&self) -> bool {
        self.io_running && self.sql_running
    }
}

/// The outcome of `configure_replica`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicaOutcome {
    #[default]
    Healthy,
    TransientFailure,
    PersistentFailure,
}
