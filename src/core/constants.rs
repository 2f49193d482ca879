// src/core/constants.rs

//! Fixed protocol constants for the proxy routing table and auxiliary KV table.
//!
//! These are *defaults*; operators running a non-standard proxy schema can
//! override the routing group IDs via CLI flags (see [`crate::cli::Cli`]).

use std::time::Duration;

/// Default hostgroup ID for the writer routing group (W).
pub const DEFAULT_WRITER_GROUP_ID: u32 = 10;
/// Default hostgroup ID for the reader routing group (R).
pub const DEFAULT_READER_GROUP_ID: u32 = 20;
/// Default hostgroup ID for the quarantine routing group (Q).
pub const DEFAULT_QUARANTINE_GROUP_ID: u32 = 30;

/// Name of the auxiliary key/value table hosted by the proxy admin interface.
pub const KV_TABLE_NAME: &str = "topoward_kv";
/// The key used for the durable single-instance startup/shutdown lock.
pub const KV_LOCK_KEY: &str = "lock";
/// The value written to the lock key while the orchestrator holds it.
pub const KV_LOCK_HELD_VALUE: &str = "1";

/// Default SQL connection timeout.
pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period `configure_replica` waits after issuing `START REPLICA`
/// before re-reading replication status.
pub const REPLICA_START_GRACE: Duration = Duration::from_secs(2);

/// Default MySQL port for database nodes.
pub const DEFAULT_DB_PORT: u16 = 3306;
/// Default ProxySQL admin port.
pub const DEFAULT_PROXY_ADMIN_PORT: u16 = 6032;

/// Process exit code used when the auxiliary KV table cannot be initialized.
pub const EXIT_KV_INIT_IMPOSSIBLE: i32 = 1001;
