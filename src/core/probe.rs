// src/core/probe.rs

//! One-shot health, role, lag, and GTID queries against a single database
//! node.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySqlPool, Row};
use tracing::{debug, warn};

use crate::core::node::{GtidSet, RepStatus, ReplicaOutcome};

/// Everything the rest of the orchestrator needs from a single database node.
/// A single call never retries internally; that is the retry harness's job.
#[async_trait]
pub trait NodeProbe: Send + Sync {
    async fn reachable(&self, hostname: &str) -> bool;
    async fn get_gtid(&self, hostname: &str) -> Option<GtidSet>;
    async fn get_replication_status(&self, hostname: &str) -> Option<RepStatus>;
    async fn stop_and_reset_replica(&self, hostname: &str) -> bool;
    async fn configure_replica(&self, hostname: &str, source: &str) -> ReplicaOutcome;

    /// Evaluates `GTID_SUBSET(subset, superset)` on the given node, which acts
    /// as the containment oracle for the election engine.
    async fn gtid_subset(&self, oracle: &str, subset: &GtidSet, superset: &GtidSet) -> Option<bool>;
}

/// A `NodeProbe` backed by ad hoc `sqlx::MySqlPool` connections, one per
/// queried node, each bounded by [`Config::conn_timeout`](crate::core::config::Config).
pub struct MySqlNodeProbe {
    user: String,
    pass: String,
    port: u16,
    conn_timeout: Duration,
}

impl MySqlNodeProbe {
    pub fn new(user: String, pass: String, port: u16, conn_timeout: Duration) -> Self {
        Self {
            user,
            pass,
            port,
            conn_timeout,
        }
    }

    async fn connect(&self, hostname: &str) -> sqlx::Result<MySqlPool> {
        let opts = MySqlConnectOptions::new()
            .host(hostname)
            .port(self.port)
            .username(&self.user)
            .password(&self.pass);

        MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.conn_timeout)
            .connect_with(opts)
            .await
    }
}

#[async_trait]
impl NodeProbe for MySqlNodeProbe {
    async fn reachable(&self, hostname: &str) -> bool {
        match self.connect(hostname).await {
            Ok(pool) => {
                pool.close().await;
                true
            }
            Err(e) => {
                debug!("node {} unreachable: {}", hostname, e);
                false
            }
        }
    }

    async fn get_gtid(&self, hostname: &str) -> Option<GtidSet> {
        let pool = self.connect(hostname).await.ok()?;
        let row = sqlx::query("SELECT @@GLOBAL.gtid_executed AS gtid")
            .fetch_one(&pool)
            .await
            .ok()?;
        let raw: Option<String> = row.try_get("gtid").ok()?;
        pool.close().await;
        match raw {
            Some(s) if !s.trim().is_empty() => Some(GtidSet::new(s)),
            _ => None,
        }
    }

    async fn get_replication_status(&self, hostname: &str) -> Option<RepStatus> {
        let pool = self.connect(hostname).await.ok()?;
        let row = sqlx::query("SHOW REPLICA STATUS").fetch_optional(&pool).await;
        let row = match row {
            Ok(Some(r)) => r,
            _ => {
                let legacy = sqlx::query("SHOW SLAVE STATUS").fetch_optional(&pool).await.ok()??;
                legacy
            }
        };
        pool.close().await;

        let source_host: String = row.try_get("Source_Host").or_else(|_| row.try_get("Master_Host")).ok()?;
        let io_running: String = row
            .try_get("Replica_IO_Running")
            .or_else(|_| row.try_get("Slave_IO_Running"))
            .ok()?;
        let sql_running: String = row
            .try_get("Replica_SQL_Running")
            .or_else(|_| row.try_get("Slave_SQL_Running"))
            .ok()?;
        let seconds_behind: Option<i64> = row
            .try_get("Seconds_Behind_Source")
            .or_else(|_| row.try_get("Seconds_Behind_Master"))
            .unwrap_or(None);
        let last_error: Option<String> = row
            .try_get("Last_Error")
            .ok()
            .filter(|s: &String| !s.is_empty());

        Some(RepStatus {
            source_host,
            io_running: io_running.eq_ignore_ascii_case("yes"),
            sql_running: sql_running.eq_ignore_ascii_case("yes"),
            seconds_behind: seconds_behind.map(|v| v.max(0) as u64),
            last_error,
        })
    }

    async fn stop_and_reset_replica(&self, hostname: &str) -> bool {
        let Ok(pool) = self.connect(hostname).await else {
            return false;
        };
        let ok = sqlx::query("STOP REPLICA")
            .execute(&pool)
            .await
            .or(sqlx::query("STOP SLAVE").execute(&pool).await)
            .is_ok()
            && sqlx::query("RESET REPLICA ALL")
                .execute(&pool)
                .await
                .or(sqlx::query("RESET SLAVE ALL").execute(&pool).await)
                .is_ok();
        pool.close().await;
        ok
    }

    async fn configure_replica(&self, hostname: &str, source: &str) -> ReplicaOutcome {
        // Idempotence: if already healthy and pointed at `source`, skip the
        // CHANGE-of-source entirely.
        if let Some(status) = self.get_replication_status(hostname).await {
            if status.source_host == source && status.is_healthy() {
                return ReplicaOutcome::Healthy;
            }
        }

        let Ok(pool) = self.connect(hostname).await else {
            return ReplicaOutcome::TransientFailure;
        };

        let _ = sqlx::query("STOP REPLICA")
            .execute(&pool)
            .await
            .or(sqlx::query("STOP SLAVE").execute(&pool).await);

        let change = sqlx::query(&format!(
            "CHANGE REPLICATION SOURCE TO SOURCE_HOST='{source}', SOURCE_AUTO_POSITION=1"
        ))
        .execute(&pool)
        .await;

        if change.is_err() {
            pool.close().await;
            return ReplicaOutcome::TransientFailure;
        }

        let start = sqlx::query("START REPLICA")
            .execute(&pool)
            .await
            .or(sqlx::query("START SLAVE").execute(&pool).await);
        if start.is_err() {
            pool.close().await;
            return ReplicaOutcome::TransientFailure;
        }

        tokio::time::sleep(crate::core::constants::REPLICA_START_GRACE).await;

        let outcome = match self.get_replication_status(hostname).await {
            Some(status) if status.is_healthy() => ReplicaOutcome::Healthy,
            Some(_) => ReplicaOutcome::PersistentFailure,
            None => ReplicaOutcome::PersistentFailure,
        };
        pool.close().await;
        outcome
    }

    async fn gtid_subset(&self, oracle: &str, subset: &GtidSet, superset: &GtidSet) -> Option<bool> {
        let pool = self.connect(oracle).await.ok()?;
        let row = sqlx::query("SELECT GTID_SUBSET(?, ?) AS is_subset")
            .bind(subset.as_str())
            .bind(superset.as_str())
            .fetch_one(&pool)
            .await
            .inspect_err(|e| warn!("GTID_SUBSET query against oracle {} failed: {}", oracle, e))
            .ok()?;
        pool.close().await;
        let v: i64 = row.try_get("is_subset").ok()?;
        Some(v != 0)
    }
}
