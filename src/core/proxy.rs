// src/core/proxy.rs

//! Typed operations on the proxy's `mysql_servers`-shaped routing table and
//! its auxiliary KV table, reachable over the MySQL wire protocol on the
//! proxy's admin port.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySqlPool, Row};

use crate::core::constants::{KV_LOCK_HELD_VALUE, KV_TABLE_NAME};
use crate::core::errors::{OrchestratorError, Result};
use crate::core::node::Status;

/// The three fixed-purpose routing groups. IDs are configurable
/// defaults, not hardcoded constants; see [`Config`](crate::core::config::Config).
#[derive(Debug, Clone, Copy)]
pub struct RoutingGroups {
    pub writer: u32,
    pub reader: u32,
    pub quarantine: u32,
}

#[async_trait]
pub trait ProxyAdminClient: Send + Sync {
    async fn list_nodes(&self, groups: &[u32]) -> Result<HashSet<String>>;
    async fn get_status_map(&self, groups: RoutingGroups) -> Result<HashMap<String, Status>>;
    async fn get_writer(&self, groups: RoutingGroups) -> Result<Option<String>>;
    async fn set_writer(&self, hostname: &str, groups: RoutingGroups, db_port: u16) -> Result<()>;
    async fn quarantine(&self, hostname: &str, groups: RoutingGroups) -> Result<()>;
    async fn set_status(&self, hostname: &str, online: bool, groups: RoutingGroups) -> Result<()>;

    async fn kv_init(&self) -> Result<()>;
    async fn kv_get(&self, key: &str) -> Result<Option<String>>;
    async fn kv_upsert(&self, key: &str, value: &str) -> Result<()>;
    async fn kv_delete(&self, key: &str) -> Result<()>;
}

/// A `ProxyAdminClient` backed by a pooled connection to the proxy's admin
/// interface. Every mutation runs as a single transaction followed by the
/// `LOAD ... TO RUNTIME` / `SAVE ... TO DISK` pair; a failure partway
/// through surfaces as [`OrchestratorError::ProxyWrite`], never a
/// silently-applied partial state.
pub struct MySqlProxyAdminClient {
    pool: MySqlPool,
}

impl MySqlProxyAdminClient {
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        pass: &str,
        conn_timeout: Duration,
    ) -> Result<Self> {
        let opts = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .password(pass);
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(conn_timeout)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    async fn reload(&self) -> Result<()> {
        sqlx::query("LOAD MYSQL SERVERS TO RUNTIME")
            .execute(&self.pool)
            .await
            .map_err(|e| OrchestratorError::ProxyWrite(e.to_string()))?;
        sqlx::query("SAVE MYSQL SERVERS TO DISK")
            .execute(&self.pool)
            .await
            .map_err(|e| OrchestratorError::ProxyWrite(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProxyAdminClient for MySqlProxyAdminClient {
    async fn list_nodes(&self, groups: &[u32]) -> Result<HashSet<String>> {
        let placeholders = groups.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT DISTINCT hostname FROM mysql_servers WHERE hostgroup_id IN ({placeholders})"
        );
        let mut q = sqlx::query(&sql);
        for g in groups {
            q = q.bind(*g);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| r.get::<String, _>("hostname"))
            .collect())
    }

    async fn get_status_map(&self, groups: RoutingGroups) -> Result<HashMap<String, Status>> {
        let rows = sqlx::query(
            "SELECT hostname, hostgroup_id, status FROM mysql_servers WHERE hostgroup_id IN (?, ?, ?)",
        )
        .bind(groups.writer)
        .bind(groups.reader)
        .bind(groups.quarantine)
        .fetch_all(&self.pool)
        .await?;

        let mut quarantined: HashSet<String> = HashSet::new();
        let mut all_online: HashMap<String, bool> = HashMap::new();

        for row in rows {
            let hostname: String = row.get("hostname");
            let hostgroup_id: i64 = row.get("hostgroup_id");
            let raw_status: String = row.get("status");

            if hostgroup_id as u32 == groups.quarantine {
                quarantined.insert(hostname);
                continue;
            }
            let online = raw_status.eq_ignore_ascii_case("ONLINE");
            all_online
                .entry(hostname)
                .and_modify(|v| *v = *v && online)
                .or_insert(online);
        }

        let mut result = HashMap::new();
        for host in quarantined {
            result.insert(host, Status::Broken);
        }
        for (host, online) in all_online {
            result
                .entry(host)
                .or_insert(if online { Status::Online } else { Status::Offline });
        }
        Ok(result)
    }

    async fn get_writer(&self, groups: RoutingGroups) -> Result<Option<String>> {
        let rows = sqlx::query("SELECT hostname FROM mysql_servers WHERE hostgroup_id = ?")
            .bind(groups.writer)
            .fetch_all(&self.pool)
            .await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows[0].get::<String, _>("hostname"))),
            rows_count => Err(OrchestratorError::SplitBrain { rows: rows_count }),
        }
    }

    async fn set_writer(&self, hostname: &str, groups: RoutingGroups, db_port: u16) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM mysql_servers WHERE hostgroup_id = ?")
            .bind(groups.writer)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO mysql_servers (hostgroup_id, hostname, port, status) VALUES (?, ?, ?, 'ONLINE')",
        )
        .bind(groups.writer)
        .bind(hostname)
        .bind(db_port)
        .execute(&mut *tx)
        .await?;
        tx.commit()
            .await
            .map_err(|e| OrchestratorError::ProxyWrite(e.to_string()))?;
        self.reload().await
    }

    async fn quarantine(&self, hostname: &str, groups: RoutingGroups) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let port: Option<i64> = sqlx::query_scalar(
            "SELECT port FROM mysql_servers WHERE hostname = ? AND hostgroup_id IN (?, ?) LIMIT 1",
        )
        .bind(hostname)
        .bind(groups.writer)
        .bind(groups.reader)
        .fetch_optional(&mut *tx)
        .await?;
        let port = port.unwrap_or(3306);

        sqlx::query("DELETE FROM mysql_servers WHERE hostname = ?")
            .bind(hostname)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO mysql_servers (hostgroup_id, hostname, port, status) VALUES (?, ?, ?, 'ONLINE')",
        )
        .bind(groups.quarantine)
        .bind(hostname)
        .bind(port)
        .execute(&mut *tx)
        .await?;
        tx.commit()
            .await
            .map_err(|e| OrchestratorError::ProxyWrite(e.to_string()))?;
        self.reload().await
    }

    async fn set_status(&self, hostname: &str, online: bool, groups: RoutingGroups) -> Result<()> {
        let status = if online { "ONLINE" } else { "OFFLINE_SOFT" };
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE mysql_servers SET status = ? WHERE hostname = ? AND hostgroup_id IN (?, ?)",
        )
        .bind(status)
        .bind(hostname)
        .bind(groups.writer)
        .bind(groups.reader)
        .execute(&mut *tx)
        .await?;
        tx.commit()
            .await
            .map_err(|e| OrchestratorError::ProxyWrite(e.to_string()))?;
        self.reload().await
    }

    async fn kv_init(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {KV_TABLE_NAME} (k VARCHAR(191) PRIMARY KEY, v TEXT NOT NULL)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| OrchestratorError::KvInitFailed(e.to_string()))?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as(&format!("SELECT v FROM {KV_TABLE_NAME} WHERE k = ?"))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn kv_upsert(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {KV_TABLE_NAME} (k, v) VALUES (?, ?) ON DUPLICATE KEY UPDATE v = VALUES(v)"
        ))
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn kv_delete(&self, key: &str) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {KV_TABLE_NAME} WHERE k = ?"))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Convenience used by callers holding the lock key.
pub fn lock_held_value() -> &'static str {
    KV_LOCK_HELD_VALUE
}
