// src/core/testing.rs

//! In-memory fakes for `NodeProbe`, `ProxyAdminClient`, `Notify`, and
//! `Confirmer`, letting the control loop, failover procedure, election
//! engine, and topology diff be exercised end-to-end without a live
//! database. Used across `tests/`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::{OrchestratorError, Result};
use crate::core::node::{GtidSet, RepStatus, ReplicaOutcome, Status};
use crate::core::proxy::{ProxyAdminClient, RoutingGroups};

use super::lock::Confirmer;
use super::notify::Notify;
use super::probe::NodeProbe;

/// Scripted behavior for a single node.
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub reachable: bool,
    pub gtid: Option<GtidSet>,
    pub replication_status: Option<RepStatus>,
    pub configure_replica_outcome: ReplicaOutcome,
}

/// A `NodeProbe` driven entirely by a map operators script in test setup.
#[derive(Default)]
pub struct FakeNodeProbe {
    pub nodes: Mutex<HashMap<String, FakeNode>>,
    /// Hostname-keyed GTID containment table: `(subset, superset) -> bool`.
    pub subset_table: Mutex<HashMap<(String, String), bool>>,
}

impl FakeNodeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, hostname: &str, node: FakeNode) {
        self.nodes.lock().unwrap().insert(hostname.to_string(), node);
    }

    /// Declares that `subset ⊑ superset` for the oracle evaluation in tests.
    pub fn declare_subset(&self, subset: &GtidSet, superset: &GtidSet, holds: bool) {
        self.subset_table
            .lock()
            .unwrap()
            .insert((subset.as_str().to_string(), superset.as_str().to_string()), holds);
    }
}

#[async_trait]
impl NodeProbe for FakeNodeProbe {
    async fn reachable(&self, hostname: &str) -> bool {
        self.nodes
            .lock()
            .unwrap()
            .get(hostname)
            .map(|n| n.reachable)
            .unwrap_or(false)
    }

    async fn get_gtid(&self, hostname: &str) -> Option<GtidSet> {
        self.nodes.lock().unwrap().get(hostname).and_then(|n| n.gtid.clone())
    }

    async fn get_replication_status(&self, hostname: &str) -> Option<RepStatus> {
        self.nodes
            .lock()
            .unwrap()
            .get(hostname)
            .and_then(|n| n.replication_status.clone())
    }

    async fn stop_and_reset_replica(&self, _hostname: &str) -> bool {
        true
    }

    async fn configure_replica(&self, hostname: &str, _source: &str) -> ReplicaOutcome {
        self.nodes
            .lock()
            .unwrap()
            .get(hostname)
            .map(|n| n.configure_replica_outcome)
            .unwrap_or(ReplicaOutcome::TransientFailure)
    }

    async fn gtid_subset(&self, _oracle: &str, subset: &GtidSet, superset: &GtidSet) -> Option<bool> {
        if subset == superset {
            return Some(true);
        }
        self.subset_table
            .lock()
            .unwrap()
            .get(&(subset.as_str().to_string(), superset.as_str().to_string()))
            .copied()
    }
}

#[derive(Debug, Clone, Default)]
struct FakeProxyState {
    writer: Option<String>,
    reader: Vec<String>,
    quarantine: Vec<String>,
    statuses: HashMap<String, String>,
    kv: HashMap<String, String>,
}

/// A `ProxyAdminClient` backed by in-memory routing/KV state.
#[derive(Default)]
pub struct FakeProxyAdminClient {
    state: Mutex<FakeProxyState>,
}

impl FakeProxyAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_writer(&self, hostname: &str) {
        self.state.lock().unwrap().writer = Some(hostname.to_string());
    }

    pub fn seed_reader(&self, hostname: &str) {
        self.state.lock().unwrap().reader.push(hostname.to_string());
    }

    pub fn seed_status(&self, hostname: &str, status: Status) {
        let s = match status {
            Status::Online => "ONLINE",
            Status::Offline => "OFFLINE_SOFT",
            Status::Broken => "ONLINE",
        };
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(hostname.to_string(), s.to_string());
        if status == Status::Broken {
            self.state.lock().unwrap().quarantine.push(hostname.to_string());
        }
    }
}

#[async_trait]
impl ProxyAdminClient for FakeProxyAdminClient {
    async fn list_nodes(&self, _groups: &[u32]) -> Result<std::collections::HashSet<String>> {
        let state = self.state.lock().unwrap();
        let mut set = std::collections::HashSet::new();
        set.extend(state.writer.clone());
        set.extend(state.reader.iter().cloned());
        set.extend(state.quarantine.iter().cloned());
        Ok(set)
    }

    async fn get_status_map(&self, _groups: RoutingGroups) -> Result<HashMap<String, Status>> {
        let state = self.state.lock().unwrap();
        let mut result = HashMap::new();
        for host in &state.quarantine {
            result.insert(host.clone(), Status::Broken);
        }
        if let Some(writer) = &state.writer {
            if !result.contains_key(writer) {
                let online = state
                    .statuses
                    .get(writer)
                    .map(|s| s == "ONLINE")
                    .unwrap_or(true);
                result.insert(writer.clone(), if online { Status::Online } else { Status::Offline });
            }
        }
        for host in &state.reader {
            if !result.contains_key(host) {
                let online = state
                    .statuses
                    .get(host)
                    .map(|s| s == "ONLINE")
                    .unwrap_or(true);
                result.insert(host.clone(), if online { Status::Online } else { Status::Offline });
            }
        }
        Ok(result)
    }

    async fn get_writer(&self, _groups: RoutingGroups) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().writer.clone())
    }

    async fn set_writer(&self, hostname: &str, _groups: RoutingGroups, _db_port: u16) -> Result<()> {
        self.state.lock().unwrap().writer = Some(hostname.to_string());
        Ok(())
    }

    async fn quarantine(&self, hostname: &str, _groups: RoutingGroups) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.reader.retain(|h| h != hostname);
        if state.writer.as_deref() == Some(hostname) {
            state.writer = None;
        }
        if !state.quarantine.contains(&hostname.to_string()) {
            state.quarantine.push(hostname.to_string());
        }
        Ok(())
    }

    async fn set_status(&self, hostname: &str, online: bool, _groups: RoutingGroups) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(hostname.to_string(), if online { "ONLINE" } else { "OFFLINE_SOFT" }.to_string());
        Ok(())
    }

    async fn kv_init(&self) -> Result<()> {
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().kv.get(key).cloned())
    }

    async fn kv_upsert(&self, key: &str, value: &str) -> Result<()> {
        self.state.lock().unwrap().kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn kv_delete(&self, key: &str) -> Result<()> {
        self.state.lock().unwrap().kv.remove(key);
        Ok(())
    }
}

/// A fallible `ProxyAdminClient` wrapper used to exercise proxy-write-failure
/// handling without a live database.
pub struct FailingProxyAdminClient;

#[async_trait]
impl ProxyAdminClient for FailingProxyAdminClient {
    async fn list_nodes(&self, _groups: &[u32]) -> Result<std::collections::HashSet<String>> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn get_status_map(&self, _groups: RoutingGroups) -> Result<HashMap<String, Status>> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn get_writer(&self, _groups: RoutingGroups) -> Result<Option<String>> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn set_writer(&self, _hostname: &str, _groups: RoutingGroups, _db_port: u16) -> Result<()> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn quarantine(&self, _hostname: &str, _groups: RoutingGroups) -> Result<()> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn set_status(&self, _hostname: &str, _online: bool, _groups: RoutingGroups) -> Result<()> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn kv_init(&self) -> Result<()> {
        Err(OrchestratorError::KvInitFailed("simulated failure".into()))
    }
    async fn kv_get(&self, _key: &str) -> Result<Option<String>> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn kv_upsert(&self, _key: &str, _value: &str) -> Result<()> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
    async fn kv_delete(&self, _key: &str) -> Result<()> {
        Err(OrchestratorError::ProxyWrite("simulated failure".into()))
    }
}

/// Records every notification sent, for assertions in tests.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }
}

#[async_trait]
impl Notify for RecordingNotifier {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

/// Returns a scripted yes/no answer, deterministically, with no terminal
/// attached.
pub struct ScriptedConfirmer(pub bool);

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
