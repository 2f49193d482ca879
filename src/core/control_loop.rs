// src/core/control_loop.rs

//! The single scheduling point that drives observation, decision, action,
//! and change notification every tick.

use chrono::{NaiveDate, Timelike, Utc};
use tracing::{info, warn};

use crate::core::cancellation::CancellationToken;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::failover::{self, FailoverOutcome};
use crate::core::node::{ReplicaOutcome, Status};
use crate::core::notify::Notify;
use crate::core::probe::NodeProbe;
use crate::core::proxy::{ProxyAdminClient, RoutingGroups};
use crate::core::replication;
use crate::core::retry::{self, RetryPolicy};
use crate::core::topology::{self, TopologySnapshot};

/// All mutable state owned by the loop thread. There are no package-level
/// variables: every mutation site is a method on this value.
pub struct ControlLoopState {
    config: Config,
    groups: RoutingGroups,
    snapshot: TopologySnapshot,
    last_daily_sent: Option<NaiveDate>,
}

impl ControlLoopState {
    pub fn new(config: Config) -> Self {
        let groups = RoutingGroups {
            writer: config.writer_group_id,
            reader: config.reader_group_id,
            quarantine: config.quarantine_group_id,
        };
        Self {
            config,
            groups,
            snapshot: TopologySnapshot::new(),
            last_daily_sent: None,
        }
    }

    pub fn snapshot(&self) -> &TopologySnapshot {
        &self.snapshot
    }

    /// Runs one full tick. Returns once the tick's fixed-order phases
    /// have all completed; the caller is responsible for the inter-tick sleep.
    pub async fn tick(
        &mut self,
        probe: &dyn NodeProbe,
        proxy: &dyn ProxyAdminClient,
        notifier: &dyn Notify,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // 1. Daily report gate.
        self.maybe_send_daily_report(probe, notifier).await?;

        // 2. Snapshot copy.
        let old_snapshot = self.snapshot.clone();

        // 3. Recognized set.
        let recognized = proxy
            .get_status_map(self.groups)
            .await
            .unwrap_or_default();
        self.snapshot.rebuild_from_proxy(&recognized);

        // Adopt the proxy's existing writer when no primary is currently
        // recorded (startup, or recovery after an operator fixed an
        // ambiguous/no-candidate state manually).
        if self.snapshot.primary.is_none() {
            if let Ok(Some(writer)) = proxy.get_writer(self.groups).await {
                if self.snapshot.statuses.contains_key(&writer) {
                    self.snapshot.set_primary(Some(writer));
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        // 4. Primary check.
        self.primary_check(probe, proxy, cancel).await;

        if cancel.is_cancelled() {
            return self.notify_changes(&old_snapshot, notifier).await;
        }

        // 5. Per-replica reconcile.
        self.reconcile_replicas(probe, proxy).await;

        // 6. Change notification.
        self.notify_changes(&old_snapshot, notifier).await
    }

    async fn maybe_send_daily_report(
        &mut self,
        probe: &dyn NodeProbe,
        notifier: &dyn Notify,
    ) -> Result<()> {
        let now = Utc::now();
        let today = now.date_naive();
        let already_sent = self.last_daily_sent == Some(today);
        if now.time().hour() != self.config.report_hour || already_sent {
            return Ok(());
        }

        let mut rows = Vec::new();
        for (host, status) in &self.snapshot.statuses {
            let lag = if self.snapshot.primary.as_deref() != Some(host.as_str()) {
                probe
                    .get_replication_status(host)
                    .await
                    .and_then(|s| s.seconds_behind)
            } else {
                None
            };
            rows.push((host.clone(), *status, lag));
        }

        if let Err(e) = notifier.daily(self.snapshot.primary.as_deref(), &rows).await {
            warn!("failed to send daily report: {}", e);
        }
        self.last_daily_sent = Some(today);
        Ok(())
    }

    async fn primary_check(
        &mut self,
        probe: &dyn NodeProbe,
        proxy: &dyn ProxyAdminClient,
        cancel: &CancellationToken,
    ) {
        let Some(primary) = self.snapshot.primary.clone() else {
            return;
        };

        if !self.snapshot.statuses.contains_key(&primary) {
            self.start_failover(probe, proxy, cancel).await;
            return;
        }

        let policy = RetryPolicy::bounded(self.config.master_retry_delay, self.config.master_retries);
        let reachable = retry::retry(
            policy,
            cancel,
            || async { probe.reachable(&primary).await },
            |ok| *ok,
        )
        .await;

        if !reachable {
            warn!("primary {} unreachable after retries; initiating failover", primary);
            self.snapshot.mark(&primary, Status::Offline);
            self.start_failover(probe, proxy, cancel).await;
        }
    }

    async fn start_failover(
        &mut self,
        probe: &dyn NodeProbe,
        proxy: &dyn ProxyAdminClient,
        cancel: &CancellationToken,
    ) {
        let recognized_count = self.snapshot.statuses.len();

        let primary = self.snapshot.primary.clone();
        let candidates: Vec<String> = self
            .snapshot
            .statuses
            .iter()
            .filter(|(host, status)| {
                Some(host.as_str()) != primary.as_deref() && **status != Status::Broken
            })
            .map(|(host, _)| host.clone())
            .collect();

        // Reachability is probed fresh here rather than read from last tick's
        // snapshot, so a node that just went unreachable this same tick (but
        // whose per-replica reconcile hasn't run yet) is counted correctly
        // for the quorum gate below.
        let mut reachable_candidates = Vec::new();
        for host in candidates {
            if probe.reachable(&host).await {
                reachable_candidates.push(host);
            }
        }
        let online_count = reachable_candidates.len();

        let outcome = failover::run_failover(
            &reachable_candidates,
            recognized_count,
            online_count,
            probe,
            proxy,
            self.groups,
            &self.config,
            cancel,
        )
        .await;

        match outcome {
            FailoverOutcome::Promoted(winner) => {
                info!("promoted {} to primary", winner);
                self.snapshot.set_primary(Some(winner.clone()));
                self.snapshot.mark(&winner, Status::Online);
            }
            FailoverOutcome::NoCandidates
            | FailoverOutcome::Ambiguous
            | FailoverOutcome::QuorumLoss { .. }
            | FailoverOutcome::ProxyWriteFailed(_) => {
                // No promotion occurred; the primary is unknown until the
                // next successful election or operator intervention.
                self.snapshot.set_primary(None);
            }
        }
    }

    async fn reconcile_replicas(&mut self, probe: &dyn NodeProbe, proxy: &dyn ProxyAdminClient) {
        let primary = self.snapshot.primary.clone();
        let Some(primary) = primary else {
            return;
        };

        let replicas: Vec<(String, Status)> = self
            .snapshot
            .statuses
            .iter()
            .filter(|(host, status)| host.as_str() != primary && **status != Status::Broken)
            .map(|(host, status)| (host.clone(), *status))
            .collect();

        for (host, current_status) in replicas {
            if !probe.reachable(&host).await {
                self.snapshot.mark(&host, replication::on_unreachable(current_status));
                let _ = proxy.set_status(&host, false, self.groups).await;
                continue;
            }

            let outcome: ReplicaOutcome = probe.configure_replica(&host, &primary).await;
            let new_status = replication::on_reconfigured(current_status, outcome);
            self.snapshot.mark(&host, new_status);

            match new_status {
                Status::Online => {
                    let _ = proxy.set_status(&host, true, self.groups).await;
                }
                Status::Offline => {
                    let _ = proxy.set_status(&host, false, self.groups).await;
                }
                Status::Broken => {
                    warn!("{} marked broken after persistent replication failure", host);
                    let _ = proxy.quarantine(&host, self.groups).await;
                }
            }
        }
    }

    async fn notify_changes(&self, old_snapshot: &TopologySnapshot, notifier: &dyn Notify) -> Result<()> {
        let changes = topology::diff(old_snapshot, &self.snapshot);
        if changes.is_empty() {
            return Ok(());
        }
        if let Err(e) = notifier
            .change(
                old_snapshot.primary.as_deref(),
                self.snapshot.primary.as_deref(),
                &changes,
            )
            .await
        {
            warn!("failed to send change notification: {}", e);
        }
        Ok(())
    }
}

/// The caller-owned loop: ticks every `config.tick_interval` until cancelled.
pub async fn run(
    mut state: ControlLoopState,
    probe: &dyn NodeProbe,
    proxy: &dyn ProxyAdminClient,
    notifier: &dyn Notify,
    cancel: &CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        if let Err(e) = state.tick(probe, proxy, notifier, cancel).await {
            warn!("tick failed: {}", e);
        }

        if cancel.is_cancelled() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(state.config.tick_interval) => {}
            _ = cancel.cancelled() => return,
        }
    }
}
