// src/core/failover.rs

//! The failover procedure: selects the most-advanced reachable replica,
//! promotes it via the proxy, and clears its own replica configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::cancellation::CancellationToken;
use crate::core::config::Config;
use crate::core::election::{self, ElectionResult};
use crate::core::node::GtidSet;
use crate::core::probe::NodeProbe;
use crate::core::proxy::{ProxyAdminClient, RoutingGroups};
use crate::core::retry::{self, RetryPolicy};

/// Outcome of one failover attempt. No variant ever leaves the snapshot
/// mutated; the caller (the control loop) applies state transitions itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    Promoted(String),
    NoCandidates,
    QuorumLoss { online: usize, quorum: usize },
    Ambiguous,
    ProxyWriteFailed(String),
}

/// Runs the failover procedure against `reachable_candidates` (already
/// filtered by the caller to exclude the old primary and any `broken` node).
/// `recognized_count` is `N` in the quorum formula `⌊N/2⌋ + 1`; `online_count`
/// is the number of nodes the caller currently considers `online` (the
/// quorum gate, evaluated *before* the election is attempted).
pub async fn run_failover(
    reachable_candidates: &[String],
    recognized_count: usize,
    online_count: usize,
    probe: &dyn NodeProbe,
    proxy: &dyn ProxyAdminClient,
    groups: RoutingGroups,
    config: &Config,
    cancel: &CancellationToken,
) -> FailoverOutcome {
    let quorum = Config::quorum(recognized_count);
    if online_count < quorum {
        warn!(
            "quorum loss: {} online of {} recognized (need {}); refusing failover",
            online_count, recognized_count, quorum
        );
        return FailoverOutcome::QuorumLoss {
            online: online_count,
            quorum,
        };
    }

    if reachable_candidates.is_empty() {
        warn!("no reachable non-broken candidates; aborting this tick's failover attempt");
        return FailoverOutcome::NoCandidates;
    }

    let mut candidates: BTreeMap<String, GtidSet> = BTreeMap::new();
    for host in reachable_candidates {
        if let Some(gtid) = probe.get_gtid(host).await {
            candidates.insert(host.clone(), gtid);
        }
    }

    if candidates.is_empty() {
        warn!("no candidate exposed a GTID set; aborting this tick's failover attempt");
        return FailoverOutcome::NoCandidates;
    }

    let winner = match election::elect(&candidates, probe).await {
        ElectionResult::Winner(host) => host,
        ElectionResult::Ambiguous => {
            warn!("election ambiguous: no single candidate dominates all others; no promotion");
            return FailoverOutcome::Ambiguous;
        }
    };

    info!("election winner: {}", winner);

    let write_policy = RetryPolicy::bounded(Duration::from_secs(2), 3);
    let write_result = retry::retry(
        write_policy,
        cancel,
        || async { proxy.set_writer(&winner, groups, config.db_port).await },
        |r| r.is_ok(),
    )
    .await;

    if let Err(e) = write_result {
        warn!("set_writer({}) failed after retries: {}", winner, e);
        return FailoverOutcome::ProxyWriteFailed(e.to_string());
    }

    if !probe.stop_and_reset_replica(&winner).await {
        warn!(
            "stop_and_reset_replica({}) failed; winner was promoted at the proxy but retains stale replica configuration",
            winner
        );
    }

    FailoverOutcome::Promoted(winner)
}
