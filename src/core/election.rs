// src/core/election.rs

//! Given a set of reachable candidates and their GTID sets, returns the
//! unique most-advanced node or `ambiguous`.

use std::collections::BTreeMap;

use crate::core::node::GtidSet;
use crate::core::probe::NodeProbe;

/// Outcome of [`elect`]. `Ambiguous` covers both "no candidate dominates all
/// others" and "the oracle was unreachable". The engine never falls back to
/// lexical string comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionResult {
    Winner(String),
    Ambiguous,
}

/// Runs the election. `candidates` maps hostname to its last-observed GTID
/// set; callers are expected to have already dropped unreachable nodes and
/// nodes with no GTID. Iteration order is hostname-ascending so the
/// tie-break is deterministic: when two candidates are equal under `⊑`, the
/// first encountered in sorted order wins.
pub async fn elect(candidates: &BTreeMap<String, GtidSet>, probe: &dyn NodeProbe) -> ElectionResult {
    if candidates.is_empty() {
        return ElectionResult::Ambiguous;
    }

    // Any reachable candidate can serve as the containment oracle; the first
    // in sorted order is as good as any other.
    let Some(oracle) = candidates.keys().next() else {
        return ElectionResult::Ambiguous;
    };

    for (host_a, gtid_a) in candidates {
        let mut dominates_all = true;
        for (host_b, gtid_b) in candidates {
            if host_a == host_b {
                continue;
            }
            match probe.gtid_subset(oracle, gtid_b, gtid_a).await {
                Some(true) => continue,
                Some(false) => {
                    dominates_all = false;
                    break;
                }
                None => return ElectionResult::Ambiguous,
            }
        }
        if dominates_all {
            return ElectionResult::Winner(host_a.clone());
        }
    }

    ElectionResult::Ambiguous
}
