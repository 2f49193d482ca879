// tests/control_loop_test.rs
//
// End-to-end scenarios against the control loop, driven entirely by the
// in-memory fakes (no live database or proxy).

use topoward::core::cancellation::CancellationToken;
use topoward::core::config::Config;
use topoward::core::control_loop::ControlLoopState;
use topoward::core::node::{GtidSet, ReplicaOutcome, Status};
use topoward::core::testing::{FakeNode, FakeNodeProbe, FakeProxyAdminClient, RecordingNotifier};

fn test_config() -> Config {
    Config {
        // Outside 0..=23 so the daily-report gate never fires mid-test.
        report_hour: 99,
        master_retries: 1,
        master_retry_delay: std::time::Duration::from_millis(1),
        ..Config::default()
    }
}

fn healthy_replica(source_ok: bool) -> FakeNode {
    FakeNode {
        reachable: true,
        gtid: Some(GtidSet::new("uuid:1-1")),
        replication_status: None,
        configure_replica_outcome: if source_ok {
            ReplicaOutcome::Healthy
        } else {
            ReplicaOutcome::PersistentFailure
        },
    }
}

// S1: clean startup, three nodes, all healthy — no proxy writes beyond the
// per-replica reconcile's idempotent status confirmation, no notification.
#[tokio::test]
async fn s1_clean_startup_three_nodes() {
    let probe = FakeNodeProbe::new();
    probe.set("a", FakeNode { reachable: true, ..Default::default() });
    probe.set("b", healthy_replica(true));
    probe.set("c", healthy_replica(true));

    let proxy = FakeProxyAdminClient::new();
    proxy.seed_writer("a");
    proxy.seed_reader("b");
    proxy.seed_reader("c");

    let notifier = RecordingNotifier::new();
    let cancel = CancellationToken::new();
    let mut state = ControlLoopState::new(test_config());

    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.primary.as_deref(), Some("a"));
    assert_eq!(snapshot.statuses.get("a"), Some(&Status::Online));
    assert_eq!(snapshot.statuses.get("b"), Some(&Status::Online));
    assert_eq!(snapshot.statuses.get("c"), Some(&Status::Online));
    assert!(notifier.subjects().is_empty());
}

// S2: primary failure with a clean, unambiguous election.
#[tokio::test]
async fn s2_primary_failure_clean_election() {
    let probe = FakeNodeProbe::new();
    probe.set("a", FakeNode { reachable: true, ..Default::default() });
    probe.set("b", healthy_replica(true));
    probe.set("c", healthy_replica(true));

    let proxy = FakeProxyAdminClient::new();
    proxy.seed_writer("a");
    proxy.seed_reader("b");
    proxy.seed_reader("c");

    let notifier = RecordingNotifier::new();
    let cancel = CancellationToken::new();
    let mut state = ControlLoopState::new(test_config());

    // Establish the baseline (S1) first.
    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    // A dies; B's GTID dominates C's.
    probe.set("a", FakeNode { reachable: false, ..Default::default() });
    let gtid_b = GtidSet::new("uuid:1-10");
    let gtid_c = GtidSet::new("uuid:1-5");
    probe.set(
        "b",
        FakeNode {
            reachable: true,
            gtid: Some(gtid_b.clone()),
            replication_status: None,
            configure_replica_outcome: ReplicaOutcome::Healthy,
        },
    );
    probe.set(
        "c",
        FakeNode {
            reachable: true,
            gtid: Some(gtid_c.clone()),
            replication_status: None,
            configure_replica_outcome: ReplicaOutcome::Healthy,
        },
    );
    probe.declare_subset(&gtid_c, &gtid_b, true);
    probe.declare_subset(&gtid_b, &gtid_c, false);

    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.primary.as_deref(), Some("b"));
    assert_eq!(snapshot.statuses.get("a"), Some(&Status::Offline));
    assert_eq!(snapshot.statuses.get("b"), Some(&Status::Online));
    assert_eq!(snapshot.statuses.get("c"), Some(&Status::Online));
    assert_eq!(proxy.get_writer(dummy_groups()).await.unwrap().as_deref(), Some("b"));
    assert_eq!(notifier.subjects(), vec!["ALERT: MySQL Topology Change Detected".to_string()]);
}

// S4: a replica's SQL thread fails persistently; it is quarantined.
#[tokio::test]
async fn s4_replica_breaks() {
    let probe = FakeNodeProbe::new();
    probe.set("a", FakeNode { reachable: true, ..Default::default() });
    probe.set("b", healthy_replica(true));
    probe.set("c", healthy_replica(true));

    let proxy = FakeProxyAdminClient::new();
    proxy.seed_writer("a");
    proxy.seed_reader("b");
    proxy.seed_reader("c");

    let notifier = RecordingNotifier::new();
    let cancel = CancellationToken::new();
    let mut state = ControlLoopState::new(test_config());

    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    probe.set("c", healthy_replica(false));
    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.statuses.get("c"), Some(&Status::Broken));
    assert_eq!(notifier.subjects(), vec!["ALERT: MySQL Topology Change Detected".to_string()]);
}

// S6: five recognized nodes, three become unreachable simultaneously —
// quorum loss refuses promotion and clears the primary pointer.
#[tokio::test]
async fn s6_quorum_loss() {
    let probe = FakeNodeProbe::new();
    probe.set("a", FakeNode { reachable: true, ..Default::default() });
    for host in ["b", "c", "d", "e"] {
        probe.set(host, healthy_replica(true));
    }

    let proxy = FakeProxyAdminClient::new();
    proxy.seed_writer("a");
    for host in ["b", "c", "d", "e"] {
        proxy.seed_reader(host);
    }

    let notifier = RecordingNotifier::new();
    let cancel = CancellationToken::new();
    let mut state = ControlLoopState::new(test_config());

    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    // a, b, c become unreachable; d and e remain.
    for host in ["a", "b", "c"] {
        probe.set(host, FakeNode { reachable: false, ..Default::default() });
    }

    state.tick(&probe, &proxy, &notifier, &cancel).await.unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.primary, None);
    assert_eq!(proxy.get_writer(dummy_groups()).await.unwrap().as_deref(), Some("a"));
}

fn dummy_groups() -> topoward::core::proxy::RoutingGroups {
    topoward::core::proxy::RoutingGroups {
        writer: 10,
        reader: 20,
        quarantine: 30,
    }
}
