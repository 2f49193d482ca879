// tests/failover_test.rs

use topoward::core::cancellation::CancellationToken;
use topoward::core::config::Config;
use topoward::core::failover::{run_failover, FailoverOutcome};
use topoward::core::node::GtidSet;
use topoward::core::proxy::RoutingGroups;
use topoward::core::testing::{FakeNode, FakeNodeProbe, FakeProxyAdminClient};

fn groups() -> RoutingGroups {
    RoutingGroups { writer: 10, reader: 20, quarantine: 30 }
}

// S3: two candidates whose GTID sets neither contains the other. No single
// dominating candidate exists, so the election must refuse to promote.
#[tokio::test]
async fn s3_ambiguous_election_refuses_promotion() {
    let probe = FakeNodeProbe::new();
    let gtid_b = GtidSet::new("uuid:1-5:2-1");
    let gtid_c = GtidSet::new("uuid:1-3:3-1");
    probe.set("b", FakeNode { reachable: true, gtid: Some(gtid_b.clone()), ..Default::default() });
    probe.set("c", FakeNode { reachable: true, gtid: Some(gtid_c.clone()), ..Default::default() });
    // Neither set contains the other under the oracle's evaluation.
    probe.declare_subset(&gtid_b, &gtid_c, false);
    probe.declare_subset(&gtid_c, &gtid_b, false);

    let proxy = FakeProxyAdminClient::new();
    let config = Config::default();
    let cancel = CancellationToken::new();

    let outcome = run_failover(
        &["b".to_string(), "c".to_string()],
        3,
        2,
        &probe,
        &proxy,
        groups(),
        &config,
        &cancel,
    )
    .await;

    assert_eq!(outcome, FailoverOutcome::Ambiguous);
    assert_eq!(proxy.get_writer(groups()).await.unwrap(), None);
}

#[tokio::test]
async fn quorum_loss_is_checked_before_any_candidate_is_consulted() {
    let probe = FakeNodeProbe::new();
    let proxy = FakeProxyAdminClient::new();
    let config = Config::default();
    let cancel = CancellationToken::new();

    let outcome = run_failover(&["b".to_string()], 5, 1, &probe, &proxy, groups(), &config, &cancel).await;

    assert_eq!(outcome, FailoverOutcome::QuorumLoss { online: 1, quorum: 3 });
}

// B2: with a single recognized node (N=1), quorum is floor(1/2)+1 = 1. Losing
// that only node leaves zero online, which is below quorum, so failover must
// refuse to promote and the primary stays unknown rather than promoting
// something out of a single remaining replica.
#[tokio::test]
async fn b2_single_node_quorum_loss_yields_no_promotion() {
    let probe = FakeNodeProbe::new();
    let proxy = FakeProxyAdminClient::new();
    let config = Config::default();
    let cancel = CancellationToken::new();

    let outcome = run_failover(&[], 1, 0, &probe, &proxy, groups(), &config, &cancel).await;

    assert_eq!(outcome, FailoverOutcome::QuorumLoss { online: 0, quorum: 1 });
    assert_eq!(proxy.get_writer(groups()).await.unwrap(), None);
}

#[tokio::test]
async fn no_candidates_when_none_expose_a_gtid() {
    let probe = FakeNodeProbe::new();
    probe.set("b", FakeNode { reachable: true, gtid: None, ..Default::default() });
    let proxy = FakeProxyAdminClient::new();
    let config = Config::default();
    let cancel = CancellationToken::new();

    let outcome = run_failover(
        &["b".to_string()],
        3,
        2,
        &probe,
        &proxy,
        groups(),
        &config,
        &cancel,
    )
    .await;

    assert_eq!(outcome, FailoverOutcome::NoCandidates);
}

#[tokio::test]
async fn clean_election_promotes_and_writes_through_the_proxy() {
    let probe = FakeNodeProbe::new();
    let gtid_b = GtidSet::new("uuid:1-10");
    let gtid_c = GtidSet::new("uuid:1-5");
    probe.set("b", FakeNode { reachable: true, gtid: Some(gtid_b.clone()), ..Default::default() });
    probe.set("c", FakeNode { reachable: true, gtid: Some(gtid_c.clone()), ..Default::default() });
    probe.declare_subset(&gtid_c, &gtid_b, true);
    probe.declare_subset(&gtid_b, &gtid_c, false);

    let proxy = FakeProxyAdminClient::new();
    let config = Config { db_port: 3306, ..Config::default() };
    let cancel = CancellationToken::new();

    let outcome = run_failover(
        &["b".to_string(), "c".to_string()],
        3,
        2,
        &probe,
        &proxy,
        groups(),
        &config,
        &cancel,
    )
    .await;

    assert_eq!(outcome, FailoverOutcome::Promoted("b".to_string()));
    assert_eq!(proxy.get_writer(groups()).await.unwrap().as_deref(), Some("b"));
}
