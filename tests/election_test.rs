// tests/election_test.rs

use std::collections::BTreeMap;

use topoward::core::election::{elect, ElectionResult};
use topoward::core::node::GtidSet;
use topoward::core::testing::FakeNodeProbe;

#[tokio::test]
async fn winner_is_the_candidate_that_dominates_all_others() {
    let probe = FakeNodeProbe::new();
    let gtid_b = GtidSet::new("uuid:1-10");
    let gtid_c = GtidSet::new("uuid:1-5");
    probe.declare_subset(&gtid_c, &gtid_b, true);
    probe.declare_subset(&gtid_b, &gtid_c, false);

    let mut candidates = BTreeMap::new();
    candidates.insert("b".to_string(), gtid_b);
    candidates.insert("c".to_string(), gtid_c);

    let result = elect(&candidates, &probe).await;
    assert_eq!(result, ElectionResult::Winner("b".to_string()));
}

#[tokio::test]
async fn ambiguous_when_no_candidate_dominates_all_others() {
    let probe = FakeNodeProbe::new();
    let gtid_b = GtidSet::new("uuid:1-10,other:1-3");
    let gtid_c = GtidSet::new("uuid:1-5,other:1-8");
    probe.declare_subset(&gtid_c, &gtid_b, false);
    probe.declare_subset(&gtid_b, &gtid_c, false);

    let mut candidates = BTreeMap::new();
    candidates.insert("b".to_string(), gtid_b);
    candidates.insert("c".to_string(), gtid_c);

    let result = elect(&candidates, &probe).await;
    assert_eq!(result, ElectionResult::Ambiguous);
}

#[tokio::test]
async fn equal_sets_tie_break_to_first_sorted_hostname() {
    let probe = FakeNodeProbe::new();
    let gtid = GtidSet::new("uuid:1-10");

    let mut candidates = BTreeMap::new();
    candidates.insert("a-host".to_string(), gtid.clone());
    candidates.insert("z-host".to_string(), gtid);

    let result = elect(&candidates, &probe).await;
    assert_eq!(result, ElectionResult::Winner("a-host".to_string()));
}

#[tokio::test]
async fn ambiguous_when_oracle_unreachable_for_evaluation() {
    // No subset facts declared at all: every lookup misses and returns None,
    // which must surface as Ambiguous rather than falling back to a lexical
    // comparison of the GTID strings.
    let probe = FakeNodeProbe::new();
    let gtid_b = GtidSet::new("uuid:1-10");
    let gtid_c = GtidSet::new("uuid:1-5");

    let mut candidates = BTreeMap::new();
    candidates.insert("b".to_string(), gtid_b);
    candidates.insert("c".to_string(), gtid_c);

    let result = elect(&candidates, &probe).await;
    assert_eq!(result, ElectionResult::Ambiguous);
}

#[tokio::test]
async fn empty_candidate_set_is_ambiguous() {
    let probe = FakeNodeProbe::new();
    let candidates = BTreeMap::new();
    let result = elect(&candidates, &probe).await;
    assert_eq!(result, ElectionResult::Ambiguous);
}
