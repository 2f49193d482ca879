// tests/lock_test.rs

use topoward::core::lock::{acquire_on_start, release_on_shutdown};
use topoward::core::testing::{FakeProxyAdminClient, FailingProxyAdminClient, ScriptedConfirmer};

// S1-adjacent: clean start, no prior lock, no confirmation needed.
#[tokio::test]
async fn clean_start_acquires_the_lock_without_asking() {
    let proxy = FakeProxyAdminClient::new();
    let confirmer = ScriptedConfirmer(false);

    let outcome = acquire_on_start(&proxy, &confirmer, false).await.unwrap();

    assert!(!outcome.dangerous);
    assert!(outcome.proceed);
    assert_eq!(proxy.kv_get("lock").await.unwrap().as_deref(), Some("1"));
}

// B1: lock present, ignore_start_warning=false must consult the confirmer.
#[tokio::test]
async fn stale_lock_with_operator_confirmation_proceeds() {
    let proxy = FakeProxyAdminClient::new();
    proxy.kv_upsert("lock", "1").await.unwrap();
    let confirmer = ScriptedConfirmer(true);

    let outcome = acquire_on_start(&proxy, &confirmer, false).await.unwrap();

    assert!(outcome.dangerous);
    assert!(outcome.proceed);
}

// B1: lock present, ignore_start_warning=false, operator declines.
#[tokio::test]
async fn stale_lock_with_operator_refusal_aborts() {
    let proxy = FakeProxyAdminClient::new();
    proxy.kv_upsert("lock", "1").await.unwrap();
    let confirmer = ScriptedConfirmer(false);

    let outcome = acquire_on_start(&proxy, &confirmer, false).await.unwrap();

    assert!(outcome.dangerous);
    assert!(!outcome.proceed);
}

// S5: lock present, --ignore-start-warning=true must not consult the
// confirmer at all and proceeds unconditionally.
#[tokio::test]
async fn ignore_start_warning_skips_confirmation() {
    let proxy = FakeProxyAdminClient::new();
    proxy.kv_upsert("lock", "1").await.unwrap();
    // Scripted to refuse, to prove it is never consulted when the flag is set.
    let confirmer = ScriptedConfirmer(false);

    let outcome = acquire_on_start(&proxy, &confirmer, true).await.unwrap();

    assert!(outcome.dangerous);
    assert!(outcome.proceed);
    assert_eq!(proxy.kv_get("lock").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn orderly_shutdown_releases_the_lock() {
    let proxy = FakeProxyAdminClient::new();
    proxy.kv_upsert("lock", "1").await.unwrap();

    release_on_shutdown(&proxy).await.unwrap();

    assert_eq!(proxy.kv_get("lock").await.unwrap(), None);
}

#[tokio::test]
async fn kv_init_failure_propagates_before_any_lock_inspection() {
    let proxy = FailingProxyAdminClient;
    let confirmer = ScriptedConfirmer(true);

    let result = acquire_on_start(&proxy, &confirmer, false).await;

    assert!(result.is_err());
}
