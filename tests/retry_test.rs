// tests/retry_test.rs

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use topoward::core::cancellation::CancellationToken;
use topoward::core::retry::{retry, RetryPolicy};

#[tokio::test]
async fn bounded_retry_returns_last_result_when_budget_exhausted() {
    let cancel = CancellationToken::new();
    let attempts = AtomicU32::new(0);

    let policy = RetryPolicy::bounded(Duration::from_millis(1), 3);
    let result = retry(
        policy,
        &cancel,
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            false
        },
        |ok| *ok,
    )
    .await;

    assert!(!result);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_returns_immediately_on_first_success() {
    let cancel = CancellationToken::new();
    let attempts = AtomicU32::new(0);

    let policy = RetryPolicy::bounded(Duration::from_secs(10), 5);
    let result = retry(
        policy,
        &cancel,
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            true
        },
        |ok| *ok,
    )
    .await;

    assert!(result);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_stops_an_unbounded_retry() {
    let cancel = CancellationToken::new();
    let attempts = AtomicU32::new(0);

    cancel.cancel();

    let policy = RetryPolicy::unbounded(Duration::from_secs(60));
    let result = retry(
        policy,
        &cancel,
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            false
        },
        |ok| *ok,
    )
    .await;

    assert!(!result);
    // A single attempt is made; the harness must not sleep past a shutdown request.
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
