//! Contract test: reconciler-owned retry policy
//!
//! Transient authority failures are retried up to the configured attempt
//! budget with backoff; fatal failures and auth/validation failures are
//! never retried.

mod common;

use common::*;
use dynup_core::request::ReconcileOutcome;
use std::sync::Arc;

#[tokio::test]
async fn transient_failures_within_budget_recover() {
    let authority = Arc::new(MockZoneAuthority::new());
    authority.fail_next_transient(2);
    let store = Arc::new(StaticSecretStore::new("superg", "hunter2"));
    let reconciler = reconciler(Arc::clone(&authority), store);

    let req = request(
        "host.example.com",
        "superg",
        "hunter2",
        Some("203.0.113.9"),
        None,
    );

    let outcome = reconciler.reconcile(&req).await;
    assert!(matches!(outcome, ReconcileOutcome::Good { .. }), "{outcome:?}");

    // Two failed reads plus the successful third attempt
    assert_eq!(authority.get_call_count(), 3);
    assert_eq!(authority.upsert_call_count(), 1);
}

#[tokio::test]
async fn persistent_transient_failure_exhausts_exactly_the_attempt_budget() {
    let authority = Arc::new(MockZoneAuthority::new());
    authority.always_fail_transient();
    let store = Arc::new(StaticSecretStore::new("superg", "hunter2"));
    let reconciler = reconciler(Arc::clone(&authority), store);

    let req = request(
        "host.example.com",
        "superg",
        "hunter2",
        Some("203.0.113.9"),
        None,
    );

    let outcome = reconciler.reconcile(&req).await;
    assert_eq!(outcome, ReconcileOutcome::AuthorityError);

    // max_attempts = 3 in the test configuration
    assert_eq!(authority.get_call_count(), 3);
    assert_eq!(authority.upsert_call_count(), 0);
}

#[tokio::test]
async fn fatal_failure_is_not_retried() {
    let authority = Arc::new(MockZoneAuthority::new());
    authority.always_fail_fatal();
    let store = Arc::new(StaticSecretStore::new("superg", "hunter2"));
    let reconciler = reconciler(Arc::clone(&authority), store);

    let req = request(
        "host.example.com",
        "superg",
        "hunter2",
        Some("203.0.113.9"),
        None,
    );

    let outcome = reconciler.reconcile(&req).await;
    assert_eq!(outcome, ReconcileOutcome::AuthorityError);
    assert_eq!(authority.get_call_count(), 1, "fatal errors surface immediately");
}

#[tokio::test]
async fn slow_authority_exhausts_the_time_budget() {
    // The whole reconciliation runs under total_budget_ms, so an authority
    // that answers too slowly maps to the generic authority error even
    // without any failed call.
    let authority = Arc::new(MockZoneAuthority::new());
    authority.delay_gets(200);
    let store = Arc::new(StaticSecretStore::new("superg", "hunter2"));
    let mut config = test_config();
    config.retry.total_budget_ms = 10;
    let reconciler = reconciler_with_config(Arc::clone(&authority), store, config);

    let req = request(
        "host.example.com",
        "superg",
        "hunter2",
        Some("203.0.113.9"),
        None,
    );

    let outcome = reconciler.reconcile(&req).await;
    assert_eq!(outcome, ReconcileOutcome::AuthorityError);
    assert_eq!(
        authority.upsert_call_count(),
        0,
        "no write may land after the budget expired"
    );
}

#[tokio::test]
async fn conflicting_change_rejection_is_retried() {
    // The authority rejecting a concurrent conflicting change surfaces as a
    // transient error on the write; the read has already succeeded.
    let authority = Arc::new(MockZoneAuthority::new());
    authority.fail_next_upsert_transient(1);
    let store = Arc::new(StaticSecretStore::new("superg", "hunter2"));
    let reconciler = reconciler(Arc::clone(&authority), store);

    let req = request(
        "host.example.com",
        "superg",
        "hunter2",
        Some("203.0.113.9"),
        None,
    );

    let outcome = reconciler.reconcile(&req).await;
    assert!(matches!(outcome, ReconcileOutcome::Good { .. }));
    assert_eq!(authority.get_call_count(), 1);
    assert_eq!(authority.upsert_call_count(), 2, "rejected write retried once");
}
