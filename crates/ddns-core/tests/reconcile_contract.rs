//! Architectural Contract Test: Record Reconciliation
//!
//! This test verifies that each record is brought to the desired address
//! with the smallest mutation the decision table allows.
//!
//! Constraints verified:
//! - A missing record set is created once, with the TTL, and nothing else
//! - A set already carrying the address is left alone unless it must collapse
//! - Preserving mode appends to multi-value sets; otherwise values are replaced
//! - TTL is only changed when it differs from the last reported TTL
//! - An append does not assume its TTL was applied to an existing set
//!
//! If this test fails, records are being mutated more (or less) than needed.

mod common;

use common::*;
use ddns_core::config::{RecordType, RetryConfig};
use ddns_core::reconcile::TtlChange;
use ddns_core::traits::Zone;
use ddns_core::{CancellationToken, Error, Reconciler, RecordAction, RetryExecutor};
use std::time::Duration;

const DESIRED: &str = "203.0.113.5";

fn zone_ref() -> Zone {
    Zone {
        id: "z1".to_string(),
        name: "example.com".to_string(),
    }
}

fn executor() -> RetryExecutor {
    let policy = RetryConfig {
        attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
    };
    RetryExecutor::new(&policy, Duration::from_secs(5), CancellationToken::new())
}

#[tokio::test(start_paused = true)]
async fn absent_record_is_created_once_with_ttl() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1");
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Created);
    assert!(outcome.previous_values.is_empty());
    assert_eq!(outcome.ttl_change, None);
    assert_eq!(
        provider.mutations(),
        vec![Call::Create {
            name: "home".to_string(),
            ttl: Some(300),
            values: vec![DESIRED.to_string()],
        }],
        "create must be the only mutation, with no follow-up TTL call"
    );
}

#[tokio::test(start_paused = true)]
async fn preserving_mode_leaves_multi_value_set_holding_address_alone() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(300),
        &["198.51.100.1", DESIRED],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Unchanged);
    assert!(provider.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_preserving_mode_collapses_multi_value_set_even_when_address_present() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(300),
        &["198.51.100.1", DESIRED],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, false);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Replaced);
    assert_eq!(
        provider.mutations(),
        vec![Call::SetRecords {
            name: "home".to_string(),
            values: vec![DESIRED.to_string()],
        }]
    );
    let remote = provider.rrset("z1", "home", RecordType::A).unwrap();
    assert_eq!(remote.values, vec![DESIRED.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn preserving_mode_appends_to_multi_value_set_and_keeps_prior_values() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(300),
        &["198.51.100.1", "198.51.100.2"],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Appended);
    assert_eq!(
        outcome.previous_values,
        vec!["198.51.100.1".to_string(), "198.51.100.2".to_string()]
    );
    assert_eq!(
        provider.mutations(),
        vec![Call::AddRecords {
            name: "home".to_string(),
            values: vec![DESIRED.to_string()],
            ttl: Some(300),
        }]
    );
    assert_eq!(outcome.ttl_change, None);

    let remote = provider.rrset("z1", "home", RecordType::A).unwrap();
    assert_eq!(remote.values.len(), 3);
    assert!(remote.contains("198.51.100.1"));
    assert!(remote.contains("198.51.100.2"));
    assert!(remote.contains(DESIRED));
}

#[tokio::test(start_paused = true)]
async fn append_with_different_ttl_is_followed_by_ttl_change() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "vpn",
        RecordType::A,
        Some(3600),
        &["198.51.100.1", "198.51.100.2"],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "vpn", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Appended);
    assert_eq!(
        outcome.ttl_change,
        Some(TtlChange {
            from: Some(3600),
            to: 300
        })
    );
    assert_eq!(
        provider.mutations(),
        vec![
            Call::AddRecords {
                name: "vpn".to_string(),
                values: vec![DESIRED.to_string()],
                ttl: Some(300),
            },
            Call::ChangeTtl {
                name: "vpn".to_string(),
                ttl: 300,
            },
        ]
    );
    assert_eq!(provider.rrset("z1", "vpn", RecordType::A).unwrap().ttl, Some(300));
}

#[tokio::test(start_paused = true)]
async fn single_stale_value_is_replaced_even_when_preserving() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(300),
        &["198.51.100.1"],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Replaced);
    assert_eq!(outcome.previous_values, vec!["198.51.100.1".to_string()]);
    assert_eq!(
        provider.mutations(),
        vec![Call::SetRecords {
            name: "home".to_string(),
            values: vec![DESIRED.to_string()],
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn ttl_only_drift_issues_only_a_ttl_change() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(600),
        &[DESIRED],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Unchanged);
    assert_eq!(
        outcome.ttl_change,
        Some(TtlChange {
            from: Some(600),
            to: 300
        })
    );
    assert_eq!(
        provider.mutations(),
        vec![Call::ChangeTtl {
            name: "home".to_string(),
            ttl: 300,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn replace_with_different_ttl_changes_values_then_ttl() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        None,
        &["198.51.100.1"],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(120))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Replaced);
    assert_eq!(outcome.ttl_change, Some(TtlChange { from: None, to: 120 }));
    assert_eq!(
        provider.mutations(),
        vec![
            Call::SetRecords {
                name: "home".to_string(),
                values: vec![DESIRED.to_string()],
            },
            Call::ChangeTtl {
                name: "home".to_string(),
                ttl: 120,
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unmanaged_ttl_is_never_touched() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(86400),
        &[DESIRED],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, None)
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Unchanged);
    assert_eq!(outcome.ttl_change, None);
    assert!(provider.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_values_are_compared_after_trimming() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(300),
        &[" 203.0.113.5 "],
    );
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, false);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Unchanged);
    assert!(provider.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_read_failure_is_retried() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1");
    provider.fail(GET_RRSET, 2);
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, None)
        .await
        .expect("third attempt succeeds");

    assert_eq!(outcome.action, RecordAction::Created);
    assert_eq!(provider.count(|c| matches!(c, Call::GetRRSet { .. })), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_value_step_skips_ttl_step() {
    let provider = FakeZoneProvider::new().with_zone("example.com", "z1").with_rrset(
        "z1",
        "home",
        RecordType::A,
        Some(600),
        &["198.51.100.1"],
    );
    provider.fail(SET_RECORDS, usize::MAX);
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let err = reconciler
        .reconcile(&zone_ref(), "home", RecordType::A, DESIRED, Some(300))
        .await
        .expect_err("set_records never succeeds");

    assert!(matches!(err, Error::UpstreamStatus { status: 503, .. }));
    assert_eq!(provider.count(|c| matches!(c, Call::SetRecords { .. })), 3);
    assert_eq!(provider.count(|c| matches!(c, Call::ChangeTtl { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn aaaa_records_are_reconciled_with_their_own_type() {
    let provider = FakeZoneProvider::new()
        .with_zone("example.com", "z1")
        .with_rrset("z1", "home", RecordType::A, Some(300), &[DESIRED]);
    let retry = executor();
    let reconciler = Reconciler::new(&provider, &retry, true);

    let outcome = reconciler
        .reconcile(&zone_ref(), "home", RecordType::Aaaa, "2001:db8::5", Some(300))
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.action, RecordAction::Created);
    assert!(provider.rrset("z1", "home", RecordType::Aaaa).is_some());
    assert_eq!(
        provider.rrset("z1", "home", RecordType::A).unwrap().values,
        vec![DESIRED.to_string()],
        "the A set is a different record set and must be untouched"
    );
}
