// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn guard() -> JoinSecurityGuard {
    JoinSecurityGuard::new(JoinSecurityGuardConfig {
        invalid_window: Duration::from_secs(600),
        invalid_threshold: 3,
        lock_duration: Duration::from_secs(600),
        rate_window: Duration::from_secs(60),
        rate_max: 2,
    })
}

#[test]
fn rate_limit_allows_up_to_max_then_blocks() {
    let g = guard();
    let session = uuid::Uuid::new_v4();
    assert!(matches!(g.check_rate(session, "alice"), RateCheck::Ok));
    assert!(matches!(g.check_rate(session, "alice"), RateCheck::Ok));
    assert!(matches!(g.check_rate(session, "alice"), RateCheck::RateLimited));
}

#[test]
fn rate_limit_is_scoped_per_session() {
    let g = guard();
    let s1 = uuid::Uuid::new_v4();
    let s2 = uuid::Uuid::new_v4();
    assert!(matches!(g.check_rate(s1, "alice"), RateCheck::Ok));
    assert!(matches!(g.check_rate(s1, "alice"), RateCheck::Ok));
    assert!(matches!(g.check_rate(s1, "alice"), RateCheck::RateLimited));
    // Different session, same guest: independent window.
    assert!(matches!(g.check_rate(s2, "alice"), RateCheck::Ok));
}

#[test]
fn invalid_attempts_lock_after_threshold() {
    let g = guard();
    assert!(matches!(g.check_lock("bob"), LockCheck::Ok));
    assert!(!g.record_invalid("bob", JoinSecurityReason::CodeUnknown));
    assert!(!g.record_invalid("bob", JoinSecurityReason::CodeUnknown));
    // Third attempt crosses threshold of 3.
    assert!(g.record_invalid("bob", JoinSecurityReason::CodeUnknown));
    assert!(matches!(g.check_lock("bob"), LockCheck::Locked));
}

#[test]
fn lock_is_scoped_per_guest() {
    let g = guard();
    for _ in 0..3 {
        g.record_invalid("bob", JoinSecurityReason::CodeUnknown);
    }
    assert!(matches!(g.check_lock("bob"), LockCheck::Locked));
    assert!(matches!(g.check_lock("carol"), LockCheck::Ok));
}

#[test]
fn metrics_aggregate_counts() {
    let g = guard();
    g.record_invalid("bob", JoinSecurityReason::InvalidFormat);
    g.record_invalid("bob", JoinSecurityReason::CodeUnknown);
    g.record_invalid("bob", JoinSecurityReason::CodeUnknown);
    g.record_blocked();

    let m = g.metrics();
    assert_eq!(m.invalid_attempts_total, 3);
    assert_eq!(m.invalid_format_attempts_total, 1);
    assert_eq!(m.lockouts_total, 1);
    assert_eq!(m.active_locks, 1);
    assert_eq!(m.blocked_attempts_total, 1);
}

#[test]
fn guest_id_is_trimmed_before_keying() {
    let g = guard();
    for _ in 0..3 {
        g.record_invalid("  bob  ", JoinSecurityReason::CodeUnknown);
    }
    assert!(matches!(g.check_lock("bob"), LockCheck::Locked));
}

#[test]
fn join_security_event_from_reports_blocked_vs_attempt() {
    let attempt = JoinSecurityEvent { guest_id: "bob".into(), reason: JoinSecurityReason::CodeUnknown, blocked: false };
    let blocked = JoinSecurityEvent { guest_id: "bob".into(), reason: JoinSecurityReason::ActiveLock, blocked: true };

    match crate::event::Event::from(attempt) {
        crate::event::Event::JoinSecurityInvalidAttempt { .. } => {}
        _ => panic!("expected invalid_attempt variant"),
    }
    match crate::event::Event::from(blocked) {
        crate::event::Event::JoinSecurityBlocked { .. } => {}
        _ => panic!("expected blocked variant"),
    }
}
