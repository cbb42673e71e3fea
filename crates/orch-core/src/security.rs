// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C2 — JoinSecurityGuard: per-guest invalid-attempt lockout and
//! (session,guest)-scoped rate limiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Why a join attempt was flagged, recorded internally for metrics even
/// though the caller only ever sees the generic `invalid session code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinSecurityReason {
    InvalidFormat,
    CodeUnknown,
    CodeExpired,
    ActiveLock,
    RateLimit,
}

/// Emitted for every flagged attempt (`invalid_attempt`) and every outright
/// block (`blocked`).
#[derive(Debug, Clone)]
pub struct JoinSecurityEvent {
    pub guest_id: String,
    pub reason: JoinSecurityReason,
    pub blocked: bool,
}

#[derive(Debug, Default)]
struct InvalidAttemptState {
    count: u32,
    window_start: Option<Instant>,
    lock_until: Option<Instant>,
}

#[derive(Debug, Default)]
struct RateState {
    count: u32,
    window_start: Option<Instant>,
}

/// Aggregated counters for observability (spec §4.2).
#[derive(Debug, Default, Clone, Serialize)]
pub struct SecurityMetrics {
    pub invalid_attempts_total: u64,
    pub invalid_format_attempts_total: u64,
    pub blocked_attempts_total: u64,
    pub lockouts_total: u64,
    pub active_locks: u64,
}

pub struct JoinSecurityGuardConfig {
    pub invalid_window: Duration,
    pub invalid_threshold: u32,
    pub lock_duration: Duration,
    pub rate_window: Duration,
    pub rate_max: u32,
}

impl Default for JoinSecurityGuardConfig {
    fn default() -> Self {
        Self {
            invalid_window: Duration::from_secs(600),
            invalid_threshold: 5,
            lock_duration: Duration::from_secs(600),
            rate_window: Duration::from_secs(60),
            rate_max: 5,
        }
    }
}

/// Two independent state machines keyed differently: invalid-attempt lock
/// is guest-scoped and cross-session; rate limit is (session,guest)-scoped.
pub struct JoinSecurityGuard {
    config: JoinSecurityGuardConfig,
    invalid: Mutex<HashMap<String, InvalidAttemptState>>,
    rate: Mutex<HashMap<(uuid::Uuid, String), RateState>>,
    metrics: Mutex<SecurityMetrics>,
}

/// Outcome of the rate-limit pre-check (step 1 of `JoinSession` ordering).
pub enum RateCheck {
    Ok,
    RateLimited,
}

/// Outcome of the active-lock pre-check.
pub enum LockCheck {
    Ok,
    Locked,
}

impl JoinSecurityGuard {
    pub fn new(config: JoinSecurityGuardConfig) -> Self {
        Self {
            config,
            invalid: Mutex::new(HashMap::new()),
            rate: Mutex::new(HashMap::new()),
            metrics: Mutex::new(SecurityMetrics::default()),
        }
    }

    fn normalize(guest_id: &str) -> String {
        guest_id.trim().to_string()
    }

    /// Step 1: rate check, scoped to (session, guest). Does not count as an
    /// "invalid" attempt even when it fails.
    pub fn check_rate(&self, session_id: uuid::Uuid, guest_id: &str) -> RateCheck {
        let key = (session_id, Self::normalize(guest_id));
        let now = Instant::now();
        let mut rate = self.rate.lock();
        let state = rate.entry(key).or_default();

        let expired = state.window_start.map(|start| now.duration_since(start) >= self.config.rate_window).unwrap_or(true);
        if expired {
            state.window_start = Some(now);
            state.count = 0;
        }

        if state.count >= self.config.rate_max {
            return RateCheck::RateLimited;
        }
        state.count += 1;
        RateCheck::Ok
    }

    /// Active-lock pre-check: must be performed before any other invalid
    /// classification so that a locked guest is rejected uniformly.
    pub fn check_lock(&self, guest_id: &str) -> LockCheck {
        let key = Self::normalize(guest_id);
        let now = Instant::now();
        let mut invalid = self.invalid.lock();
        let state = invalid.entry(key).or_default();

        if let Some(lock_until) = state.lock_until {
            if now < lock_until {
                return LockCheck::Locked;
            }
            // Lock expired: reset counters on next attempt.
            state.lock_until = None;
            state.count = 0;
            state.window_start = None;
        }
        LockCheck::Ok
    }

    /// Record an invalid attempt (bad format, unknown code, or expired
    /// code). Returns `true` if this attempt pushed the guest over the
    /// threshold and a new lock was just established.
    pub fn record_invalid(&self, guest_id: &str, reason: JoinSecurityReason) -> bool {
        let key = Self::normalize(guest_id);
        let now = Instant::now();
        let mut just_locked = false;
        {
            let mut invalid = self.invalid.lock();
            let state = invalid.entry(key).or_default();

            let expired =
                state.window_start.map(|start| now.duration_since(start) >= self.config.invalid_window).unwrap_or(true);
            if expired {
                state.window_start = Some(now);
                state.count = 0;
            }
            state.count += 1;

            if state.count >= self.config.invalid_threshold && state.lock_until.is_none() {
                state.lock_until = Some(now + self.config.lock_duration);
                just_locked = true;
            }
        }

        let mut metrics = self.metrics.lock();
        metrics.invalid_attempts_total += 1;
        if matches!(reason, JoinSecurityReason::InvalidFormat) {
            metrics.invalid_format_attempts_total += 1;
        }
        if just_locked {
            metrics.lockouts_total += 1;
            metrics.active_locks += 1;
        }
        just_locked
    }

    pub fn record_blocked(&self) {
        self.metrics.lock().blocked_attempts_total += 1;
    }

    pub fn metrics(&self) -> SecurityMetrics {
        self.metrics.lock().clone()
    }
}

#[cfg(test)]
#[path = "security_tests.rs"]
mod tests;
