// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3 — SessionRegistry: the in-memory session map, its code/host indices,
//! and the lifecycle operations that mutate them. All mutations happen
//! under a single lock; events are emitted synchronously from the mutator's
//! stack once state is consistent, and are never allowed to block it
//! (`EventBus::emit` is fire-and-forget).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::now_ms;
use crate::error::{ErrorCode, OrchError};
use crate::event::{Event, EventBus};
use crate::persistence::PersistenceObserver;
use crate::security::{JoinSecurityGuard, JoinSecurityReason, LockCheck, RateCheck};
use crate::session::{GuestInfo, GuestStatus, JoinResult, Permission, Session, SessionConfig, SessionGuest, SessionStatus};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const ENDED_RETENTION: Duration = Duration::from_secs(3600);

/// Narrow interface the signaling hub uses to read/mutate session state
/// without depending on the full registry API. Breaks the Signaling ↔
/// Registry reference cycle (see design notes on cyclic references).
pub trait SessionMutator: Send + Sync {
    fn get_session(&self, session_id: uuid::Uuid) -> Option<Session>;
    fn mark_guest_connected(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError>;
    fn end_session(&self, session_id: uuid::Uuid) -> Result<(), OrchError>;
}

/// Narrow interface the registry uses to reach live peers without depending
/// on the signaling hub's transport details.
pub trait PeerNotifier: Send + Sync {
    fn notify_permission_change(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Permission);
    fn notify_session_ended(&self, session_id: uuid::Uuid);
}

#[derive(Default)]
struct Indices {
    sessions: HashMap<uuid::Uuid, Session>,
    by_code: HashMap<String, uuid::Uuid>,
    by_host: HashMap<String, uuid::Uuid>,
}

pub struct SessionRegistry {
    inner: RwLock<Indices>,
    events: EventBus,
    security: Arc<JoinSecurityGuard>,
    persistence: Arc<dyn PersistenceObserver>,
    notifier: RwLock<Option<Arc<dyn PeerNotifier>>>,
}

impl SessionRegistry {
    pub fn new(security: Arc<JoinSecurityGuard>, persistence: Arc<dyn PersistenceObserver>, events: EventBus) -> Self {
        Self { inner: RwLock::new(Indices::default()), events, security, persistence, notifier: RwLock::new(None) }
    }

    pub fn set_notifier(&self, notifier: Arc<dyn PeerNotifier>) {
        *self.notifier.write() = Some(notifier);
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    // -- reads -------------------------------------------------------

    pub fn get_session(&self, session_id: uuid::Uuid) -> Option<Session> {
        self.inner.read().sessions.get(&session_id).cloned()
    }

    pub fn get_active_session(&self, host_user_id: &str) -> Option<Session> {
        let inner = self.inner.read();
        let id = inner.by_host.get(host_user_id)?;
        inner.sessions.get(id).filter(|s| s.status != SessionStatus::Ended).cloned()
    }

    /// Lazy-expiry read: pending guests past the approval window transition
    /// to `expired` as a side effect of this call.
    pub fn list_pending_guests(&self, session_id: uuid::Uuid) -> Result<Vec<SessionGuest>, OrchError> {
        let now = now_ms();
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;

        for guest in session.guests.values_mut() {
            if guest.is_pending_expired(now) {
                guest.status = GuestStatus::Expired;
            }
        }
        let pending: Vec<SessionGuest> = session.guests.values().filter(|g| g.status == GuestStatus::Pending).cloned().collect();
        self.persistence.on_upsert(session);
        Ok(pending)
    }

    // -- mutations -----------------------------------------------------

    pub fn create_session(&self, host_user_id: String, mut config: SessionConfig) -> Result<Session, OrchError> {
        let mut inner = self.inner.write();
        if let Some(id) = inner.by_host.get(&host_user_id) {
            if let Some(existing) = inner.sessions.get(id) {
                if existing.status != SessionStatus::Ended {
                    return Err(OrchError::new(ErrorCode::HostAlreadyHasActiveSession));
                }
            }
        }
        if config.code_ttl_minutes == 0 {
            config.code_ttl_minutes = SessionConfig::default().code_ttl_minutes;
        }

        let code = crate::shortcode::ShortCodeIssuer::generate(|c| inner.by_code.contains_key(c))
            .ok_or_else(|| OrchError::with_detail(ErrorCode::CommandFailed, "short code space exhausted"))?;

        let session = Session::new(host_user_id.clone(), config, code.clone());
        inner.by_code.insert(code.clone(), session.id);
        inner.by_host.insert(host_user_id, session.id);
        inner.sessions.insert(session.id, session.clone());
        self.persistence.on_upsert(&session);
        self.events.emit(Event::SessionCreated {
            session_id: session.id,
            host_user_id: session.host_user_id.clone(),
            code: session.code.clone(),
        });
        Ok(session)
    }

    /// Ordering per spec §4.3: rate check, format validation, code lookup,
    /// expiry, anonymous gate, ended gate, existing-guest reconciliation,
    /// capacity, append.
    pub fn join_session(&self, code: &str, guest_user_id: &str, info: GuestInfo) -> Result<JoinResult, OrchError> {
        // Step 1: rate check is keyed by (session, guest) but we don't know
        // the session yet if the code doesn't resolve. Use a zero UUID
        // bucket for codes that never resolve to a session — this still
        // rate-limits a guest hammering garbage codes without crediting
        // them against a real session's bucket.
        let probe_session = {
            let inner = self.inner.read();
            crate::shortcode::ShortCodeIssuer::validate_format(code)
                .and(inner.by_code.get(&crate::shortcode::ShortCodeIssuer::normalize(code)).copied())
        };
        let rate_scope = probe_session.unwrap_or(uuid::Uuid::nil());
        if matches!(self.security.check_rate(rate_scope, guest_user_id), RateCheck::RateLimited) {
            return Err(OrchError::new(ErrorCode::JoinRateLimitExceeded));
        }

        if matches!(self.security.check_lock(guest_user_id), LockCheck::Locked) {
            self.security.record_blocked();
            self.events.emit(Event::from(crate::security::JoinSecurityEvent {
                guest_id: guest_user_id.to_string(),
                reason: JoinSecurityReason::ActiveLock,
                blocked: true,
            }));
            return Err(OrchError::new(ErrorCode::TooManyInvalidJoinAttempts));
        }

        let Some(_format) = crate::shortcode::ShortCodeIssuer::validate_format(code) else {
            self.flag_invalid(guest_user_id, JoinSecurityReason::InvalidFormat);
            return Err(OrchError::new(ErrorCode::InvalidSessionCode));
        };
        let normalized = crate::shortcode::ShortCodeIssuer::normalize(code);

        let mut inner = self.inner.write();
        let Some(&session_id) = inner.by_code.get(&normalized) else {
            self.flag_invalid(guest_user_id, JoinSecurityReason::CodeUnknown);
            return Err(OrchError::new(ErrorCode::InvalidSessionCode));
        };

        let now = now_ms();
        let Some(session) = inner.sessions.get_mut(&session_id) else {
            // `by_code` points at a session that's gone; treat it the same
            // as an unknown code rather than trust the stale index.
            inner.by_code.remove(&normalized);
            self.flag_invalid(guest_user_id, JoinSecurityReason::CodeUnknown);
            return Err(OrchError::new(ErrorCode::InvalidSessionCode));
        };

        if session.code_is_expired(now) {
            self.flag_invalid(guest_user_id, JoinSecurityReason::CodeExpired);
            return Err(OrchError::new(ErrorCode::InvalidSessionCode));
        }
        if !session.config.allow_anonymous && info.display_name.is_none() {
            return Err(OrchError::new(ErrorCode::AnonymousGuestsNotAllowed));
        }
        if session.status == SessionStatus::Ended {
            return Err(OrchError::new(ErrorCode::SessionHasEnded));
        }

        if let Some(existing) = session.guests.get_mut(guest_user_id) {
            match existing.status {
                GuestStatus::Rejected => return Err(OrchError::new(ErrorCode::GuestRejected)),
                GuestStatus::Approved | GuestStatus::Connected => {
                    return Ok(JoinResult { session_id, guest_user_id: guest_user_id.to_string(), status: existing.status })
                }
                GuestStatus::Pending if !existing.is_pending_expired(now) => {
                    // Still within the approval window: idempotent, no duplicate entry.
                    return Ok(JoinResult { session_id, guest_user_id: guest_user_id.to_string(), status: GuestStatus::Pending });
                }
                GuestStatus::Pending | GuestStatus::Expired => {
                    existing.joined_at = now;
                    existing.status = GuestStatus::Pending;
                    self.persistence.on_upsert(session);
                    self.events.emit(Event::SessionGuestRequest {
                        session_id,
                        guest_user_id: guest_user_id.to_string(),
                    });
                    return Ok(JoinResult { session_id, guest_user_id: guest_user_id.to_string(), status: GuestStatus::Pending });
                }
            }
        }

        if session.is_full() {
            return Err(OrchError::new(ErrorCode::SessionIsFull));
        }

        let default_perm = session.config.default_perm;
        session.guests.insert(
            guest_user_id.to_string(),
            SessionGuest { user_id: guest_user_id.to_string(), info, permission: default_perm, joined_at: now, status: GuestStatus::Pending },
        );
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionGuestRequest { session_id, guest_user_id: guest_user_id.to_string() });
        Ok(JoinResult { session_id, guest_user_id: guest_user_id.to_string(), status: GuestStatus::Pending })
    }

    fn flag_invalid(&self, guest_user_id: &str, reason: JoinSecurityReason) {
        let just_locked = self.security.record_invalid(guest_user_id, reason);
        self.events.emit(Event::from(crate::security::JoinSecurityEvent {
            guest_id: guest_user_id.to_string(),
            reason,
            blocked: false,
        }));
        if just_locked {
            self.events.emit(Event::from(crate::security::JoinSecurityEvent {
                guest_id: guest_user_id.to_string(),
                reason: JoinSecurityReason::ActiveLock,
                blocked: true,
            }));
        }
    }

    pub fn approve_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        let now = now_ms();
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        let guest = session.guests.get_mut(guest_user_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;

        if guest.is_pending_expired(now) {
            guest.status = GuestStatus::Expired;
            self.persistence.on_upsert(session);
            return Err(OrchError::new(ErrorCode::ApprovalWindowExpired));
        }
        if guest.status != GuestStatus::Pending {
            return Err(OrchError::new(ErrorCode::SessionNotFound));
        }
        guest.status = GuestStatus::Approved;
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionGuestApproved { session_id, guest_user_id: guest_user_id.to_string() });
        Ok(())
    }

    pub fn mark_guest_connected_inner(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        let guest = session.guests.get_mut(guest_user_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;

        if guest.status == GuestStatus::Connected {
            return Ok(()); // idempotent
        }
        if guest.status != GuestStatus::Approved {
            return Err(OrchError::new(ErrorCode::SessionNotFound));
        }
        guest.status = GuestStatus::Connected;

        let is_first_connection = session.code.is_some();
        if is_first_connection {
            if let Some(code) = session.code.take() {
                inner.by_code.remove(&code);
            }
            session.allow_new_joins = false;
            session.status = SessionStatus::Active;
        }
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionGuestApproved { session_id, guest_user_id: guest_user_id.to_string() });
        Ok(())
    }

    pub fn regenerate_code(&self, session_id: uuid::Uuid) -> Result<String, OrchError> {
        let mut inner = self.inner.write();
        let old_code = inner.sessions.get(&session_id).and_then(|s| s.code.clone());
        let code = crate::shortcode::ShortCodeIssuer::generate(|c| inner.by_code.contains_key(c))
            .ok_or_else(|| OrchError::with_detail(ErrorCode::CommandFailed, "short code space exhausted"))?;

        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        if let Some(old) = old_code {
            inner.by_code.remove(&old);
        }
        session.code = Some(code.clone());
        session.allow_new_joins = true;
        session.expires_at = now_ms() + session.config.code_ttl_minutes as u64 * 60_000;
        self.persistence.on_upsert(session);
        inner.by_code.insert(code.clone(), session_id);
        Ok(code)
    }

    pub fn revoke_code(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        session.allow_new_joins = false;
        let old_code = session.code.take();
        self.persistence.on_upsert(session);
        if let Some(code) = old_code {
            inner.by_code.remove(&code);
        }
        Ok(())
    }

    pub fn set_allow_new_joins(&self, session_id: uuid::Uuid, allow: bool) -> Result<(), OrchError> {
        if !allow {
            let mut inner = self.inner.write();
            let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
            session.allow_new_joins = false;
            self.persistence.on_upsert(session);
            return Ok(());
        }
        let needs_code = { self.inner.read().sessions.get(&session_id).map(|s| s.code.is_none()).ok_or(OrchError::new(ErrorCode::SessionNotFound))? };
        if needs_code {
            self.regenerate_code(session_id)?;
        }
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        session.allow_new_joins = true;
        self.persistence.on_upsert(session);
        Ok(())
    }

    pub fn reject_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        let guest = session.guests.get_mut(guest_user_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        guest.status = GuestStatus::Rejected;
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionGuestRejected { session_id, guest_user_id: guest_user_id.to_string() });
        Ok(())
    }

    pub fn kick_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        session.guests.shift_remove(guest_user_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionGuestKicked { session_id, guest_user_id: guest_user_id.to_string() });
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify_permission_change(session_id, guest_user_id, Permission::ReadOnly);
        }
        Ok(())
    }

    pub fn set_guest_permission(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Permission) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        let guest = session.guests.get_mut(guest_user_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        guest.permission = permission;
        self.persistence.on_upsert(session);
        self.events.emit(Event::SessionPermissionChanged { session_id, guest_user_id: guest_user_id.to_string(), read_write: permission == Permission::ReadWrite });
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify_permission_change(session_id, guest_user_id, permission);
        }
        Ok(())
    }

    /// Ends the session but keeps its (now terminal) row in the map for up
    /// to an hour, so a racing `GetSession` still observes `status=ended`
    /// instead of `not found`; the sweeper reaps it afterward.
    pub fn end_session_inner(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(&session_id).ok_or(OrchError::new(ErrorCode::SessionNotFound))?;
        if let Some(code) = session.code.take() {
            inner.by_code.remove(&code);
        }
        session.allow_new_joins = false;
        session.status = SessionStatus::Ended;
        session.ended_at = Some(now_ms());
        let host_user_id = session.host_user_id.clone();
        inner.by_host.remove(&host_user_id);

        self.persistence.on_delete(session_id);
        self.events.emit(Event::SessionEnded { session_id });
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify_session_ended(session_id);
        }
        Ok(())
    }

    /// Re-indexes a session rehydrated from persistence: `code→id` and
    /// `host→id`, preserving its guest list verbatim.
    pub fn restore_session(&self, session: Session) {
        let mut inner = self.inner.write();
        if let Some(code) = &session.code {
            inner.by_code.insert(code.clone(), session.id);
        }
        inner.by_host.insert(session.host_user_id.clone(), session.id);
        inner.sessions.insert(session.id, session);
    }

    /// Drops waiting sessions past `expiresAt` and ended sessions older than
    /// an hour. Runs once a minute until `shutdown` fires.
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("session registry sweeper shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }
    }

    fn sweep_once(&self) {
        let now = now_ms();
        let mut inner = self.inner.write();
        let stale: Vec<uuid::Uuid> = inner
            .sessions
            .values()
            .filter(|s| match s.status {
                SessionStatus::Waiting => s.code_is_expired(now),
                SessionStatus::Ended => {
                    s.ended_at.map(|ended| now.saturating_sub(ended) >= ENDED_RETENTION.as_millis() as u64).unwrap_or(true)
                }
                SessionStatus::Active => false,
            })
            .map(|s| s.id)
            .collect();

        for id in stale {
            if let Some(mut session) = inner.sessions.remove(&id) {
                if let Some(code) = session.code.take() {
                    inner.by_code.remove(&code);
                }
                inner.by_host.remove(&session.host_user_id);
                self.persistence.on_delete(id);
                info!(session_id = %id, "swept expired session");
            }
        }
    }
}

impl SessionMutator for SessionRegistry {
    fn get_session(&self, session_id: uuid::Uuid) -> Option<Session> {
        SessionRegistry::get_session(self, session_id)
    }

    fn mark_guest_connected(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        self.mark_guest_connected_inner(session_id, guest_user_id)
    }

    fn end_session(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        self.end_session_inner(session_id)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
