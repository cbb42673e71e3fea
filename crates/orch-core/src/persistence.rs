// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5 — SessionPersistence: crash-recovery snapshots for waiting/active
//! sessions. The actual store is an external collaborator (the embedded
//! relational store named in scope notes); this module only defines the
//! port it must satisfy and a default in-memory implementation used by
//! tests and by single-instance deployments with no durable store wired in.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::clock::now_ms;
use crate::error::OrchError;
use crate::session::{Session, SessionStatus};

const ACTIVE_PERSIST_FOR_MS: u64 = 12 * 60 * 60 * 1000;
const WAITING_PERSIST_FLOOR_MS: u64 = 2 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct PersistedRow {
    pub session: Session,
    pub persist_until: u64,
}

/// Port to the external durable store. Implementations may be backed by
/// the embedded relational store, a file, or (for tests) memory.
pub trait PersistenceStore: Send + Sync {
    fn upsert(&self, row: PersistedRow) -> Result<(), OrchError>;
    fn delete(&self, session_id: uuid::Uuid) -> Result<(), OrchError>;
    fn load_all(&self) -> Result<Vec<PersistedRow>, OrchError>;
}

#[derive(Default)]
pub struct InMemoryPersistenceStore {
    rows: Mutex<HashMap<uuid::Uuid, PersistedRow>>,
}

impl PersistenceStore for InMemoryPersistenceStore {
    fn upsert(&self, row: PersistedRow) -> Result<(), OrchError> {
        self.rows.lock().insert(row.session.id, row);
        Ok(())
    }

    fn delete(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        self.rows.lock().remove(&session_id);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<PersistedRow>, OrchError> {
        Ok(self.rows.lock().values().cloned().collect())
    }
}

/// Registry-side seam: mutations call `on_upsert`/`on_delete` synchronously
/// under the registry lock, so implementations must never block and must
/// swallow their own errors.
pub trait PersistenceObserver: Send + Sync {
    fn on_upsert(&self, session: &Session);
    fn on_delete(&self, session_id: uuid::Uuid);
}

pub struct SessionPersistence {
    store: Arc<dyn PersistenceStore>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self { store }
    }

    /// `waiting -> max(expiresAt, now+2min)`; `active -> now+12h`. Ended
    /// sessions are never persisted (the registry deletes on end). The 12h
    /// figure for active sessions is a convenience default, not load-bearing
    /// for correctness — tune freely.
    pub fn persist_until(session: &Session, now: u64) -> u64 {
        match session.status {
            SessionStatus::Waiting => session.expires_at.max(now + WAITING_PERSIST_FLOOR_MS),
            SessionStatus::Active => now + ACTIVE_PERSIST_FOR_MS,
            SessionStatus::Ended => now,
        }
    }

    /// Rehydrate sessions from the store. Rows whose `persist_until` has
    /// already passed are purged rather than restored. Returns the restored
    /// sessions for the caller to feed into `SessionRegistry::restore_session`.
    pub fn restore(&self) -> Result<Vec<Session>, OrchError> {
        let rows = self.store.load_all()?;
        let now = now_ms();
        let mut restored = Vec::new();
        for row in rows {
            if row.persist_until <= now {
                let _ = self.store.delete(row.session.id);
                continue;
            }
            restored.push(row.session);
        }
        Ok(restored)
    }
}

impl PersistenceObserver for SessionPersistence {
    fn on_upsert(&self, session: &Session) {
        if session.status == SessionStatus::Ended {
            self.on_delete(session.id);
            return;
        }
        let persist_until = Self::persist_until(session, now_ms());
        if let Err(err) = self.store.upsert(PersistedRow { session: session.clone(), persist_until }) {
            warn!(session_id = %session.id, %err, "failed to persist session row");
        }
    }

    fn on_delete(&self, session_id: uuid::Uuid) {
        if let Err(err) = self.store.delete(session_id) {
            warn!(%session_id, %err, "failed to delete persisted session row");
        }
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
