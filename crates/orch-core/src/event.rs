// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reserved event names (spec §6) and the non-blocking event bus they travel
//! on. Following the teacher's `channels.state_tx` / `channels.output_tx`
//! pattern, every emitter is a bounded `tokio::sync::broadcast` channel:
//! slow consumers drop the oldest buffered events rather than stalling the
//! mutator that produced them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::security::{JoinSecurityEvent, JoinSecurityReason};

/// A named event reserved by spec §6, carrying whatever payload its kind
/// needs. Variants map 1:1 onto the reserved event-name list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "session:created")]
    SessionCreated { session_id: uuid::Uuid, host_user_id: String, code: Option<String> },
    #[serde(rename = "session:guest_request")]
    SessionGuestRequest { session_id: uuid::Uuid, guest_user_id: String },
    #[serde(rename = "session:guest_approved")]
    SessionGuestApproved { session_id: uuid::Uuid, guest_user_id: String },
    #[serde(rename = "session:guest_rejected")]
    SessionGuestRejected { session_id: uuid::Uuid, guest_user_id: String },
    #[serde(rename = "session:guest_kicked")]
    SessionGuestKicked { session_id: uuid::Uuid, guest_user_id: String },
    #[serde(rename = "session:permission_changed")]
    SessionPermissionChanged { session_id: uuid::Uuid, guest_user_id: String, read_write: bool },
    #[serde(rename = "session:permission_revoked")]
    SessionPermissionRevoked { session_id: uuid::Uuid, guest_user_id: String },
    #[serde(rename = "session:ended")]
    SessionEnded { session_id: uuid::Uuid },
    #[serde(rename = "session:docker_fallback")]
    SessionDockerFallback { session_id: uuid::Uuid, reason: String },
    #[serde(rename = "join_security:invalid_attempt")]
    JoinSecurityInvalidAttempt { guest_id: String, reason: JoinSecurityReason },
    #[serde(rename = "join_security:blocked")]
    JoinSecurityBlocked { guest_id: String, reason: JoinSecurityReason },
    #[serde(rename = "gitpanel:status_changed")]
    GitpanelStatusChanged { repo_root: String, reason: String, source_event: Option<String> },
    #[serde(rename = "gitpanel:conflicts_changed")]
    GitpanelConflictsChanged { repo_root: String },
    #[serde(rename = "gitpanel:history_invalidated")]
    GitpanelHistoryInvalidated { repo_root: String },
    #[serde(rename = "gitpanel:command_result")]
    GitpanelCommandResult(crate::gitqueue::diagnostics::DiagnosticPayload),
    #[serde(rename = "terminal:context_changed")]
    TerminalContextChanged { session_id: String, agent_id: String },
    #[serde(rename = "git:branch_changed")]
    GitBranchChanged { repo_root: String, branch: String },
    #[serde(rename = "git:commit")]
    GitCommit { repo_root: String },
    #[serde(rename = "git:index")]
    GitIndex { repo_root: String, fingerprint: String },
    #[serde(rename = "git:merge")]
    GitMerge { repo_root: String },
    #[serde(rename = "git:fetch")]
    GitFetch { repo_root: String },
}

impl From<JoinSecurityEvent> for Event {
    fn from(e: JoinSecurityEvent) -> Self {
        match e.blocked {
            true => Event::JoinSecurityBlocked { guest_id: e.guest_id, reason: e.reason },
            false => Event::JoinSecurityInvalidAttempt { guest_id: e.guest_id, reason: e.reason },
        }
    }
}

/// Bounded, drop-oldest-on-overflow event bus. Mutators call
/// [`EventBus::emit`] synchronously from within their lock; it never blocks.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Fire-and-forget emit. A `SendError` here only means there are
    /// currently no subscribers; that is not a failure worth surfacing.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
