// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6 — PermissionPropagator: resolves a guest's effective permission on a
//! terminal and pushes it down to the PTY layer, enforcing workspace scope.

use std::sync::Arc;

use crate::error::{ErrorCode, OrchError};
use crate::session::registry::SessionRegistry;
use crate::session::{GuestStatus, Permission};
use crate::terminal::TerminalBinding;

/// Port to the PTY engine. The engine itself (process spawn, byte
/// streaming) lives outside this crate; this is the narrow seam
/// PermissionPropagator pushes resolved permissions through.
pub trait PtyPermissionSink: Send + Sync {
    fn set_permission(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Option<Permission>);
}

pub struct PermissionPropagator {
    registry: Arc<SessionRegistry>,
    terminals: Arc<TerminalBinding>,
    sink: Arc<dyn PtyPermissionSink>,
}

impl PermissionPropagator {
    pub fn new(registry: Arc<SessionRegistry>, terminals: Arc<TerminalBinding>, sink: Arc<dyn PtyPermissionSink>) -> Self {
        Self { registry, terminals, sink }
    }

    /// Resolve `(terminal_session_id, guest_user_id)` against the host's
    /// active session and the terminal's bound workspace. Returns the
    /// effective permission, or an error describing why access is denied.
    pub fn resolve(&self, host_user_id: &str, terminal_session_id: &str, guest_user_id: &str) -> Result<Permission, OrchError> {
        let session = self.registry.get_active_session(host_user_id).ok_or(OrchError::new(ErrorCode::NoActiveSession))?;

        let guest = session.guests.get(guest_user_id).ok_or(OrchError::new(ErrorCode::NoActiveSession))?;
        if !matches!(guest.status, GuestStatus::Approved | GuestStatus::Connected) {
            return Err(OrchError::new(ErrorCode::NoActiveSession));
        }
        let effective = if guest.permission == Permission::ReadWrite { Permission::ReadWrite } else { Permission::ReadOnly };

        if let Some(workspace_id) = session.config.workspace_id {
            let bound_workspace = self.terminals.workspace_of(terminal_session_id);
            if bound_workspace != Some(workspace_id) {
                return Err(OrchError::with_detail(
                    ErrorCode::WorkspaceScopeDenied,
                    format!("terminal {terminal_session_id} is outside scoped workspace {workspace_id}"),
                ));
            }
        }

        self.sink.set_permission(session.id, guest_user_id, Some(effective));
        Ok(effective)
    }

    /// Fan the current effective permission out to every live PTY for this
    /// guest, e.g. after `SetGuestPermission` or a status change.
    pub fn propagate_all(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Option<Permission>) {
        self.sink.set_permission(session_id, guest_user_id, permission);
    }

    /// Kick/session-end path: revoke access to every PTY for this guest.
    pub fn revoke_all(&self, session_id: uuid::Uuid, guest_user_id: &str) {
        self.sink.set_permission(session_id, guest_user_id, None);
    }
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
