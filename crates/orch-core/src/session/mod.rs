// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3 data model — `Session`, `SessionGuest`, `SessionConfig` and the result
//! types `SessionRegistry` operations hand back to callers.

pub mod registry;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clock::now_ms;

pub const DEFAULT_MAX_GUESTS: u32 = 10;
pub const APPROVAL_WINDOW_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Docker,
    Liveshare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestStatus {
    Pending,
    Approved,
    Connected,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_guests: u32,
    pub default_perm: Permission,
    pub allow_anonymous: bool,
    pub mode: SessionMode,
    /// Required when `mode == Docker`; immutable once the session exists.
    pub workspace_id: Option<u64>,
    pub code_ttl_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_guests: DEFAULT_MAX_GUESTS,
            default_perm: Permission::ReadOnly,
            allow_anonymous: false,
            mode: SessionMode::Liveshare,
            workspace_id: None,
            code_ttl_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestInfo {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGuest {
    pub user_id: String,
    pub info: GuestInfo,
    pub permission: Permission,
    pub joined_at: u64,
    pub status: GuestStatus,
}

impl SessionGuest {
    /// Lazy-expiry check: pending guests past the approval window are
    /// expired as a side effect of being observed, never proactively swept.
    pub fn is_pending_expired(&self, now: u64) -> bool {
        self.status == GuestStatus::Pending && now.saturating_sub(self.joined_at) > APPROVAL_WINDOW_MS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: uuid::Uuid,
    pub code: Option<String>,
    pub host_user_id: String,
    pub status: SessionStatus,
    pub mode: SessionMode,
    pub guests: IndexMap<String, SessionGuest>,
    pub created_at: u64,
    pub expires_at: u64,
    pub config: SessionConfig,
    pub allow_new_joins: bool,
    /// Set when `status` transitions to `Ended`; drives the sweeper's
    /// one-hour retention window for ended rows.
    pub ended_at: Option<u64>,
}

impl Session {
    pub fn new(host_user_id: String, config: SessionConfig, code: String) -> Self {
        let now = now_ms();
        let expires_at = now + config.code_ttl_minutes as u64 * 60_000;
        Self {
            id: uuid::Uuid::new_v4(),
            code: Some(code),
            host_user_id,
            status: SessionStatus::Waiting,
            mode: config.mode,
            guests: IndexMap::new(),
            created_at: now,
            expires_at,
            config,
            allow_new_joins: true,
            ended_at: None,
        }
    }

    /// Active occupancy counts only guests that hold a slot: approved or
    /// connected. Pending requests don't consume capacity.
    pub fn active_guest_count(&self) -> usize {
        self.guests.values().filter(|g| matches!(g.status, GuestStatus::Approved | GuestStatus::Connected)).count()
    }

    pub fn is_full(&self) -> bool {
        self.active_guest_count() >= self.config.max_guests as usize
    }

    pub fn code_is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Returned by `SessionRegistry::join_session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResult {
    pub session_id: uuid::Uuid,
    pub guest_user_id: String,
    pub status: GuestStatus,
}
