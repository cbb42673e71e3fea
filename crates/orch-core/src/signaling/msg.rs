// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire frame for `/ws/signal`. Unknown `type` values are accepted at the
//! transport boundary and ignored by the hub (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default, rename = "targetUserID")]
    pub target_user_id: Option<String>,
    #[serde(default, rename = "fromUserID")]
    pub from_user_id: Option<String>,
    #[serde(default, rename = "sessionID")]
    pub session_id: Option<uuid::Uuid>,
}

impl SignalFrame {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), payload: None, target_user_id: None, from_user_id: None, session_id: None }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_target(mut self, target_user_id: impl Into<String>) -> Self {
        self.target_user_id = Some(target_user_id.into());
        self
    }

    pub fn with_from(mut self, from_user_id: impl Into<String>) -> Self {
        self.from_user_id = Some(from_user_id.into());
        self
    }
}

pub const TYPE_SDP_OFFER: &str = "sdp_offer";
pub const TYPE_SDP_ANSWER: &str = "sdp_answer";
pub const TYPE_ICE_CANDIDATE: &str = "ice_candidate";
pub const TYPE_GUEST_REQUEST: &str = "guest_request";
pub const TYPE_GUEST_APPROVED: &str = "guest_approved";
pub const TYPE_GUEST_REJECTED: &str = "guest_rejected";
pub const TYPE_PEER_CONNECTED: &str = "peer_connected";
pub const TYPE_SESSION_ENDED: &str = "session_ended";
pub const TYPE_PERMISSION_CHANGE: &str = "permission_change";
