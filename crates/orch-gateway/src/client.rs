// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP delegate for the session API, used when this process is not the
//! owner of the shared gateway port (see [`crate::state`]).

use orch_core::error::ErrorCode;
use orch_core::session::{GuestInfo, JoinResult, Permission, Session, SessionConfig, SessionGuest};
use orch_core::OrchError;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            http: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, OrchError> {
        if resp.status().is_success() {
            resp.json::<T>().await.map_err(|err| OrchError::with_detail(ErrorCode::Unknown, err.to_string()))
        } else {
            match resp.json::<ErrorBody>().await {
                Ok(body) => Err(OrchError::with_detail(ErrorCode::from_message(&body.error), body.error)),
                Err(err) => Err(OrchError::with_detail(ErrorCode::Unknown, err.to_string())),
            }
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: serde_json::Value) -> Result<T, OrchError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| OrchError::with_detail(ErrorCode::ServiceUnavailable, err.to_string()))?;
        Self::decode(resp).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, OrchError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await
            .map_err(|err| OrchError::with_detail(ErrorCode::ServiceUnavailable, err.to_string()))?;
        Self::decode(resp).await
    }

    pub async fn create_session(&self, host_user_id: &str, config: SessionConfig) -> Result<Session, OrchError> {
        self.post("/api/session/create", json!({ "hostUserID": host_user_id, "config": config })).await
    }

    pub async fn join_session(&self, code: &str, guest_user_id: &str, guest_info: GuestInfo) -> Result<JoinResult, OrchError> {
        self.post("/api/session/join", json!({ "code": code, "guestUserID": guest_user_id, "guestInfo": guest_info })).await
    }

    pub async fn approve_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        self.post("/api/session/approve", json!({ "sessionID": session_id, "guestUserID": guest_user_id })).await
    }

    pub async fn reject_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        self.post("/api/session/reject", json!({ "sessionID": session_id, "guestUserID": guest_user_id })).await
    }

    pub async fn end_session(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        self.post("/api/session/end", json!({ "sessionID": session_id })).await
    }

    pub async fn kick_guest(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        self.post("/api/session/kick", json!({ "sessionID": session_id, "guestUserID": guest_user_id })).await
    }

    pub async fn set_permission(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Permission) -> Result<(), OrchError> {
        self.post("/api/session/permission", json!({ "sessionID": session_id, "guestUserID": guest_user_id, "permission": permission })).await
    }

    pub async fn get_session(&self, session_id: uuid::Uuid) -> Result<Session, OrchError> {
        let id = session_id.to_string();
        self.get("/api/session/get", &[("sessionID", id.as_str())]).await
    }

    pub async fn get_active_session(&self, user_id: &str) -> Result<Option<Session>, OrchError> {
        self.get("/api/session/active", &[("userID", user_id)]).await
    }

    pub async fn list_pending_guests(&self, session_id: uuid::Uuid) -> Result<Vec<SessionGuest>, OrchError> {
        let id = session_id.to_string();
        self.get("/api/session/pending", &[("sessionID", id.as_str())]).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
