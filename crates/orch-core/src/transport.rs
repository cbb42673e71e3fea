// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C11 — the loopback HTTP gateway: exposes `SessionRegistry` operations as
//! JSON endpoints so a second local process (see `orch-gateway`) can act as
//! a client while this one owns the registry.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::OrchError;
use crate::orchestrator::Orchestrator;
use crate::session::{GuestInfo, Permission, Session, SessionConfig};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/session/create", post(create_session))
        .route("/api/session/join", post(join_session))
        .route("/api/session/approve", post(approve_guest))
        .route("/api/session/reject", post(reject_guest))
        .route("/api/session/end", post(end_session))
        .route("/api/session/kick", post(kick_guest))
        .route("/api/session/permission", post(set_permission))
        .route("/api/session/get", get(get_session))
        .route("/api/session/active", get(get_active_session))
        .route("/api/session/pending", get(list_pending_guests))
        .with_state(AppState { orchestrator })
}

/// `{error: string}` per spec §6 — the user-facing message only, never the
/// technical detail.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

struct ApiError(OrchError);

impl From<OrchError> for ApiError {
    fn from(err: OrchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { error: self.0.message() })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
struct CreateSessionRequest {
    #[serde(rename = "hostUserID")]
    host_user_id: String,
    #[serde(default)]
    config: Option<SessionConfig>,
}

async fn create_session(State(state): State<AppState>, Json(req): Json<CreateSessionRequest>) -> ApiResult<Session> {
    let session = state.orchestrator.registry.create_session(req.host_user_id, req.config.unwrap_or_default())?;
    Ok(Json(session))
}

#[derive(Deserialize)]
struct JoinSessionRequest {
    code: String,
    #[serde(rename = "guestUserID")]
    guest_user_id: String,
    #[serde(default, rename = "guestInfo")]
    guest_info: GuestInfo,
}

async fn join_session(State(state): State<AppState>, Json(req): Json<JoinSessionRequest>) -> ApiResult<crate::session::JoinResult> {
    let result = state.orchestrator.registry.join_session(&req.code, &req.guest_user_id, req.guest_info)?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct SessionGuestRequest {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
    #[serde(rename = "guestUserID")]
    guest_user_id: String,
}

#[derive(Serialize)]
struct Empty {}

async fn approve_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    state.orchestrator.registry.approve_guest(req.session_id, &req.guest_user_id)?;
    Ok(Json(Empty {}))
}

async fn reject_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    state.orchestrator.registry.reject_guest(req.session_id, &req.guest_user_id)?;
    Ok(Json(Empty {}))
}

async fn kick_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    state.orchestrator.registry.kick_guest(req.session_id, &req.guest_user_id)?;
    state.orchestrator.permissions.revoke_all(req.session_id, &req.guest_user_id);
    Ok(Json(Empty {}))
}

#[derive(Deserialize)]
struct EndSessionRequest {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn end_session(State(state): State<AppState>, Json(req): Json<EndSessionRequest>) -> ApiResult<Empty> {
    state.orchestrator.registry.end_session_inner(req.session_id)?;
    Ok(Json(Empty {}))
}

#[derive(Deserialize)]
struct SetPermissionRequest {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
    #[serde(rename = "guestUserID")]
    guest_user_id: String,
    permission: Permission,
}

async fn set_permission(State(state): State<AppState>, Json(req): Json<SetPermissionRequest>) -> ApiResult<Empty> {
    state.orchestrator.registry.set_guest_permission(req.session_id, &req.guest_user_id, req.permission)?;
    state.orchestrator.permissions.propagate_all(req.session_id, &req.guest_user_id, Some(req.permission));
    Ok(Json(Empty {}))
}

#[derive(Deserialize)]
struct GetSessionQuery {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn get_session(State(state): State<AppState>, Query(q): Query<GetSessionQuery>) -> ApiResult<Session> {
    let session = state.orchestrator.registry.get_session(q.session_id).ok_or(OrchError::new(crate::error::ErrorCode::SessionNotFound))?;
    Ok(Json(session))
}

#[derive(Deserialize)]
struct GetActiveQuery {
    #[serde(rename = "userID")]
    user_id: String,
}

async fn get_active_session(State(state): State<AppState>, Query(q): Query<GetActiveQuery>) -> ApiResult<Option<Session>> {
    Ok(Json(state.orchestrator.registry.get_active_session(&q.user_id)))
}

#[derive(Deserialize)]
struct PendingQuery {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn list_pending_guests(
    State(state): State<AppState>,
    Query(q): Query<PendingQuery>,
) -> ApiResult<Vec<crate::session::SessionGuest>> {
    let pending = state.orchestrator.registry.list_pending_guests(q.session_id)?;
    Ok(Json(pending))
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
