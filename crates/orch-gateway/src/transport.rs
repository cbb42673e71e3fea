// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The gateway's own HTTP surface: mirrors orch-core's session API byte for
//! byte so a caller never has to know whether it landed on the owner or a
//! client. Owner-mode handlers call the local registry directly; client-
//! mode handlers delegate over [`GatewayClient`].

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use orch_core::error::OrchError;
use orch_core::session::{GuestInfo, JoinResult, Permission, Session, SessionConfig, SessionGuest};
use orch_core::Orchestrator;
use serde::{Deserialize, Serialize};

use crate::client::GatewayClient;
use crate::state::GatewayMode;

#[derive(Clone)]
enum Backend {
    Owner(Arc<Orchestrator>),
    Client(GatewayClient),
}

#[derive(Clone)]
struct AppState {
    backend: Backend,
}

pub fn router(mode: GatewayMode) -> (Router, Option<tokio::net::TcpListener>) {
    let (backend, listener) = match mode {
        GatewayMode::Owner { orchestrator, listener } => (Backend::Owner(orchestrator), Some(listener)),
        GatewayMode::Client { client } => (Backend::Client(client), None),
    };
    let router = Router::new()
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
        .with_state(AppState { backend });
    (router, listener)
}

/// `{error: string}` per spec §6, same as orch-core's own gateway — the
/// user-facing message only, never technical detail.
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

#[derive(Serialize)]
struct Empty {}

#[derive(Deserialize)]
struct CreateSessionRequest {
    #[serde(rename = "hostUserID")]
    host_user_id: String,
    #[serde(default)]
    config: Option<SessionConfig>,
}

async fn create_session(State(state): State<AppState>, Json(req): Json<CreateSessionRequest>) -> ApiResult<Session> {
    let config = req.config.unwrap_or_default();
    let session = match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.create_session(req.host_user_id, config)?,
        Backend::Client(client) => client.create_session(&req.host_user_id, config).await?,
    };
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

async fn join_session(State(state): State<AppState>, Json(req): Json<JoinSessionRequest>) -> ApiResult<JoinResult> {
    let result = match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.join_session(&req.code, &req.guest_user_id, req.guest_info)?,
        Backend::Client(client) => client.join_session(&req.code, &req.guest_user_id, req.guest_info).await?,
    };
    Ok(Json(result))
}

#[derive(Deserialize)]
struct SessionGuestRequest {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
    #[serde(rename = "guestUserID")]
    guest_user_id: String,
}

async fn approve_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.approve_guest(req.session_id, &req.guest_user_id)?,
        Backend::Client(client) => client.approve_guest(req.session_id, &req.guest_user_id).await?,
    };
    Ok(Json(Empty {}))
}

async fn reject_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.reject_guest(req.session_id, &req.guest_user_id)?,
        Backend::Client(client) => client.reject_guest(req.session_id, &req.guest_user_id).await?,
    };
    Ok(Json(Empty {}))
}

async fn kick_guest(State(state): State<AppState>, Json(req): Json<SessionGuestRequest>) -> ApiResult<Empty> {
    match state.backend {
        Backend::Owner(orchestrator) => {
            orchestrator.registry.kick_guest(req.session_id, &req.guest_user_id)?;
            orchestrator.permissions.revoke_all(req.session_id, &req.guest_user_id);
        }
        Backend::Client(client) => client.kick_guest(req.session_id, &req.guest_user_id).await?,
    };
    Ok(Json(Empty {}))
}

#[derive(Deserialize)]
struct EndSessionRequest {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn end_session(State(state): State<AppState>, Json(req): Json<EndSessionRequest>) -> ApiResult<Empty> {
    match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.end_session_inner(req.session_id)?,
        Backend::Client(client) => client.end_session(req.session_id).await?,
    };
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
    match state.backend {
        Backend::Owner(orchestrator) => {
            orchestrator.registry.set_guest_permission(req.session_id, &req.guest_user_id, req.permission)?;
            orchestrator.permissions.propagate_all(req.session_id, &req.guest_user_id, Some(req.permission));
        }
        Backend::Client(client) => client.set_permission(req.session_id, &req.guest_user_id, req.permission).await?,
    };
    Ok(Json(Empty {}))
}

#[derive(Deserialize)]
struct GetSessionQuery {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn get_session(State(state): State<AppState>, Query(q): Query<GetSessionQuery>) -> ApiResult<Session> {
    let session = match state.backend {
        Backend::Owner(orchestrator) => orchestrator
            .registry
            .get_session(q.session_id)
            .ok_or(OrchError::new(orch_core::ErrorCode::SessionNotFound))?,
        Backend::Client(client) => client.get_session(q.session_id).await?,
    };
    Ok(Json(session))
}

#[derive(Deserialize)]
struct GetActiveQuery {
    #[serde(rename = "userID")]
    user_id: String,
}

async fn get_active_session(State(state): State<AppState>, Query(q): Query<GetActiveQuery>) -> ApiResult<Option<Session>> {
    let session = match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.get_active_session(&q.user_id),
        Backend::Client(client) => client.get_active_session(&q.user_id).await?,
    };
    Ok(Json(session))
}

#[derive(Deserialize)]
struct PendingQuery {
    #[serde(rename = "sessionID")]
    session_id: uuid::Uuid,
}

async fn list_pending_guests(State(state): State<AppState>, Query(q): Query<PendingQuery>) -> ApiResult<Vec<SessionGuest>> {
    let pending = match state.backend {
        Backend::Owner(orchestrator) => orchestrator.registry.list_pending_guests(q.session_id)?,
        Backend::Client(client) => client.list_pending_guests(q.session_id).await?,
    };
    Ok(Json(pending))
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
