// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! axum transport for `/ws/signal`. Pumps frames between the socket and the
//! transport-agnostic [`SignalingHub`]; all routing decisions live there.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::hub::{PeerEvent, PeerHandle, SignalingHub};
use super::msg::{Role, SignalFrame};

#[derive(Clone)]
pub struct SignalingState {
    pub hub: Arc<SignalingHub>,
    /// Empty means "open for development" per spec §6 origin-check rule.
    pub allowed_origins: Vec<String>,
}

impl SignalingState {
    pub fn new(hub: Arc<SignalingHub>, allowed_origins: Vec<String>) -> Self {
        Self { hub, allowed_origins }
    }

    fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        let Some(origin) = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub session: uuid::Uuid,
    pub user: String,
    pub role: Role,
}

pub async fn ws_signal_handler(
    State(state): State<SignalingState>,
    Query(query): Query<SignalQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.origin_allowed(&headers) {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(state, socket, query.session, query.user, query.role))
}

async fn handle_socket(state: SignalingState, socket: WebSocket, session_id: uuid::Uuid, user_id: String, role: Role) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<PeerEvent>();
    let handle = PeerHandle::new(role, tx);
    state.hub.register(session_id, &user_id, role, handle.clone());

    loop {
        tokio::select! {
            event = outbound.recv() => {
                match event {
                    Some(PeerEvent::Frame(frame)) => {
                        let Ok(text) = serde_json::to_string(&frame) else { continue };
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(PeerEvent::Close { code, reason }) => {
                        let _ = ws_tx
                            .send(Message::Close(Some(axum::extract::ws::CloseFrame {
                                code,
                                reason: reason.into(),
                            })))
                            .await;
                        break;
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SignalFrame>(&text) {
                            Ok(frame) => state.hub.route(session_id, &user_id, role, frame),
                            Err(err) => debug!(%err, "dropping malformed signal frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%err, session_id = %session_id, user_id, "signal socket read error");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unregister(session_id, &user_id, &handle);
}
