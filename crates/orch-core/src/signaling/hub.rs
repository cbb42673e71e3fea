// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C4 — SignalingHub: transport-agnostic peer registry and SDP/ICE router.
//! Peers are represented as an outbound frame channel (`PeerHandle`); the
//! concrete transport (axum WebSocket, in `ws.rs`) only has to pump frames
//! in and out of the hub, never touch routing logic itself.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::registry::{PeerNotifier, SessionMutator};
use crate::session::Permission;

use super::msg::{
    Role, SignalFrame, TYPE_GUEST_APPROVED, TYPE_GUEST_REJECTED, TYPE_GUEST_REQUEST, TYPE_ICE_CANDIDATE,
    TYPE_PEER_CONNECTED, TYPE_PERMISSION_CHANGE, TYPE_SDP_ANSWER, TYPE_SDP_OFFER, TYPE_SESSION_ENDED,
};

/// Close code/reason used when a new connection for the same `(session,
/// user)` supersedes a stale one. Not specified by the wire protocol;
/// `1000 normal closure` with reason `"replaced"` per design notes.
pub const REPLACED_CLOSE_CODE: u16 = 1000;
pub const REPLACED_CLOSE_REASON: &str = "replaced";

pub enum PeerEvent {
    Frame(SignalFrame),
    Close { code: u16, reason: String },
}

#[derive(Clone)]
pub struct PeerHandle {
    pub role: Role,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerHandle {
    pub fn new(role: Role, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self { role, tx }
    }

    fn send_frame(&self, frame: SignalFrame) {
        let _ = self.tx.send(PeerEvent::Frame(frame));
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.tx.send(PeerEvent::Close { code, reason: reason.to_string() });
    }

    /// Identity check: true if `self` and `other` are the same registration
    /// (same outbound channel), not merely two handles for the same role.
    fn same_channel(&self, other: &PeerHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

#[derive(Default)]
struct SigSessionState {
    /// `guestUserID -> latest pending SDP offer`, removed on answer receipt.
    host_offers: HashMap<String, serde_json::Value>,
}

#[derive(Default)]
struct Connections {
    peers: HashMap<(uuid::Uuid, String), PeerHandle>,
    hosts: HashMap<uuid::Uuid, String>,
    sig_sessions: HashMap<uuid::Uuid, SigSessionState>,
}

pub struct SignalingHub {
    registry: Arc<dyn SessionMutator>,
    connections: RwLock<Connections>,
}

impl SignalingHub {
    pub fn new(registry: Arc<dyn SessionMutator>) -> Self {
        Self { registry, connections: RwLock::new(Connections::default()) }
    }

    /// Registers a connecting peer. Enforces identity uniqueness: a
    /// pre-existing peer for the same `(session, user)` is closed with
    /// `1000 normal closure` / `"replaced"` once the new one is in place.
    /// A freshly connected guest is immediately replayed any pending host
    /// offer targeted at it.
    pub fn register(&self, session_id: uuid::Uuid, user_id: &str, role: Role, handle: PeerHandle) {
        let mut conn = self.connections.write();
        let key = (session_id, user_id.to_string());
        let stale = conn.peers.insert(key.clone(), handle.clone());
        if let Some(stale) = stale {
            stale.close(REPLACED_CLOSE_CODE, REPLACED_CLOSE_REASON);
        }
        if role == Role::Host {
            conn.hosts.insert(session_id, user_id.to_string());
        }

        if role == Role::Guest {
            let offer = conn.sig_sessions.get(&session_id).and_then(|s| s.host_offers.get(user_id)).cloned();
            if let Some(offer) = offer {
                handle.send_frame(SignalFrame::new(TYPE_SDP_OFFER).with_payload(offer).with_target(user_id.to_string()));
            }
        }
    }

    /// Deregisters a peer, but only if `handle` is still the current
    /// registration for that key — a newer peer may already have replaced
    /// it, and that newer peer's live entry must survive this call.
    pub fn unregister(&self, session_id: uuid::Uuid, user_id: &str, handle: &PeerHandle) {
        let mut conn = self.connections.write();
        let key = (session_id, user_id.to_string());
        let is_current = conn.peers.get(&key).is_some_and(|current| current.same_channel(handle));
        if !is_current {
            return;
        }
        conn.peers.remove(&key);
        if conn.hosts.get(&session_id).map(|h| h.as_str()) == Some(user_id) {
            conn.hosts.remove(&session_id);
        }
    }

    fn host_peer(conn: &Connections, session_id: uuid::Uuid) -> Option<PeerHandle> {
        let host_user_id = conn.hosts.get(&session_id)?;
        conn.peers.get(&(session_id, host_user_id.clone())).cloned()
    }

    /// Routes one inbound frame from `(session_id, from_user_id, role)`.
    /// Unknown types are ignored; malformed routing targets are logged and
    /// dropped — never propagated as an error to the sender.
    pub fn route(&self, session_id: uuid::Uuid, from_user_id: &str, role: Role, frame: SignalFrame) {
        match frame.kind.as_str() {
            TYPE_SDP_OFFER => self.route_sdp_offer(session_id, frame),
            TYPE_SDP_ANSWER => self.route_sdp_answer(session_id, from_user_id, frame),
            TYPE_ICE_CANDIDATE => self.route_ice_candidate(session_id, from_user_id, role, frame),
            TYPE_GUEST_REQUEST | TYPE_GUEST_APPROVED | TYPE_GUEST_REJECTED => {
                self.route_to_target_or_host(session_id, from_user_id, role, frame)
            }
            TYPE_PEER_CONNECTED => self.handle_peer_connected(session_id, from_user_id),
            TYPE_SESSION_ENDED => self.handle_session_ended(session_id, role, from_user_id),
            TYPE_PERMISSION_CHANGE => {
                debug!(%session_id, from_user_id, "ignoring peer-originated permission_change; orchestrator-only");
            }
            other => {
                debug!(%session_id, kind = other, "dropping unrecognized signal frame type");
            }
        }
    }

    fn route_sdp_offer(&self, session_id: uuid::Uuid, frame: SignalFrame) {
        let Some(target) = frame.target_user_id.clone() else {
            warn!(%session_id, "sdp_offer missing targetUserID, dropping");
            return;
        };
        let mut conn = self.connections.write();
        let payload = frame.payload.clone().unwrap_or(serde_json::Value::Null);
        conn.sig_sessions.entry(session_id).or_default().host_offers.insert(target.clone(), payload);

        if let Some(guest) = conn.peers.get(&(session_id, target.clone())) {
            guest.send_frame(frame);
        }
    }

    fn route_sdp_answer(&self, session_id: uuid::Uuid, from_user_id: &str, frame: SignalFrame) {
        let mut conn = self.connections.write();
        conn.sig_sessions.entry(session_id).or_default().host_offers.remove(from_user_id);
        if let Some(host) = Self::host_peer(&conn, session_id) {
            host.send_frame(frame.with_from(from_user_id.to_string()));
        } else {
            warn!(%session_id, from_user_id, "sdp_answer with no live host peer, dropping");
        }
        drop(conn);
    }

    fn route_ice_candidate(&self, session_id: uuid::Uuid, from_user_id: &str, role: Role, frame: SignalFrame) {
        let conn = self.connections.read();
        match role {
            Role::Host => {
                let Some(target) = frame.target_user_id.clone() else {
                    warn!(%session_id, "host ice_candidate missing targetUserID, dropping");
                    return;
                };
                if let Some(guest) = conn.peers.get(&(session_id, target)) {
                    guest.send_frame(frame);
                }
            }
            Role::Guest => {
                if let Some(host) = Self::host_peer(&conn, session_id) {
                    host.send_frame(frame.with_from(from_user_id.to_string()));
                }
            }
        }
    }

    fn route_to_target_or_host(&self, session_id: uuid::Uuid, from_user_id: &str, role: Role, frame: SignalFrame) {
        let conn = self.connections.read();
        match role {
            Role::Host => {
                let Some(target) = frame.target_user_id.clone() else { return };
                if let Some(guest) = conn.peers.get(&(session_id, target)) {
                    guest.send_frame(frame);
                }
            }
            Role::Guest => {
                if let Some(host) = Self::host_peer(&conn, session_id) {
                    host.send_frame(frame.with_from(from_user_id.to_string()));
                }
            }
        }
    }

    fn handle_peer_connected(&self, session_id: uuid::Uuid, guest_user_id: &str) {
        if let Err(err) = self.registry.mark_guest_connected(session_id, guest_user_id) {
            warn!(%session_id, guest_user_id, %err, "peer_connected failed to mark guest connected");
            return;
        }
        let conn = self.connections.read();
        if let Some(host) = Self::host_peer(&conn, session_id) {
            host.send_frame(SignalFrame::new(TYPE_PEER_CONNECTED).with_from(guest_user_id.to_string()));
        }
    }

    fn handle_session_ended(&self, session_id: uuid::Uuid, role: Role, from_user_id: &str) {
        if role != Role::Host {
            debug!(%session_id, "ignoring session_ended from non-host peer");
            return;
        }
        // host->all non-host peers; the host that sent this must not get it echoed back.
        self.teardown_session(session_id, Some(from_user_id));
        if let Err(err) = self.registry.end_session(session_id) {
            warn!(%session_id, %err, "session_ended routing could not end session in registry");
        }
    }

    /// Broadcasts `session_ended` to every live peer except `skip_user` (if
    /// any), then drops all of that session's connections and state.
    fn teardown_session(&self, session_id: uuid::Uuid, skip_user: Option<&str>) {
        let mut conn = self.connections.write();
        let keys: Vec<(uuid::Uuid, String)> = conn.peers.keys().filter(|(s, _)| *s == session_id).cloned().collect();
        for key in &keys {
            if skip_user == Some(key.1.as_str()) {
                continue;
            }
            if let Some(peer) = conn.peers.get(key) {
                peer.send_frame(SignalFrame::new(TYPE_SESSION_ENDED));
            }
        }
        for key in keys {
            conn.peers.remove(&key);
        }
        conn.hosts.remove(&session_id);
        conn.sig_sessions.remove(&session_id);
    }
}

impl PeerNotifier for SignalingHub {
    fn notify_permission_change(&self, session_id: uuid::Uuid, guest_user_id: &str, permission: Permission) {
        let conn = self.connections.read();
        if let Some(guest) = conn.peers.get(&(session_id, guest_user_id.to_string())) {
            let payload = serde_json::json!({ "permission": permission });
            guest.send_frame(SignalFrame::new(TYPE_PERMISSION_CHANGE).with_payload(payload).with_target(guest_user_id.to_string()));
        }
    }

    fn notify_session_ended(&self, session_id: uuid::Uuid) {
        self.teardown_session(session_id, None);
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
