// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::*;
use crate::error::OrchError;
use crate::session::Session;

#[derive(Default)]
struct FakeMutator {
    connected: Mutex<Vec<(uuid::Uuid, String)>>,
    ended: Mutex<Vec<uuid::Uuid>>,
}

impl SessionMutator for FakeMutator {
    fn get_session(&self, _session_id: uuid::Uuid) -> Option<Session> {
        None
    }

    fn mark_guest_connected(&self, session_id: uuid::Uuid, guest_user_id: &str) -> Result<(), OrchError> {
        self.connected.lock().unwrap().push((session_id, guest_user_id.to_string()));
        Ok(())
    }

    fn end_session(&self, session_id: uuid::Uuid) -> Result<(), OrchError> {
        self.ended.lock().unwrap().push(session_id);
        Ok(())
    }
}

fn peer() -> (PeerHandle, mpsc::UnboundedReceiver<PeerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PeerHandle::new(Role::Guest, tx), rx)
}

fn host_peer() -> (PeerHandle, mpsc::UnboundedReceiver<PeerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PeerHandle::new(Role::Host, tx), rx)
}

fn expect_frame(rx: &mut mpsc::UnboundedReceiver<PeerEvent>) -> SignalFrame {
    match rx.try_recv().expect("expected a queued frame") {
        PeerEvent::Frame(f) => f,
        PeerEvent::Close { .. } => panic!("expected frame, got close"),
    }
}

#[test]
fn late_guest_replays_pending_host_offer() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (host, _host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);

    hub.route(session_id, "H1", Role::Host, SignalFrame::new(TYPE_SDP_OFFER).with_target("G1").with_payload(serde_json::json!({"sdp": "offer-1"})));

    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    let replayed = expect_frame(&mut guest_rx);
    assert_eq!(replayed.kind, TYPE_SDP_OFFER);
    assert_eq!(replayed.payload, Some(serde_json::json!({"sdp": "offer-1"})));
}

#[test]
fn answer_clears_pending_offer_and_forwards_to_host() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);
    hub.route(session_id, "H1", Role::Host, SignalFrame::new(TYPE_SDP_OFFER).with_target("G1").with_payload(serde_json::json!({"sdp": "o"})));

    let (guest, _guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.route(session_id, "G1", Role::Guest, SignalFrame::new(TYPE_SDP_ANSWER).with_payload(serde_json::json!({"sdp": "a"})));
    let forwarded = expect_frame(&mut host_rx);
    assert_eq!(forwarded.kind, TYPE_SDP_ANSWER);
    assert_eq!(forwarded.from_user_id.as_deref(), Some("G1"));

    // Offer was cleared: a second guest connecting now gets no replay.
    let (guest2, mut guest2_rx) = peer();
    hub.register(session_id, "G2", Role::Guest, guest2);
    assert!(guest2_rx.try_recv().is_err());
}

#[test]
fn duplicate_connect_closes_stale_peer_as_replaced() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (first, mut first_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, first);

    let (second, _second_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, second);

    match first_rx.try_recv().expect("stale peer should be closed") {
        PeerEvent::Close { code, reason } => {
            assert_eq!(code, REPLACED_CLOSE_CODE);
            assert_eq!(reason, REPLACED_CLOSE_REASON);
        }
        PeerEvent::Frame(_) => panic!("expected close"),
    }
}

#[test]
fn unregister_with_a_stale_handle_does_not_remove_the_replacement() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (first, _first_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, first.clone());
    let (second, _second_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, second);

    // Simulates the replaced connection's read loop exiting and calling
    // unregister with its own (now stale) handle.
    hub.unregister(session_id, "G1", &first);

    assert!(hub.connections.read().peers.contains_key(&(session_id, "G1".to_string())));
}

#[test]
fn unregister_with_the_current_handle_removes_the_peer() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (guest, _guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest.clone());

    hub.unregister(session_id, "G1", &guest);

    assert!(!hub.connections.read().peers.contains_key(&(session_id, "G1".to_string())));
}

#[test]
fn ice_candidate_routes_both_directions() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);
    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.route(session_id, "H1", Role::Host, SignalFrame::new(TYPE_ICE_CANDIDATE).with_target("G1"));
    expect_frame(&mut guest_rx);

    hub.route(session_id, "G1", Role::Guest, SignalFrame::new(TYPE_ICE_CANDIDATE));
    let forwarded = expect_frame(&mut host_rx);
    assert_eq!(forwarded.from_user_id.as_deref(), Some("G1"));
}

#[test]
fn peer_connected_marks_guest_and_notifies_host() {
    let mutator = Arc::new(FakeMutator::default());
    let hub = SignalingHub::new(mutator.clone());
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);

    hub.route(session_id, "G1", Role::Guest, SignalFrame::new(TYPE_PEER_CONNECTED));
    assert_eq!(mutator.connected.lock().unwrap().as_slice(), &[(session_id, "G1".to_string())]);
    let notified = expect_frame(&mut host_rx);
    assert_eq!(notified.kind, TYPE_PEER_CONNECTED);
}

#[test]
fn session_ended_from_host_tears_down_all_peers_but_does_not_echo_to_host() {
    let mutator = Arc::new(FakeMutator::default());
    let hub = SignalingHub::new(mutator.clone());
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);
    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.route(session_id, "H1", Role::Host, SignalFrame::new(TYPE_SESSION_ENDED));

    // The host sent session_ended; it must not get it echoed back.
    assert!(host_rx.try_recv().is_err());
    expect_frame(&mut guest_rx);
    assert_eq!(mutator.ended.lock().unwrap().as_slice(), &[session_id]);
}

#[test]
fn notify_session_ended_reaches_every_peer_including_host() {
    let mutator = Arc::new(FakeMutator::default());
    let hub = SignalingHub::new(mutator.clone());
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);
    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.notify_session_ended(session_id);

    expect_frame(&mut host_rx);
    expect_frame(&mut guest_rx);
}

#[test]
fn session_ended_from_guest_is_ignored() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.route(session_id, "G1", Role::Guest, SignalFrame::new(TYPE_SESSION_ENDED));
    assert!(guest_rx.try_recv().is_err());
}

#[test]
fn notify_permission_change_reaches_live_guest() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (guest, mut guest_rx) = peer();
    hub.register(session_id, "G1", Role::Guest, guest);

    hub.notify_permission_change(session_id, "G1", crate::session::Permission::ReadWrite);
    let frame = expect_frame(&mut guest_rx);
    assert_eq!(frame.kind, TYPE_PERMISSION_CHANGE);
}

#[test]
fn unknown_frame_type_is_silently_dropped() {
    let hub = SignalingHub::new(Arc::new(FakeMutator::default()));
    let session_id = uuid::Uuid::new_v4();
    let (host, mut host_rx) = host_peer();
    hub.register(session_id, "H1", Role::Host, host);
    hub.route(session_id, "H1", Role::Host, SignalFrame::new("not_a_real_type"));
    assert!(host_rx.try_recv().is_err());
}
