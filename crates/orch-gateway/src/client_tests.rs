// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use orch_core::orchestrator::NoopPtySink;
use orch_core::persistence::InMemoryPersistenceStore;
use orch_core::{Config, Orchestrator};
use tokio::net::TcpListener;

use super::*;

/// Boots a real orch-core gateway on an ephemeral port and returns a client
/// pointed at it, plus the bound address for diagnostics.
async fn live_client() -> GatewayClient {
    let config = Config::parse_from(["orchd"]);
    let orchestrator = Arc::new(Orchestrator::new(&config, Arc::new(InMemoryPersistenceStore::default()), Arc::new(NoopPtySink)));
    let router = orch_core::transport::router(orchestrator);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    GatewayClient::new(format!("http://{addr}"), Duration::from_secs(5))
}

#[tokio::test]
async fn create_then_get_round_trips_over_http() {
    let client = live_client().await;
    let session = client.create_session("host-1", SessionConfig::default()).await.unwrap();
    let fetched = client.get_session(session.id).await.unwrap();
    assert_eq!(fetched.id, session.id);
}

#[tokio::test]
async fn get_unknown_session_surfaces_session_not_found() {
    let client = live_client().await;
    let err = client.get_session(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionNotFound);
}

#[tokio::test]
async fn join_with_bad_code_surfaces_invalid_session_code() {
    let client = live_client().await;
    let err = client.join_session("ZZZZ-ZZZ", "guest-1", GuestInfo::default()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSessionCode);
}

#[tokio::test]
async fn approve_reject_permission_flow_round_trips() {
    let client = live_client().await;
    let session = client
        .create_session("host-2", SessionConfig { allow_anonymous: true, ..SessionConfig::default() })
        .await
        .unwrap();
    client.join_session(&session.code.clone().unwrap(), "guest-1", GuestInfo::default()).await.unwrap();
    client.approve_guest(session.id, "guest-1").await.unwrap();
    client.set_permission(session.id, "guest-1", Permission::ReadWrite).await.unwrap();

    let pending = client.list_pending_guests(session.id).await.unwrap();
    assert!(pending.is_empty());

    client.end_session(session.id).await.unwrap();
}
