// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `orchd` binary and exercise it
//! over its loopback HTTP session gateway and WebSocket signaling endpoint.
//! Each test reproduces one of the literal end-to-end scenarios.

use std::time::Duration;

use orch_specs::{OrchdProcess, SignalPeer};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Scenario 1 — late guest, offer replay: the host sends an `sdp_offer`
/// targeted at a guest before that guest opens its signaling socket; once
/// the guest connects it receives the replayed offer, and once it answers
/// the host receives the answer.
#[tokio::test]
async fn late_guest_receives_replayed_offer_then_host_receives_answer() -> anyhow::Result<()> {
    let orchd = OrchdProcess::start()?;
    orchd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let session: serde_json::Value = client
        .post(format!("{}/api/session/create", orchd.base_url()))
        .json(&serde_json::json!({ "hostUserID": "H1" }))
        .send()
        .await?
        .json()
        .await?;
    let session_id = session["id"].as_str().unwrap().to_owned();

    let mut host = SignalPeer::connect(&orchd, &session_id, "H1", "host").await?;
    host.send(serde_json::json!({
        "type": "sdp_offer",
        "targetUserID": "G1",
        "payload": { "sdp": "offer-blob" },
    }))
    .await?;

    // G1 connects only after the offer was sent — it must still see it replayed.
    let mut guest = SignalPeer::connect(&orchd, &session_id, "G1", "guest").await?;
    let replayed = guest.recv(TIMEOUT).await?;
    assert_eq!(replayed["type"], "sdp_offer");
    assert_eq!(replayed["payload"]["sdp"], "offer-blob");

    guest
        .send(serde_json::json!({
            "type": "sdp_answer",
            "targetUserID": "H1",
            "payload": { "sdp": "answer-blob" },
        }))
        .await?;

    let answer = host.recv(TIMEOUT).await?;
    assert_eq!(answer["type"], "sdp_answer");
    assert_eq!(answer["payload"]["sdp"], "answer-blob");

    Ok(())
}

/// Scenario 4 — generic join error for a bad code: joining a nonexistent
/// session returns the stable sanitized message, not an internal reason.
#[tokio::test]
async fn join_with_unknown_code_returns_generic_message() -> anyhow::Result<()> {
    let orchd = OrchdProcess::start()?;
    orchd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/session/join", orchd.base_url()))
        .json(&serde_json::json!({ "code": "ABCD-EFG", "guestUserID": "G1" }))
        .send()
        .await?;

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "invalid session code");

    Ok(())
}

/// Scenario 5 — code single-use on first peer: once the first approved guest
/// connects and the session transitions to `active`, the code is cleared and
/// a second join attempt with the same code fails.
#[tokio::test]
async fn code_is_single_use_once_the_first_guest_connects() -> anyhow::Result<()> {
    let orchd = OrchdProcess::start()?;
    orchd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let session: serde_json::Value = client
        .post(format!("{}/api/session/create", orchd.base_url()))
        .json(&serde_json::json!({ "hostUserID": "H1" }))
        .send()
        .await?
        .json()
        .await?;
    let session_id = session["id"].as_str().unwrap().to_owned();
    let code = session["code"].as_str().unwrap().to_owned();

    let join: serde_json::Value = client
        .post(format!("{}/api/session/join", orchd.base_url()))
        .json(&serde_json::json!({ "code": code, "guestUserID": "G1" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(join["status"], "pending");

    client
        .post(format!("{}/api/session/approve", orchd.base_url()))
        .json(&serde_json::json!({ "sessionID": session_id, "guestUserID": "G1" }))
        .send()
        .await?;

    // Another guest can still join while the session is merely approved.
    let join_g2: serde_json::Value = client
        .post(format!("{}/api/session/join", orchd.base_url()))
        .json(&serde_json::json!({ "code": code, "guestUserID": "G2" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(join_g2["status"], "pending");

    // G1 connects over signaling; the hub reports `peer_connected`, which
    // drives the registry to mark G1 connected and clear the code.
    let mut guest = SignalPeer::connect(&orchd, &session_id, "G1", "guest").await?;
    guest.send(serde_json::json!({ "type": "peer_connected" })).await?;

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("session never cleared its code after peer_connected");
        }
        let fetched: serde_json::Value = client
            .get(format!("{}/api/session/get", orchd.base_url()))
            .query(&[("sessionID", session_id.as_str())])
            .send()
            .await?
            .json()
            .await?;
        if fetched["code"].is_null() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let resp = client
        .post(format!("{}/api/session/join", orchd.base_url()))
        .json(&serde_json::json!({ "code": code, "guestUserID": "G3" }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "invalid session code");

    Ok(())
}
