// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio::net::TcpListener;

use super::*;

#[tokio::test]
async fn first_process_on_a_fresh_port_becomes_owner() {
    let config = GatewayConfig::parse_from(["orch-gateway", "--listen-addr", "127.0.0.1:0"]);
    match detect(&config).await {
        GatewayMode::Owner { .. } => {}
        GatewayMode::Client { .. } => panic!("expected owner on an unused port"),
    }
}

#[tokio::test]
async fn second_process_on_an_occupied_port_becomes_client() {
    let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = held.local_addr().unwrap().to_string();

    let config = GatewayConfig::parse_from(["orch-gateway", "--listen-addr", &addr]);
    match detect(&config).await {
        GatewayMode::Client { .. } => {}
        GatewayMode::Owner { .. } => panic!("expected client when the port is already held"),
    }

    drop(held);
}
