// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner/client mode detection. Exactly one process on a host can bind the
//! shared gateway port and own the `SessionRegistry`; every other process
//! that wants session access becomes a client and delegates over HTTP.

use std::sync::Arc;

use clap::Parser;
use orch_core::orchestrator::NoopPtySink;
use orch_core::persistence::InMemoryPersistenceStore;
use orch_core::{Config, Orchestrator};
use tokio::net::TcpListener;
use tracing::info;

use crate::client::GatewayClient;
use crate::config::GatewayConfig;

/// Which role this process plays for the shared session gateway.
pub enum GatewayMode {
    /// This process bound `listen_addr` first; it owns the registry and
    /// serves the full session API directly on the listener it just bound.
    Owner { orchestrator: Arc<Orchestrator>, listener: TcpListener },
    /// `listen_addr` was already taken by another instance; every session
    /// call is delegated to it over HTTP. There is no local registry in
    /// this mode — a request for a session the owner doesn't know about
    /// comes back as the owner's own `session not found`, which is a
    /// strict superset of routing only on a local miss.
    Client { client: GatewayClient },
}

/// Tries to bind `config.listen_addr`. Binding succeeding makes this process
/// the owner; losing the race (`AddrInUse` or any other bind failure) makes
/// it a client of whatever already owns the port.
pub async fn detect(config: &GatewayConfig) -> GatewayMode {
    match TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => {
            info!(addr = %config.listen_addr, "bound session gateway port, running as owner");
            let orch_config = Config::parse_from(["orch-gateway"]);
            let orchestrator = Arc::new(Orchestrator::new(
                &orch_config,
                Arc::new(InMemoryPersistenceStore::default()),
                Arc::new(NoopPtySink),
            ));
            GatewayMode::Owner { orchestrator, listener }
        }
        Err(err) => {
            let base_url = config.resolved_base_url();
            info!(addr = %config.listen_addr, %err, base_url, "session gateway port taken, running as client");
            GatewayMode::Client { client: GatewayClient::new(base_url, config.request_timeout()) }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
