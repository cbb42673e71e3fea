// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin cross-instance facade for the session API (spec §4.11 GatewayServer):
//! whichever process binds the shared gateway port first serves the session
//! registry directly; every later process on the same host delegates its
//! session calls to it over HTTP instead of starting a second registry.

pub mod client;
pub mod config;
pub mod state;
pub mod transport;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::GatewayConfig;
use state::GatewayMode;

/// Detects owner/client mode and serves the gateway's HTTP surface until a
/// SIGTERM/SIGINT fires. In owner mode this also restores any sessions a
/// prior run persisted and starts the registry's sweeper.
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let mode = state::detect(&config).await;
    if let GatewayMode::Owner { orchestrator, .. } = &mode {
        orchestrator.restore_and_run().await?;
    }

    let (router, listener) = transport::router(mode);
    let listener = match listener {
        Some(listener) => listener,
        None => {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
            info!(addr = %listener.local_addr()?, "client-mode gateway listening");
            listener
        }
    };
    info!(addr = %listener.local_addr()?, "orch-gateway listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}

/// First SIGTERM/SIGINT cancels `shutdown` for a graceful drain; a second
/// forces an immediate exit, matching orch-core's own signal handler.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGTERM");
            }
            _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT");
            }
        }
        shutdown.cancel();

        tokio::select! {
            _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                error!("received SIGTERM again, forcing exit");
            }
            _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                error!("received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    });
}
