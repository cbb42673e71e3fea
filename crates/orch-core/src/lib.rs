// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend core for the desktop orchestrator: session lifecycle, P2P
//! signaling, Git command serialization, and terminal↔agent binding.
//!
//! External collaborators (PTY process spawn, GitHub REST, the relational
//! store, OAuth/keychain, fsnotify plumbing, UI) are referenced only through
//! the trait seams each module exposes — this crate owns coordination, not
//! the I/O at its edges.

pub mod activity;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod gitcache;
pub mod gitqueue;
pub mod orchestrator;
pub mod permission;
pub mod persistence;
pub mod ring;
pub mod security;
pub mod session;
pub mod shortcode;
pub mod signaling;
pub mod terminal;
pub mod transport;

pub use config::Config;
pub use error::{ErrorCode, OrchError};
pub use event::{Event, EventBus};
pub use orchestrator::Orchestrator;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use orchestrator::NoopPtySink;
use persistence::InMemoryPersistenceStore;
use signaling::ws::{ws_signal_handler, SignalingState};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Wires up the orchestrator and serves both the HTTP gateway and the
/// WebSocket signaling endpoint until a SIGTERM/SIGINT (or the owning
/// process's ctrl-c) fires. Mirrors the teacher's `run(config)` entrypoint
/// shape: thin `main.rs`, all wiring here.
///
/// The in-memory persistence store and a no-op PTY sink are used until a
/// hosting process wires its own durable store / PTY engine in — see
/// [`Orchestrator::new`] for the seams a production caller should replace.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let orchestrator = Arc::new(Orchestrator::new(&config, Arc::new(InMemoryPersistenceStore::default()), Arc::new(NoopPtySink)));
    orchestrator.restore_and_run().await?;

    spawn_signal_handler(shutdown.clone());

    let signaling_router = axum::Router::new()
        .route("/ws/signal", get(ws_signal_handler))
        .with_state(SignalingState::new(orchestrator.signaling.clone(), config.signaling_allowed_origins.clone()));
    let signaling_listener = TcpListener::bind(&config.signaling_listen_addr).await?;
    info!(addr = %config.signaling_listen_addr, "signaling endpoint listening");
    let signaling_shutdown = shutdown.clone();
    let signaling_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(signaling_listener, signaling_router).with_graceful_shutdown(signaling_shutdown.cancelled_owned()).await {
            error!(%err, "signaling server error");
        }
    });

    let gateway_task = if config.gateway_disabled() {
        info!("session gateway disabled");
        None
    } else {
        let gateway_router = transport::router(orchestrator.clone());
        let gateway_listener = TcpListener::bind(&config.gateway_listen_addr).await?;
        info!(addr = %config.gateway_listen_addr, "session gateway listening");
        let gateway_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(gateway_listener, gateway_router).with_graceful_shutdown(gateway_shutdown.cancelled_owned()).await {
                error!(%err, "session gateway server error");
            }
        }))
    };

    shutdown.cancelled().await;
    let _ = signaling_task.await;
    if let Some(task) = gateway_task {
        let _ = task.await;
    }
    orchestrator.shutdown(SHUTDOWN_GRACE_PERIOD).await;
    Ok(())
}

/// First SIGTERM/SIGINT cancels `shutdown` for a graceful drain; a second
/// forces an immediate exit, matching the teacher's double-signal handler.
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
                info!("received SIGTERM again, forcing exit");
            }
            _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    });
}
