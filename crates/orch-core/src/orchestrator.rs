// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level wiring: assembles every component into one handle the gateway
//! and signaling transports share. Breaks the Signaling ↔ Registry reference
//! cycle by building the registry first, handing it to the hub as a
//! `SessionMutator`, then wiring the hub back in as the registry's
//! `PeerNotifier`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::activity::ActivitySynthesizer;
use crate::config::Config;
use crate::error::OrchError;
use crate::event::EventBus;
use crate::gitcache::GitCache;
use crate::gitqueue::{CommandQueue, PostWriteReconciler};
use crate::permission::{PermissionPropagator, PtyPermissionSink};
use crate::persistence::{PersistenceStore, SessionPersistence};
use crate::security::{JoinSecurityGuard, JoinSecurityGuardConfig};
use crate::session::registry::{PeerNotifier, SessionMutator, SessionRegistry};
use crate::signaling::SignalingHub;
use crate::terminal::TerminalBinding;

/// Bridges [`CommandQueue`]'s post-write hook to [`GitCache`] invalidation
/// without the queue depending on the cache directly.
struct GitCacheReconciler {
    cache: Arc<GitCache>,
}

impl PostWriteReconciler for GitCacheReconciler {
    fn invalidate_repo(&self, repo_root: &str) {
        self.cache.invalidate_repo_cache(repo_root);
    }
}

/// A no-op PTY sink used when no external PTY engine has been wired in yet
/// (e.g. unit tests exercising the orchestrator without a real terminal
/// runtime). A production binary must supply its own.
pub struct NoopPtySink;

impl PtyPermissionSink for NoopPtySink {
    fn set_permission(&self, _session_id: uuid::Uuid, _guest_user_id: &str, _permission: Option<crate::session::Permission>) {}
}

/// Every component, assembled and ready to drive from a transport layer.
/// Cloning is cheap — every field is an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    pub registry: Arc<SessionRegistry>,
    pub security: Arc<JoinSecurityGuard>,
    pub persistence: Arc<SessionPersistence>,
    pub signaling: Arc<SignalingHub>,
    pub permissions: Arc<PermissionPropagator>,
    pub terminals: Arc<TerminalBinding>,
    pub commands: Arc<CommandQueue>,
    pub gitcache: Arc<GitCache>,
    pub activity: Arc<ActivitySynthesizer>,
    pub events: EventBus,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Assembles the full component graph. `pty_sink` is the seam to the
    /// external PTY engine; `persistence_store` is the seam to the durable
    /// session store. Nothing is started here — call
    /// [`Orchestrator::restore_and_run`] once the transports are ready.
    pub fn new(config: &Config, persistence_store: Arc<dyn PersistenceStore>, pty_sink: Arc<dyn PtyPermissionSink>) -> Self {
        let events = EventBus::default();

        let security = Arc::new(JoinSecurityGuard::new(JoinSecurityGuardConfig {
            invalid_window: config.join_invalid_window(),
            invalid_threshold: config.join_invalid_threshold,
            lock_duration: config.join_lock_duration(),
            rate_window: config.join_rate_window(),
            rate_max: config.join_rate_max,
        }));

        let persistence = Arc::new(SessionPersistence::new(persistence_store));

        let registry = Arc::new(SessionRegistry::new(security.clone(), persistence.clone(), events.clone()));

        let signaling = Arc::new(SignalingHub::new(registry.clone() as Arc<dyn SessionMutator>));
        registry.set_notifier(signaling.clone() as Arc<dyn PeerNotifier>);

        let terminals = Arc::new(TerminalBinding::new(config.terminal_ring_bytes));
        let permissions = Arc::new(PermissionPropagator::new(registry.clone(), terminals.clone(), pty_sink));

        let gitcache = Arc::new(GitCache::new());
        let reconciler: Arc<dyn PostWriteReconciler> = Arc::new(GitCacheReconciler { cache: gitcache.clone() });
        let commands = Arc::new(CommandQueue::with_capacity(events.clone(), reconciler, config.command_queue_capacity));

        let activity = Arc::new(ActivitySynthesizer::new());

        Self {
            registry,
            security,
            persistence,
            signaling,
            permissions,
            terminals,
            commands,
            gitcache,
            activity,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Rehydrates sessions surviving from a prior run and spawns the
    /// registry's background sweeper. Call once at startup after `new`.
    pub async fn restore_and_run(&self) -> Result<(), OrchError> {
        for session in self.persistence.restore()? {
            self.registry.restore_session(session);
        }
        let registry = self.registry.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move { registry.run_sweeper(shutdown).await });
        Ok(())
    }

    /// Signals every background task to wind down and waits for the
    /// command queue to drain its in-flight writes, up to `grace_period`.
    pub async fn shutdown(&self, grace_period: Duration) {
        info!("orchestrator shutting down");
        self.shutdown.cancel();
        self.commands.close(grace_period).await;
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
