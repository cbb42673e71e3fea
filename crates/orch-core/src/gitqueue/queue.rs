// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C7 — CommandQueue: one FIFO worker per repo root. Reads bypass this
//! queue entirely; only Git write commands are enqueued here, which is why
//! every successful completion triggers post-write cache reconciliation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::clock;
use crate::error::{ErrorCode, OrchError};
use crate::event::{Event, EventBus};

use super::diagnostics::DiagnosticState;

const DEFAULT_REPO_CHANNEL_CAPACITY: usize = 64;

/// Actions whose successful completion can change merge-conflict state, in
/// addition to the unconditional `status_changed` reconciliation.
const CONFLICT_AFFECTING_ACTIONS: &[&str] = &["merge", "rebase", "cherry-pick", "revert", "pull"];

#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub exit_code: Option<i32>,
    pub stderr: Option<String>,
}

pub type RunFuture = Pin<Box<dyn Future<Output = Result<CommandResult, OrchError>> + Send>>;
/// A single Git invocation (with whatever retry policy the caller wants
/// layered in, see [`super::retry`]), parameterized over the combined
/// cancellation token the worker builds for it and a sink for mid-flight
/// `retried` diagnostics.
pub type RunFn = Box<dyn FnOnce(CancellationToken, RetrySink) -> RunFuture + Send>;

/// Lets a `RunFn` emit a `retried` lifecycle diagnostic without owning the
/// command's [`DiagnosticState`] — the worker retains that for the
/// surrounding queued/started/succeeded/failed events.
#[derive(Clone)]
pub struct RetrySink {
    diag: Arc<Mutex<DiagnosticState>>,
    events: EventBus,
}

impl RetrySink {
    pub fn retried(&self, stderr: &str) {
        let payload = self.diag.lock().retried(stderr);
        self.events.emit(Event::GitpanelCommandResult(payload));
    }
}

/// Invoked after every successful write so the cache layer can drop stale
/// entries for that repo. The queue never holds a direct dependency on
/// `GitCache`; this seam is how the orchestrator wires the two together.
pub trait PostWriteReconciler: Send + Sync {
    fn invalidate_repo(&self, repo_root: &str);
}

pub struct NoopReconciler;
impl PostWriteReconciler for NoopReconciler {
    fn invalidate_repo(&self, _repo_root: &str) {}
}

struct QueuedCommand {
    action: String,
    repo_root: String,
    timeout: Duration,
    request_cancel: CancellationToken,
    run: RunFn,
    diag: Arc<Mutex<DiagnosticState>>,
    result_tx: oneshot::Sender<Result<CommandResult, OrchError>>,
}

struct RepoQueue {
    sender: mpsc::Sender<QueuedCommand>,
    worker: JoinHandle<()>,
}

pub struct CommandQueue {
    queues: Mutex<HashMap<String, RepoQueue>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    capacity: usize,
    next_command_id: AtomicU64,
    events: EventBus,
    reconciler: Arc<dyn PostWriteReconciler>,
}

impl CommandQueue {
    pub fn new(events: EventBus, reconciler: Arc<dyn PostWriteReconciler>) -> Self {
        Self::with_capacity(events, reconciler, DEFAULT_REPO_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(events: EventBus, reconciler: Arc<dyn PostWriteReconciler>, capacity: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            capacity,
            next_command_id: AtomicU64::new(1),
            events,
            reconciler,
        }
    }

    /// Enqueues one write command for `repo_root`. Blocks on the per-repo
    /// channel's capacity, racing against `request_cancel` and the queue's
    /// own shutdown signal. Returns a receiver for the eventual result;
    /// dropping it is safe — the worker's delivery is non-blocking.
    pub async fn enqueue(
        &self,
        repo_root: &str,
        action: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        request_cancel: CancellationToken,
        run: RunFn,
    ) -> Result<oneshot::Receiver<Result<CommandResult, OrchError>>, OrchError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OrchError::new(ErrorCode::ServiceUnavailable));
        }

        let repo_root = normalize_repo_root(repo_root);
        let command_id = self.next_command_id.fetch_add(1, Ordering::SeqCst);
        let action = action.into();
        let diag = DiagnosticState::new(command_id, action.clone(), repo_root.clone(), &args);
        self.events.emit(Event::GitpanelCommandResult(diag.queued()));

        let (result_tx, result_rx) = oneshot::channel();
        let entry = QueuedCommand {
            action,
            repo_root: repo_root.clone(),
            timeout,
            request_cancel: request_cancel.clone(),
            run,
            diag: Arc::new(Mutex::new(diag)),
            result_tx,
        };

        let sender = self.repo_sender(&repo_root);
        tokio::select! {
            res = sender.send(entry) => {
                if res.is_err() {
                    return Err(OrchError::with_detail(ErrorCode::ServiceUnavailable, "repo worker is gone"));
                }
            }
            _ = request_cancel.cancelled() => {
                return Err(OrchError::new(ErrorCode::Canceled));
            }
            _ = self.shutdown.cancelled() => {
                return Err(OrchError::with_detail(ErrorCode::ServiceUnavailable, "queue is shutting down"));
            }
        }

        Ok(result_rx)
    }

    fn repo_sender(&self, repo_root: &str) -> mpsc::Sender<QueuedCommand> {
        let mut queues = self.queues.lock();
        if let Some(existing) = queues.get(repo_root) {
            return existing.sender.clone();
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        let worker = tokio::spawn(Self::run_worker(receiver, self.shutdown.clone(), self.events.clone(), self.reconciler.clone()));
        queues.insert(repo_root.to_string(), RepoQueue { sender: sender.clone(), worker });
        sender
    }

    async fn run_worker(
        mut receiver: mpsc::Receiver<QueuedCommand>,
        shutdown: CancellationToken,
        events: EventBus,
        reconciler: Arc<dyn PostWriteReconciler>,
    ) {
        while let Some(entry) = receiver.recv().await {
            let started = entry.diag.lock().started(clock::now_ms());
            events.emit(Event::GitpanelCommandResult(started));

            let child = combined_cancel(&shutdown, &entry.request_cancel);
            let sink = RetrySink { diag: entry.diag.clone(), events: events.clone() };
            let run_fut = (entry.run)(child.clone(), sink);
            let timed = tokio::time::timeout(entry.timeout, run_fut).await;
            let now = clock::now_ms();

            let result = match timed {
                Ok(Ok(cmd_result)) if shutdown.is_cancelled() || entry.request_cancel.is_cancelled() => {
                    let code = ErrorCode::Canceled;
                    let payload = entry.diag.lock().failed(now, cmd_result.exit_code, cmd_result.stderr.as_deref(), code.as_str());
                    events.emit(Event::GitpanelCommandResult(payload));
                    Err(OrchError::new(code))
                }
                Ok(Ok(cmd_result)) => {
                    let payload = entry.diag.lock().succeeded(now, cmd_result.exit_code.unwrap_or(0));
                    events.emit(Event::GitpanelCommandResult(payload));
                    reconciler.invalidate_repo(&entry.repo_root);
                    events.emit(Event::GitpanelStatusChanged {
                        repo_root: entry.repo_root.clone(),
                        reason: "post_write_reconcile".to_string(),
                        source_event: Some(entry.action.clone()),
                    });
                    if CONFLICT_AFFECTING_ACTIONS.contains(&entry.action.as_str()) {
                        events.emit(Event::GitpanelConflictsChanged { repo_root: entry.repo_root.clone() });
                    }
                    Ok(cmd_result)
                }
                Ok(Err(err)) => {
                    let payload = entry.diag.lock().failed(now, None, None, err.message());
                    events.emit(Event::GitpanelCommandResult(payload));
                    Err(err)
                }
                Err(_elapsed) => {
                    let payload = entry.diag.lock().failed(now, None, None, ErrorCode::Timeout.as_str());
                    events.emit(Event::GitpanelCommandResult(payload));
                    Err(OrchError::new(ErrorCode::Timeout))
                }
            };

            let _ = entry.result_tx.send(result);
        }
    }

    /// Flips the closed flag, cancels the shutdown token (propagating into
    /// every in-flight worker's combined context), then waits for all
    /// worker tasks to finish or `grace_period` to elapse, whichever first.
    pub async fn close(&self, grace_period: Duration) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.cancel();

        let handles: Vec<JoinHandle<()>> = {
            let mut queues = self.queues.lock();
            queues.drain().map(|(_, q)| q.worker).collect()
        };

        let all = futures_util::future::join_all(handles);
        tokio::select! {
            _ = all => {}
            _ = tokio::time::sleep(grace_period) => {
                warn!("command queue close grace period elapsed with workers still running");
            }
        }
    }
}

fn combined_cancel(a: &CancellationToken, b: &CancellationToken) -> CancellationToken {
    let combined = CancellationToken::new();
    let combined_task = combined.clone();
    let a = a.clone();
    let b = b.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = a.cancelled() => {}
            _ = b.cancelled() => {}
            _ = combined_task.cancelled() => {}
        }
        combined_task.cancel();
    });
    combined
}

fn normalize_repo_root(repo_root: &str) -> String {
    repo_root.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
