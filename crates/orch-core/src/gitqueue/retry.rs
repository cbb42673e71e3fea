// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `runWriteGitWithRetry` — the transient index-lock retry wrapper. Only
//! write commands go through this; reads call [`super::exec::run_git`]
//! directly.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ErrorCode, OrchError};

use super::exec::{GitOutput, GitRunOutcome};

/// Default backoff schedule between retry attempts; index 0 is the delay
/// before the second attempt.
pub const BACKOFFS: [Duration; 3] = [Duration::from_millis(80), Duration::from_millis(160), Duration::from_millis(320)];

const TRANSIENT_PATTERNS: [&str; 5] =
    ["another git process", "index.lock", "File exists", "unable to create", "could not lock"];

fn is_transient(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(&p.to_lowercase()))
}

pub struct RetryOutcome {
    pub output: GitOutput,
    pub attempts: u32,
}

/// Runs one Git write command under the transient index-lock retry policy.
/// `attempt` performs a single invocation (production callers pass
/// [`super::exec::run_git`]; tests pass a canned stand-in) — this function
/// owns only the retry/backoff/cancellation logic around it, never the
/// subprocess itself. `on_retry` is called with the failing stderr between
/// attempts so the caller can emit its own `retried` diagnostic.
pub async fn run_write_git_with_retry<F, Fut>(
    cancel: &CancellationToken,
    mut attempt: F,
    mut on_retry: impl FnMut(&str),
) -> Result<RetryOutcome, OrchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<(GitRunOutcome, GitOutput)>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if cancel.is_cancelled() {
            return Err(OrchError::new(ErrorCode::Canceled));
        }

        let (outcome, output) = tokio::select! {
            result = attempt() => result.map_err(|err| OrchError::with_detail(ErrorCode::CommandFailed, err.to_string()))?,
            _ = cancel.cancelled() => return Err(OrchError::new(ErrorCode::Canceled)),
        };

        if outcome == GitRunOutcome::TimedOut {
            return Err(OrchError::with_detail(ErrorCode::Timeout, output.stderr));
        }
        if output.is_success() {
            return Ok(RetryOutcome { output, attempts });
        }
        if attempts as usize > BACKOFFS.len() || !is_transient(&output.stderr) {
            return Ok(RetryOutcome { output, attempts });
        }

        on_retry(&output.stderr);
        let backoff = BACKOFFS[(attempts - 1) as usize];
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = cancel.cancelled() => return Err(OrchError::new(ErrorCode::Canceled)),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
