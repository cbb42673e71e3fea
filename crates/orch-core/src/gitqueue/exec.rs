// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git subprocess invocation. One invocation is "one attempt"; retry policy
//! lives in [`super::retry`].

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitRunOutcome {
    Ran,
    TimedOut,
}

/// Runs `git <args>` in `repo_root`, deadlined at `timeout`. Non-interactive
/// by construction (no credential prompts, no editor) so a hung invocation
/// is always the queue's fault to time out, never the user's to answer.
pub async fn run_git(repo_root: &str, args: &[&str], timeout: Duration) -> std::io::Result<(GitRunOutcome, GitOutput)> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(repo_root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_EDITOR", "true")
        .env("EDITOR", "true")
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(s) = stdout_pipe.as_mut() {
            let _ = s.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(s) = stderr_pipe.as_mut() {
            let _ = s.read_to_end(&mut buf).await;
        }
        buf
    });

    let mut outcome = GitRunOutcome::Ran;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = tokio::time::sleep(timeout) => {
            outcome = GitRunOutcome::TimedOut;
            let _ = child.kill().await;
            child.wait().await
        }
    }?;

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();
    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let mut stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
    let mut exit_code = status.code().unwrap_or(1);

    if outcome == GitRunOutcome::TimedOut {
        exit_code = 124;
        let prefix = format!("git command timed out after {}ms\n", timeout.as_millis());
        stderr = format!("{prefix}{stderr}");
    }

    Ok((outcome, GitOutput { exit_code, stdout, stderr }))
}
