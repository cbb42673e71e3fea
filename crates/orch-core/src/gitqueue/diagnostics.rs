// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle diagnostics for a `CommandQueue` entry, plus the sanitization
//! rules (spec §6) applied before any payload leaves the process.

use serde::{Deserialize, Serialize};

const STDERR_CAP: usize = 1200;
const STDERR_TRUNCATION_SUFFIX: &str = "...(truncated)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Queued,
    Started,
    Retried,
    Succeeded,
    Failed,
}

/// One lifecycle event for a queued command. `args`/`stderr_sanitized` have
/// already had [`sanitize_path`]/[`sanitize_stderr`] applied by the time they
/// reach here — `DiagnosticState` never holds raw absolute paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticPayload {
    pub command_id: u64,
    pub action: String,
    pub stage: DiagnosticStage,
    pub args: Vec<String>,
    pub stderr_sanitized: Option<String>,
    pub duration_ms: Option<u64>,
    pub attempt: u32,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

/// Accumulates the fields of [`DiagnosticPayload`] as a command progresses
/// through its lifecycle, sanitizing repo/home paths as it goes.
#[derive(Debug, Clone)]
pub struct DiagnosticState {
    pub command_id: u64,
    pub action: String,
    repo_root: String,
    home: Option<String>,
    args: Vec<String>,
    attempt: u32,
    started_at_ms: Option<u64>,
}

impl DiagnosticState {
    pub fn new(command_id: u64, action: impl Into<String>, repo_root: impl Into<String>, raw_args: &[String]) -> Self {
        let repo_root = repo_root.into();
        let home = std::env::var("HOME").ok();
        let args = raw_args.iter().map(|a| sanitize_path(a, &repo_root, home.as_deref())).collect();
        Self { command_id, action: action.into(), repo_root, home, args, attempt: 0, started_at_ms: None }
    }

    pub fn queued(&self) -> DiagnosticPayload {
        self.payload(DiagnosticStage::Queued, None, None, None, None)
    }

    pub fn started(&mut self, now_ms: u64) -> DiagnosticPayload {
        self.started_at_ms = Some(now_ms);
        self.attempt = 1;
        self.payload(DiagnosticStage::Started, None, None, None, None)
    }

    pub fn retried(&mut self, stderr: &str) -> DiagnosticPayload {
        self.attempt += 1;
        let sanitized = sanitize_stderr(stderr, &self.repo_root, self.home.as_deref());
        self.payload(DiagnosticStage::Retried, Some(sanitized), None, None, None)
    }

    pub fn succeeded(&self, now_ms: u64, exit_code: i32) -> DiagnosticPayload {
        let duration = self.started_at_ms.map(|start| now_ms.saturating_sub(start));
        self.payload(DiagnosticStage::Succeeded, None, duration, Some(exit_code), None)
    }

    pub fn failed(&self, now_ms: u64, exit_code: Option<i32>, stderr: Option<&str>, error: impl Into<String>) -> DiagnosticPayload {
        let duration = self.started_at_ms.map(|start| now_ms.saturating_sub(start));
        let stderr = stderr.map(|s| sanitize_stderr(s, &self.repo_root, self.home.as_deref()));
        self.payload(DiagnosticStage::Failed, stderr, duration, exit_code, Some(error.into()))
    }

    fn payload(
        &self,
        stage: DiagnosticStage,
        stderr_sanitized: Option<String>,
        duration_ms: Option<u64>,
        exit_code: Option<i32>,
        error: Option<String>,
    ) -> DiagnosticPayload {
        DiagnosticPayload {
            command_id: self.command_id,
            action: self.action.clone(),
            stage,
            args: self.args.clone(),
            stderr_sanitized,
            duration_ms,
            attempt: self.attempt,
            exit_code,
            error,
        }
    }
}

/// Replaces `repoRoot` occurrences with `<repo>`, the home directory with
/// `~`, and any other absolute path with `<abs-path>`.
pub fn sanitize_path(input: &str, repo_root: &str, home: Option<&str>) -> String {
    let mut out = input.to_string();
    if !repo_root.is_empty() {
        out = out.replace(repo_root, "<repo>");
    }
    if let Some(home) = home {
        if !home.is_empty() {
            out = out.replace(home, "~");
        }
    }
    redact_remaining_absolute_paths(&out)
}

/// Same substitutions as [`sanitize_path`] plus newline folding and a
/// 1200-char cap with a `...(truncated)` suffix, per the stderr sanitization
/// rule.
pub fn sanitize_stderr(stderr: &str, repo_root: &str, home: Option<&str>) -> String {
    let folded = stderr.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let sanitized = sanitize_path(&folded, repo_root, home);
    if sanitized.chars().count() > STDERR_CAP {
        let truncated: String = sanitized.chars().take(STDERR_CAP).collect();
        format!("{truncated}{STDERR_TRUNCATION_SUFFIX}")
    } else {
        sanitized
    }
}

/// Best-effort scrub of any absolute path fragment that survived the
/// repo-root/home substitutions (e.g. a second repo's path mentioned in an
/// error message). Walks whitespace-delimited tokens; anything starting with
/// `/` and not already one of our placeholders becomes `<abs-path>`.
fn redact_remaining_absolute_paths(input: &str) -> String {
    input
        .split(' ')
        .map(|token| {
            if token.starts_with('/') && token != "<repo>" && !token.starts_with("<repo>/") {
                "<abs-path>"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod tests;
