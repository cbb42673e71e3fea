// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified error codes shared across the session API, the signaling hub, and
//! the Git command queue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error codes surfaced to callers. Session-family variants match the
/// error strings literally (spec §7); Git-panel variants carry the `E_`
/// prefix convention from the same section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Session family
    NoActiveSession,
    HostAlreadyHasActiveSession,
    SessionNotFound,
    SessionHasEnded,
    SessionIsFull,
    AnonymousGuestsNotAllowed,
    GuestRejected,
    ApprovalWindowExpired,
    SessionCodeExpired,
    InvalidCodeFormat,
    JoinRateLimitExceeded,
    TooManyInvalidJoinAttempts,
    InvalidSessionCode,
    WorkspaceScopeDenied,

    // Git Panel family (E_ prefix)
    ServiceUnavailable,
    GitUnavailable,
    RepoNotResolved,
    RepoNotFound,
    RepoNotGit,
    RepoOutOfScope,
    InvalidPath,
    InvalidCursor,
    PatchInvalid,
    CommandFailed,
    Timeout,
    Canceled,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no active session",
            Self::HostAlreadyHasActiveSession => "host already has an active session",
            Self::SessionNotFound => "session not found",
            Self::SessionHasEnded => "session has ended",
            Self::SessionIsFull => "session is full",
            Self::AnonymousGuestsNotAllowed => "anonymous guests are not allowed",
            Self::GuestRejected => "you were rejected from this session",
            Self::ApprovalWindowExpired => "approval window expired",
            Self::SessionCodeExpired => "session code has expired",
            Self::InvalidCodeFormat => "invalid code format",
            Self::JoinRateLimitExceeded => "join rate limit exceeded",
            Self::TooManyInvalidJoinAttempts => "too many invalid join attempts",
            Self::InvalidSessionCode => "invalid session code",
            Self::WorkspaceScopeDenied => "outside scoped workspace",

            Self::ServiceUnavailable => "E_SERVICE_UNAVAILABLE",
            Self::GitUnavailable => "E_GIT_UNAVAILABLE",
            Self::RepoNotResolved => "E_REPO_NOT_RESOLVED",
            Self::RepoNotFound => "E_REPO_NOT_FOUND",
            Self::RepoNotGit => "E_REPO_NOT_GIT",
            Self::RepoOutOfScope => "E_REPO_OUT_OF_SCOPE",
            Self::InvalidPath => "E_INVALID_PATH",
            Self::InvalidCursor => "E_INVALID_CURSOR",
            Self::PatchInvalid => "E_PATCH_INVALID",
            Self::CommandFailed => "E_COMMAND_FAILED",
            Self::Timeout => "E_TIMEOUT",
            Self::Canceled => "E_CANCELED",
            Self::Unknown => "E_UNKNOWN",
        }
    }

    /// Reverse of [`ErrorCode::as_str`], for callers that only have the
    /// wire-level `{error: string}` body to work with (e.g. a gateway
    /// client delegating to a remote owner). Unrecognized strings map to
    /// `Unknown` rather than failing — the message is still preserved by
    /// the caller via [`OrchError::with_detail`].
    pub fn from_message(message: &str) -> Self {
        match message {
            "no active session" => Self::NoActiveSession,
            "host already has an active session" => Self::HostAlreadyHasActiveSession,
            "session not found" => Self::SessionNotFound,
            "session has ended" => Self::SessionHasEnded,
            "session is full" => Self::SessionIsFull,
            "anonymous guests are not allowed" => Self::AnonymousGuestsNotAllowed,
            "you were rejected from this session" => Self::GuestRejected,
            "approval window expired" => Self::ApprovalWindowExpired,
            "session code has expired" => Self::SessionCodeExpired,
            "invalid code format" => Self::InvalidCodeFormat,
            "join rate limit exceeded" => Self::JoinRateLimitExceeded,
            "too many invalid join attempts" => Self::TooManyInvalidJoinAttempts,
            "invalid session code" => Self::InvalidSessionCode,
            "outside scoped workspace" => Self::WorkspaceScopeDenied,
            "E_SERVICE_UNAVAILABLE" => Self::ServiceUnavailable,
            "E_GIT_UNAVAILABLE" => Self::GitUnavailable,
            "E_REPO_NOT_RESOLVED" => Self::RepoNotResolved,
            "E_REPO_NOT_FOUND" => Self::RepoNotFound,
            "E_REPO_NOT_GIT" => Self::RepoNotGit,
            "E_REPO_OUT_OF_SCOPE" => Self::RepoOutOfScope,
            "E_INVALID_PATH" => Self::InvalidPath,
            "E_INVALID_CURSOR" => Self::InvalidCursor,
            "E_PATCH_INVALID" => Self::PatchInvalid,
            "E_COMMAND_FAILED" => Self::CommandFailed,
            "E_TIMEOUT" => Self::Timeout,
            "E_CANCELED" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NoActiveSession
            | Self::SessionNotFound
            | Self::RepoNotFound
            | Self::RepoNotResolved => 404,
            Self::HostAlreadyHasActiveSession
            | Self::SessionIsFull
            | Self::SessionHasEnded
            | Self::GuestRejected
            | Self::ApprovalWindowExpired
            | Self::SessionCodeExpired
            | Self::JoinRateLimitExceeded
            | Self::TooManyInvalidJoinAttempts
            | Self::RepoOutOfScope => 409,
            Self::AnonymousGuestsNotAllowed
            | Self::InvalidCodeFormat
            | Self::InvalidSessionCode
            | Self::InvalidPath
            | Self::InvalidCursor
            | Self::PatchInvalid
            | Self::RepoNotGit => 400,
            Self::WorkspaceScopeDenied => 403,
            Self::Timeout => 504,
            Self::Canceled => 499,
            Self::ServiceUnavailable | Self::GitUnavailable => 503,
            Self::CommandFailed | Self::Unknown => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error: a stable [`ErrorCode`] plus optional technical detail.
/// Technical detail is never derived from the `Display` impl so that callers
/// cannot accidentally leak it into a user-facing message.
#[derive(Debug, thiserror::Error)]
#[error("{code}")]
pub struct OrchError {
    pub code: ErrorCode,
    pub detail: Option<String>,
}

impl OrchError {
    pub fn new(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self { code, detail: Some(detail.into()) }
    }

    /// User-facing message. For the session family this is the stable string
    /// from `ErrorCode::as_str`; technical detail is never included.
    pub fn message(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<ErrorCode> for OrchError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
