// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    no_active_session = { ErrorCode::NoActiveSession, "no active session" },
    host_already_active = { ErrorCode::HostAlreadyHasActiveSession, "host already has an active session" },
    session_not_found = { ErrorCode::SessionNotFound, "session not found" },
    invalid_code = { ErrorCode::InvalidSessionCode, "invalid session code" },
    too_many_invalid = { ErrorCode::TooManyInvalidJoinAttempts, "too many invalid join attempts" },
    rate_limited = { ErrorCode::JoinRateLimitExceeded, "join rate limit exceeded" },
    workspace_scope_denied = { ErrorCode::WorkspaceScopeDenied, "outside scoped workspace" },
)]
fn stable_message_text(code: ErrorCode, expected: &str) {
    assert_eq!(code.as_str(), expected);
}

#[test]
fn git_panel_codes_carry_prefix() {
    assert_eq!(ErrorCode::RepoOutOfScope.as_str(), "E_REPO_OUT_OF_SCOPE");
    assert_eq!(ErrorCode::Timeout.as_str(), "E_TIMEOUT");
    assert_eq!(ErrorCode::Canceled.as_str(), "E_CANCELED");
}

#[test]
fn detail_never_leaks_into_message() {
    let err = OrchError::with_detail(ErrorCode::InvalidSessionCode, "code ABCD-EFG unknown");
    assert_eq!(err.message(), "invalid session code");
    assert_ne!(err.message(), "code ABCD-EFG unknown");
}

#[test]
fn from_message_round_trips_as_str() {
    for code in [
        ErrorCode::SessionNotFound,
        ErrorCode::InvalidSessionCode,
        ErrorCode::RepoOutOfScope,
        ErrorCode::Timeout,
        ErrorCode::WorkspaceScopeDenied,
    ] {
        assert_eq!(ErrorCode::from_message(code.as_str()), code);
    }
}

#[test]
fn from_message_defaults_to_unknown_for_unrecognized_text() {
    assert_eq!(ErrorCode::from_message("something a server never sends"), ErrorCode::Unknown);
}

#[test]
fn http_status_classes() {
    assert_eq!(ErrorCode::SessionNotFound.http_status(), 404);
    assert_eq!(ErrorCode::SessionIsFull.http_status(), 409);
    assert_eq!(ErrorCode::InvalidCodeFormat.http_status(), 400);
    assert_eq!(ErrorCode::CommandFailed.http_status(), 500);
    assert_eq!(ErrorCode::GitUnavailable.http_status(), 503);
    assert_eq!(ErrorCode::WorkspaceScopeDenied.http_status(), 403);
}
