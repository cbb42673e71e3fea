// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock helpers. Timestamps travel as milliseconds since the Unix
//! epoch so that persisted rows survive a process restart without needing a
//! `SystemTime` (de)serializer.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

pub fn ms_from_now(duration: std::time::Duration) -> u64 {
    now_ms() + duration.as_millis() as u64
}
