// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Runtime configuration for the `orchd` backend core.
///
/// Every tunable the spec leaves as "default N, implementer may tune" is
/// exposed as an env-backed flag here rather than a buried constant, per the
/// teacher's `Config` (`crates/orch-core` formerly `coop`) convention.
#[derive(Debug, Clone, Parser)]
#[command(name = "orchd", version, about)]
pub struct Config {
    /// Loopback address for the session HTTP gateway (`off`/`disabled`/`none` to suppress).
    #[arg(long, env = "ORCH_SESSION_GATEWAY_LISTEN_ADDR", default_value = "127.0.0.1:9888")]
    pub gateway_listen_addr: String,

    /// Base URL other instances use to reach the gateway owner.
    #[arg(long, env = "ORCH_SESSION_GATEWAY_BASE_URL")]
    pub gateway_base_url: Option<String>,

    /// Loopback address for the WebRTC signaling endpoint.
    #[arg(long, env = "ORCH_SESSION_SIGNALING_LISTEN_ADDR", default_value = "127.0.0.1:9876")]
    pub signaling_listen_addr: String,

    /// Base URL advertised for the signaling endpoint.
    #[arg(long, env = "ORCH_SESSION_SIGNALING_BASE_URL")]
    pub signaling_base_url: Option<String>,

    /// Comma-separated allow-list of WebSocket origins. Empty means
    /// "development mode" — all origins accepted.
    #[arg(long, env = "ORCH_SIGNALING_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub signaling_allowed_origins: Vec<String>,

    /// Short-code TTL in minutes (spec default 15).
    #[arg(long, env = "ORCH_CODE_TTL_MINUTES", default_value = "15")]
    pub code_ttl_minutes: u64,

    /// Pending-guest approval window in seconds (spec default 5 min).
    #[arg(long, env = "ORCH_APPROVAL_WINDOW_SECS", default_value = "300")]
    pub approval_window_secs: u64,

    /// Join invalid-attempt sliding window in seconds (spec default 10 min).
    #[arg(long, env = "ORCH_JOIN_INVALID_WINDOW_SECS", default_value = "600")]
    pub join_invalid_window_secs: u64,

    /// Invalid-attempt count before lockout (spec default 5).
    #[arg(long, env = "ORCH_JOIN_INVALID_THRESHOLD", default_value = "5")]
    pub join_invalid_threshold: u32,

    /// Lockout duration in seconds once threshold is reached (spec default 10 min).
    #[arg(long, env = "ORCH_JOIN_LOCK_SECS", default_value = "600")]
    pub join_lock_secs: u64,

    /// Per-(session,guest) join rate-limit window in seconds.
    #[arg(long, env = "ORCH_JOIN_RATE_WINDOW_SECS", default_value = "60")]
    pub join_rate_window_secs: u64,

    /// Max joins per (session,guest) within the rate window.
    #[arg(long, env = "ORCH_JOIN_RATE_MAX", default_value = "5")]
    pub join_rate_max: u32,

    /// Bounded channel capacity per repo command queue.
    #[arg(long, env = "ORCH_COMMAND_QUEUE_CAPACITY", default_value = "64")]
    pub command_queue_capacity: usize,

    /// Write-command timeout in seconds (spec default 12s).
    #[arg(long, env = "ORCH_WRITE_TIMEOUT_SECS", default_value = "12")]
    pub write_timeout_secs: u64,

    /// Read-command timeout in seconds (spec default 8s).
    #[arg(long, env = "ORCH_READ_TIMEOUT_SECS", default_value = "8")]
    pub read_timeout_secs: u64,

    /// Terminal ring buffer capacity in bytes (spec default 64 KiB).
    #[arg(long, env = "ORCH_TERMINAL_RING_BYTES", default_value = "65536")]
    pub terminal_ring_bytes: usize,

    /// Log format (json or text).
    #[arg(long, env = "ORCH_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ORCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_minutes * 60)
    }

    pub fn approval_window(&self) -> Duration {
        Duration::from_secs(self.approval_window_secs)
    }

    pub fn join_invalid_window(&self) -> Duration {
        Duration::from_secs(self.join_invalid_window_secs)
    }

    pub fn join_lock_duration(&self) -> Duration {
        Duration::from_secs(self.join_lock_secs)
    }

    pub fn join_rate_window(&self) -> Duration {
        Duration::from_secs(self.join_rate_window_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Gateway disabled iff the listen addr is one of the documented sentinels.
    pub fn gateway_disabled(&self) -> bool {
        matches!(self.gateway_listen_addr.as_str(), "off" | "disabled" | "none")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
