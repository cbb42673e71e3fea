// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Runtime configuration for the `orch-gateway` facade. Shares its listen
/// address and base URL env vars with `orchd`'s own gateway fields (spec
/// §6) so the two processes agree on where the shared port lives.
#[derive(Debug, Clone, Parser)]
#[command(name = "orch-gateway", version, about)]
pub struct GatewayConfig {
    /// Loopback address this process probes/binds for the session gateway.
    #[arg(long, env = "ORCH_SESSION_GATEWAY_LISTEN_ADDR", default_value = "127.0.0.1:9888")]
    pub listen_addr: String,

    /// Base URL to reach an owning instance when this process can't bind
    /// `listen_addr` itself. Defaults to `http://<listen_addr>`.
    #[arg(long, env = "ORCH_SESSION_GATEWAY_BASE_URL")]
    pub base_url: Option<String>,

    /// Timeout for a single delegated HTTP call in client mode.
    #[arg(long, env = "ORCH_GATEWAY_REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| format!("http://{}", self.listen_addr))
    }
}
