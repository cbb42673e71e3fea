// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use orch_gateway::config::GatewayConfig;
use tracing::error;

#[tokio::main]
async fn main() {
    let config = GatewayConfig::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    if let Err(err) = orch_gateway::run(config).await {
        error!("fatal: {err:#}");
        std::process::exit(1);
    }
}
