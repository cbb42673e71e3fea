// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `orchd` binary as a subprocess and exercises it over its
//! HTTP session gateway and WebSocket signaling endpoint.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `orchd` binary.
pub fn orchd_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("orchd")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `orchd` process that is killed on drop.
pub struct OrchdProcess {
    child: Child,
    gateway_port: u16,
    signaling_port: u16,
}

impl OrchdProcess {
    /// Spawn `orchd` with its gateway and signaling ports bound to free
    /// loopback ports, and development-mode signaling origins (empty
    /// allow-list accepts any origin).
    pub fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = orchd_binary();
        anyhow::ensure!(binary.exists(), "orchd binary not found at {}", binary.display());

        let gateway_port = free_port()?;
        let signaling_port = free_port()?;

        let child = Command::new(&binary)
            .args([
                "--gateway-listen-addr",
                &format!("127.0.0.1:{gateway_port}"),
                "--signaling-listen-addr",
                &format!("127.0.0.1:{signaling_port}"),
                "--log-level",
                "warn",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, gateway_port, signaling_port })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.gateway_port)
    }

    pub fn ws_url(&self, session: &str, user: &str, role: &str) -> String {
        format!("ws://127.0.0.1:{}/ws/signal?session={session}&user={user}&role={role}", self.signaling_port)
    }

    /// Poll the gateway until it accepts connections.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/session/active?userID=healthcheck", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("orchd did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for OrchdProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A connected signaling WebSocket peer, with helpers for the JSON frame
/// shape from spec §6 (`{type, payload?, targetUserID?, fromUserID?,
/// sessionID?}`).
pub struct SignalPeer {
    socket: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

impl SignalPeer {
    pub async fn connect(orchd: &OrchdProcess, session: &str, user: &str, role: &str) -> anyhow::Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(orchd.ws_url(session, user, role)).await?;
        Ok(Self { socket })
    }

    pub async fn send(&mut self, frame: serde_json::Value) -> anyhow::Result<()> {
        self.socket.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Waits for the next JSON frame, up to `timeout`.
    pub async fn recv(&mut self, timeout: Duration) -> anyhow::Result<serde_json::Value> {
        let msg = tokio::time::timeout(timeout, self.socket.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("signaling socket closed before a frame arrived"))??;
        match msg {
            Message::Text(text) => Ok(serde_json::from_str(&text)?),
            other => anyhow::bail!("expected a text frame, got {other:?}"),
        }
    }
}
