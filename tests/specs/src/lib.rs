// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end tests.
//!
//! Spawns the real `marquee-relay` and `marquee` binaries as subprocesses
//! and drives them over HTTP and WebSocket.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to a compiled workspace binary.
pub fn binary(name: &str) -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join(name)
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `marquee-relay` process that is killed on drop.
pub struct RelayProcess {
    child: Child,
    port: u16,
}

impl RelayProcess {
    /// Spawn the relay on a free port.
    pub fn start() -> anyhow::Result<Self> {
        Self::start_on(free_port()?, 30_000)
    }

    /// Spawn the relay on `port` with the given heartbeat interval.
    pub fn start_on(port: u16, heartbeat_ms: u64) -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = binary("marquee-relay");
        anyhow::ensure!(binary.exists(), "marquee-relay binary not found at {}", binary.display());

        let child = Command::new(&binary)
            .args([
                "--host",
                "127.0.0.1",
                "--port",
                &port.to_string(),
                "--heartbeat-ms",
                &heartbeat_ms.to_string(),
                "--log-level",
                "warn",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Poll `/health` until the relay answers.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relay did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// `POST /send` and return the number of displays written to.
    pub async fn send(&self, message: &serde_json::Value) -> anyhow::Result<u64> {
        let resp: serde_json::Value = reqwest::Client::new()
            .post(format!("{}/send", self.base_url()))
            .json(message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        resp["clients"].as_u64().ok_or_else(|| anyhow::anyhow!("no client count in {resp}"))
    }

    /// Connected display count from `/status`.
    pub async fn clients(&self) -> anyhow::Result<u64> {
        let resp: serde_json::Value =
            reqwest::get(format!("{}/status", self.base_url())).await?.json().await?;
        resp["clients"].as_u64().ok_or_else(|| anyhow::anyhow!("no client count in {resp}"))
    }

    /// Poll `/status` until `n` displays are connected.
    pub async fn wait_for_clients(&self, n: u64, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.clients().await.ok() == Some(n) {
                return Ok(());
            }
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relay never reached {n} clients");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Kill the process and wait for it to exit.
    pub fn kill(&mut self) -> anyhow::Result<()> {
        let _ = self.child.kill();
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for RelayProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run the `marquee` CLI to completion against `config_dir`.
pub fn marquee_cli(config_dir: &Path, args: &[&str]) -> anyhow::Result<Output> {
    let binary = binary("marquee");
    anyhow::ensure!(binary.exists(), "marquee binary not found at {}", binary.display());
    let output = Command::new(&binary)
        .arg("--config-dir")
        .arg(config_dir)
        .args(["--log-level", "warn"])
        .args(args)
        .output()?;
    Ok(output)
}
