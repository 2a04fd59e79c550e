// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for the transport and sound ports.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::{ConnectionEvent, ConnectionState};
use crate::sound::SoundSink;
use crate::transport::{ConnectRequest, Connector};

/// Connector that hands every attempt to the test instead of opening I/O.
pub struct FakeConnector {
    requests: mpsc::UnboundedSender<ConnectRequest>,
}

impl FakeConnector {
    pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<ConnectRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (std::sync::Arc::new(Self { requests }), rx)
    }
}

impl Connector for FakeConnector {
    fn connect(&self, request: ConnectRequest) {
        let _ = self.requests.send(request);
    }
}

/// Sound sink that records every token it is asked to play.
#[derive(Default)]
pub struct RecordingSound {
    played: Mutex<Vec<String>>,
}

impl RecordingSound {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }
}

impl SoundSink for RecordingSound {
    fn play(&self, sound: &str) {
        self.played.lock().push(sound.to_owned());
    }
}

/// Receive the next observer event or fail after `timeout`.
pub async fn next_event<M>(
    rx: &mut mpsc::Receiver<ConnectionEvent<M>>,
    timeout: Duration,
) -> anyhow::Result<ConnectionEvent<M>> {
    tokio::time::timeout(timeout, rx.recv())
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for connection event"))?
        .ok_or_else(|| anyhow::anyhow!("observer channel closed"))
}

/// Skip events until the observer reports `state`.
pub async fn wait_for_state<M>(
    rx: &mut mpsc::Receiver<ConnectionEvent<M>>,
    state: ConnectionState,
    timeout: Duration,
) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if let ConnectionEvent::State(s) = next_event(rx, remaining).await? {
            if s == state {
                return Ok(());
            }
        }
    }
}
