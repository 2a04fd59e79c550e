// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live display sessions and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::Utf8Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use marquee::protocol::DisplayMessage;

/// Frames a session may have queued for its socket writer.
pub const SESSION_QUEUE: usize = 32;

/// One connected display.
pub struct ClientSession {
    pub id: String,
    pub connected_at: Instant,
    outbound: mpsc::Sender<Utf8Bytes>,
    ready: AtomicBool,
    client: Mutex<Option<String>>,
}

impl ClientSession {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// The transport is winding down; broadcasts skip it from now on.
    pub fn mark_closing(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Name announced by the display's hello frame.
    pub fn client_name(&self) -> Option<String> {
        self.client.lock().clone()
    }

    pub fn set_client_name(&self, name: impl Into<String>) {
        *self.client.lock() = Some(name.into());
    }

    /// Hand a frame to the socket writer without waiting.
    fn deliver(&self, frame: Utf8Bytes) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(session_id = %self.id, "session queue full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// The set of live sessions.
///
/// The lock is only held to copy or edit the map, never across an await.
#[derive(Default)]
pub struct ClientRegistry {
    sessions: RwLock<HashMap<String, Arc<ClientSession>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session writing into `outbound`. The returned guard removes it
    /// when dropped.
    pub fn register(
        self: &Arc<Self>,
        outbound: mpsc::Sender<Utf8Bytes>,
    ) -> (Arc<ClientSession>, SessionGuard) {
        let session = Arc::new(ClientSession {
            id: uuid::Uuid::new_v4().to_string(),
            connected_at: Instant::now(),
            outbound,
            ready: AtomicBool::new(false),
            client: Mutex::new(None),
        });
        self.sessions.write().insert(session.id.clone(), Arc::clone(&session));
        debug!(session_id = %session.id, clients = self.len(), "session added");
        let guard = SessionGuard { registry: Arc::clone(self), id: session.id.clone() };
        (session, guard)
    }

    /// Remove a session. Returns false if it was already gone.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            debug!(session_id = %id, clients = self.len(), "session removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<ClientSession>> {
        self.sessions.read().get(id).cloned()
    }

    /// Snapshot of the current sessions.
    pub fn sessions(&self) -> Vec<Arc<ClientSession>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Write `frame` to every session that is ready right now, except
    /// `except`. Returns the number of sessions written to.
    pub fn broadcast(&self, frame: Utf8Bytes, except: Option<&str>) -> usize {
        self.sessions()
            .iter()
            .filter(|s| s.is_ready() && except != Some(s.id.as_str()))
            .filter(|s| s.deliver(frame.clone()))
            .count()
    }

    /// Serialize `message` once and broadcast it to every ready session.
    pub fn broadcast_message(&self, message: &DisplayMessage) -> anyhow::Result<usize> {
        let frame = serde_json::to_string(message)?;
        Ok(self.broadcast(Utf8Bytes::from(frame), None))
    }
}

/// Removes its session from the registry on drop.
pub struct SessionGuard {
    registry: Arc<ClientRegistry>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
