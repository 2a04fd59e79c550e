// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-observer bounded channels for connection notifications.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{ConnectionEvent, ConnectionState};

/// Registered observers, notified in registration order.
///
/// Delivery never blocks the connection driver: a closed observer is pruned
/// and a full one loses that notification.
pub struct Observers<M> {
    label: &'static str,
    subscribers: Vec<mpsc::Sender<ConnectionEvent<M>>>,
}

impl<M: Clone> Observers<M> {
    pub fn new(label: &'static str) -> Self {
        Self { label, subscribers: Vec::new() }
    }

    /// Register a new observer. Its first notification is the current state.
    pub fn register(
        &mut self,
        capacity: usize,
        current: ConnectionState,
    ) -> mpsc::Receiver<ConnectionEvent<M>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let _ = tx.try_send(ConnectionEvent::State(current));
        self.subscribers.push(tx);
        rx
    }

    pub fn notify(&mut self, event: ConnectionEvent<M>) {
        let label = self.label;
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(transport = label, "observer is not keeping up, dropping event");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
