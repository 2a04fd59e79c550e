// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokio loop feeding both connections into a [`Dispatcher`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{DisplayState, Dispatcher, ExpiryTicket};
use crate::connection::{ConnectionEvent, ConnectionHandle, ConnectionState};
use crate::protocol::{DisplayMessage, StreamEvent};

/// What the dispatch loop reads from one connection.
///
/// Payloads arrive on the observer queue, which may drop events under
/// back-pressure. The indicator state is taken from the lossless watch
/// mirror instead, so `State` events on the queue are ignored.
pub struct Feed<M> {
    pub events: mpsc::Receiver<ConnectionEvent<M>>,
    pub state: watch::Receiver<ConnectionState>,
}

impl<M: Send + 'static> Feed<M> {
    /// Subscribe to `connection` with an observer queue of `capacity`.
    pub async fn subscribe(
        connection: &ConnectionHandle<M>,
        capacity: usize,
    ) -> anyhow::Result<Self> {
        let events = connection.subscribe(capacity).await?;
        Ok(Self { events, state: connection.state_receiver() })
    }
}

/// Spawn the dispatch loop. The returned watch channel always holds the
/// latest [`DisplayState`].
pub fn spawn_dispatch(
    dispatcher: Dispatcher,
    push: Feed<DisplayMessage>,
    stream: Feed<StreamEvent>,
    shutdown: CancellationToken,
) -> (watch::Receiver<DisplayState>, JoinHandle<()>) {
    let initial = DisplayState {
        content: dispatcher.current(),
        push: *push.state.borrow(),
        stream: *stream.state.borrow(),
    };
    let (tx, rx) = watch::channel(initial);
    let handle = tokio::spawn(run(dispatcher, push, stream, tx, shutdown));
    (rx, handle)
}

async fn run(
    mut dispatcher: Dispatcher,
    mut push: Feed<DisplayMessage>,
    mut stream: Feed<StreamEvent>,
    tx: watch::Sender<DisplayState>,
    shutdown: CancellationToken,
) {
    // Only the latest ticket is ever pending; arming a new one replaces it.
    let mut expiry: Option<(Instant, ExpiryTicket)> = None;

    loop {
        let deadline = expiry.map(|(at, _)| at);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Ok(()) = push.state.changed() => {
                let state = *push.state.borrow_and_update();
                tx.send_if_modified(|s| replace(&mut s.push, state));
            }
            Ok(()) = stream.state.changed() => {
                let state = *stream.state.borrow_and_update();
                tx.send_if_modified(|s| replace(&mut s.stream, state));
            }
            Some(event) = push.events.recv() => {
                if let ConnectionEvent::Message(message) = event {
                    let out = dispatcher.dispatch(message);
                    if out.changed {
                        expiry = out.expiry.and_then(arm);
                        publish(&tx, &dispatcher);
                    }
                }
            }
            Some(event) = stream.events.recv() => {
                if let ConnectionEvent::Message(StreamEvent::PowerReading(reading)) = event {
                    dispatcher.record_reading(reading);
                    publish(&tx, &dispatcher);
                }
            }
            _ = sleep_until(deadline) => {
                if let Some((_, ticket)) = expiry.take() {
                    if dispatcher.expire(ticket) {
                        publish(&tx, &dispatcher);
                    }
                }
            }
        }
    }
    debug!("dispatch loop stopped");
}

/// Deadline for `ticket`. A delay past the clock's range never fires.
fn arm(ticket: ExpiryTicket) -> Option<(Instant, ExpiryTicket)> {
    match Instant::now().checked_add(ticket.after) {
        Some(at) => Some((at, ticket)),
        None => {
            debug!(
                after_ms = ticket.after.as_millis() as u64,
                "expiry out of range, showing until superseded"
            );
            None
        }
    }
}

fn publish(tx: &watch::Sender<DisplayState>, dispatcher: &Dispatcher) {
    let content = dispatcher.current();
    tx.send_if_modified(|s| replace(&mut s.content, content));
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
