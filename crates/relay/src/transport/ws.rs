// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket sessions for connected displays.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use marquee::protocol::ClientFrame;

use crate::registry::{ClientSession, SESSION_QUEUE};
use crate::state::RelayState;

/// What a display sent us.
#[derive(Debug)]
pub enum Inbound {
    /// Hello or status: handled here, never fanned out.
    Identify(ClientFrame),
    /// Anything else that parses as JSON is relayed to the other displays.
    Relay,
    Malformed(serde_json::Error),
}

pub fn classify(text: &str) -> Inbound {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Inbound::Malformed(e),
    };
    let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or_default();
    if !ClientFrame::TYPES.contains(&kind) {
        return Inbound::Relay;
    }
    match serde_json::from_value(value) {
        Ok(frame) => Inbound::Identify(frame),
        Err(e) => Inbound::Malformed(e),
    }
}

/// `GET /ws`: upgrade to a display session.
pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(socket: WebSocket, state: Arc<RelayState>) {
    let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(SESSION_QUEUE);
    let (session, _guard) = state.registry.register(tx);
    let (mut ws_tx, mut ws_rx) = socket.split();
    session.mark_ready();
    info!(session_id = %session.id, clients = state.registry.len(), "display connected");

    let period = state.config.heartbeat_interval();
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut alive = true;

    let reason = loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break "relay shutting down";
            }

            Some(frame) = rx.recv() => {
                if ws_tx.send(Message::Text(frame)).await.is_err() {
                    break "write failed";
                }
            }

            _ = heartbeat.tick() => {
                if !alive {
                    break "heartbeat missed";
                }
                alive = false;
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break "write failed";
                }
            }

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_inbound(&state, &session, text),
                Some(Ok(Message::Pong(_))) => alive = true,
                Some(Ok(Message::Close(_))) | None => break "closed by display",
                Some(Err(_)) => break "socket error",
                _ => {}
            },
        }
    };

    session.mark_closing();
    info!(
        session_id = %session.id,
        client = %session.client_name().unwrap_or_default(),
        reason,
        "display disconnected"
    );
}

fn handle_inbound(state: &RelayState, session: &ClientSession, text: Utf8Bytes) {
    match classify(text.as_str()) {
        Inbound::Identify(ClientFrame::Hello { client }) => {
            info!(session_id = %session.id, client = %client, "display identified");
            session.set_client_name(client);
        }
        Inbound::Identify(ClientFrame::Status { client, state: status }) => {
            debug!(
                session_id = %session.id,
                client = %client.unwrap_or_default(),
                status = %status.unwrap_or_default(),
                "display status"
            );
        }
        Inbound::Relay => {
            let delivered = state.registry.broadcast(text, Some(&session.id));
            debug!(session_id = %session.id, delivered, "relayed display frame");
        }
        Inbound::Malformed(e) => {
            debug!(session_id = %session.id, err = %e, "dropping malformed frame");
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
