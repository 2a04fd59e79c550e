// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional push transport over WebSocket.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::{ConnectRequest, Connector, TransportEvent};

/// Outbound frames queued while the socket is busy writing.
const OUTBOUND_CAPACITY: usize = 16;

/// Opens one WebSocket per attempt and forwards every text frame.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, request: ConnectRequest) {
        tokio::spawn(run(request));
    }
}

async fn run(request: ConnectRequest) {
    let ConnectRequest { url, epoch, events, cancel } = request;

    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
    };
    let ws = match connected {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::debug!(url = %url, err = %e, "push connect failed");
            if !cancel.is_cancelled() {
                let _ = events.send(TransportEvent::Closed { epoch, reason: e.to_string() }).await;
            }
            return;
        }
    };

    let (mut write, mut read) = ws.split();
    let (outbound_tx, mut outbound) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    if events.send(TransportEvent::Opened { epoch, outbound: Some(outbound_tx) }).await.is_err() {
        return;
    }

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = write.send(Message::text(text)).await {
                    break format!("write failed: {e}");
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let frame = TransportEvent::Frame { epoch, text: text.to_string() };
                    if events.send(frame).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.to_string()).unwrap_or_else(|| "closed".to_owned());
                }
                None => break "stream ended".to_owned(),
                Some(Err(e)) => break e.to_string(),
                // Pings are answered by tungstenite; binary is not part of the protocol.
                Some(Ok(_)) => {}
            },
        }
    };

    if !cancel.is_cancelled() {
        let _ = events.send(TransportEvent::Closed { epoch, reason }).await;
    }
}
