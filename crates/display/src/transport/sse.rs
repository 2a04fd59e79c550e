// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unidirectional stream transport over Server-Sent Events.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;

use super::event_stream::SseDecoder;
use super::{ConnectRequest, Connector, TransportEvent};

/// Consumes a `text/event-stream` endpoint, one GET per attempt.
///
/// The id of the last delivered event is remembered across attempts and
/// sent back as `Last-Event-ID` so the server may resume the stream.
#[derive(Clone)]
pub struct SseConnector {
    client: reqwest::Client,
    last_event_id: Arc<Mutex<Option<String>>>,
}

impl SseConnector {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().connect_timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, last_event_id: Arc::new(Mutex::new(None)) })
    }

    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id.lock().clone()
    }
}

impl Connector for SseConnector {
    fn connect(&self, request: ConnectRequest) {
        tokio::spawn(run(self.clone(), request));
    }
}

async fn run(connector: SseConnector, request: ConnectRequest) {
    let ConnectRequest { url, epoch, events, cancel } = request;

    let mut req = connector.client.get(&url).header(reqwest::header::ACCEPT, "text/event-stream");
    if let Some(id) = connector.last_event_id() {
        req = req.header("Last-Event-ID", id);
    }

    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        result = open(req) => result,
    };
    let response = match opened {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %url, err = %e, "stream connect failed");
            if !cancel.is_cancelled() {
                let _ = events.send(TransportEvent::Closed { epoch, reason: e.to_string() }).await;
            }
            return;
        }
    };

    if events.send(TransportEvent::Opened { epoch, outbound: None }).await.is_err() {
        return;
    }

    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = body.next() => match chunk {
                Some(Ok(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        if let Some(id) = event.id.filter(|id| !id.is_empty()) {
                            *connector.last_event_id.lock() = Some(id);
                        }
                        let frame = TransportEvent::Frame { epoch, text: event.data };
                        if events.send(frame).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_owned(),
            },
        }
    };

    if !cancel.is_cancelled() {
        let _ = events.send(TransportEvent::Closed { epoch, reason }).await;
    }
}

async fn open(req: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
    let response = req.send().await?.error_for_status()?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("text/event-stream") {
        anyhow::bail!("unexpected content type {content_type:?}");
    }
    Ok(response)
}
