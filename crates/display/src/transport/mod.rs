// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport port used by the connection driver, plus the WebSocket and
//! Server-Sent Events implementations.

pub mod event_stream;
pub mod sse;
pub mod ws;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use sse::SseConnector;
pub use ws::WsConnector;

/// Lifecycle and data events reported by one transport attempt.
#[derive(Debug)]
pub enum TransportEvent {
    /// The transport is open. `outbound` accepts text frames on
    /// bidirectional transports.
    Opened { epoch: u64, outbound: Option<mpsc::Sender<String>> },
    /// One raw inbound payload.
    Frame { epoch: u64, text: String },
    /// The attempt failed or the live transport went away.
    Closed { epoch: u64, reason: String },
}

impl TransportEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Opened { epoch, .. } | Self::Frame { epoch, .. } | Self::Closed { epoch, .. } => {
                *epoch
            }
        }
    }
}

/// Everything a connector needs to run one attempt.
pub struct ConnectRequest {
    pub url: String,
    pub epoch: u64,
    pub events: mpsc::Sender<TransportEvent>,
    pub cancel: CancellationToken,
}

/// Opens transports on behalf of the connection driver.
///
/// `connect` must not block: implementations spawn the I/O and report back
/// through `request.events`. Once `request.cancel` fires the attempt must
/// wind down without emitting further events.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, request: ConnectRequest);
}
