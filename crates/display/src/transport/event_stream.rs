// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental `text/event-stream` decoder.
//!
//! Chunks from the response body are buffered and split on line endings
//! (`\n` or `\r\n`). Consecutive `data` lines are joined with `\n` and the
//! event is dispatched on the blank line that terminates it. Comment lines
//! (`:` prefix) are keep-alives and never produce an event. A line longer
//! than [`MAX_LINE`] is discarded up to its terminating newline, together
//! with the event it belongs to.

use bytes::BytesMut;
use tracing::debug;

/// Longest line kept while waiting for its newline.
pub const MAX_LINE: usize = 64 * 1024;

/// One dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Last event id in effect when the event was dispatched.
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
    last_id: Option<String>,
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let Ok(line) = std::str::from_utf8(&line) else {
                continue;
            };
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        if self.buffer.len() > MAX_LINE {
            debug!(pending = self.buffer.len(), "event-stream line too long, discarding");
            self.buffer.clear();
            self.data.clear();
            self.discarding = true;
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_owned()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            // `event` and `retry` are ignored; reconnect timing belongs to
            // the connection's retry policy.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseEvent { id: self.last_id.clone(), data })
    }
}

#[cfg(test)]
#[path = "event_stream_tests.rs"]
mod tests;
