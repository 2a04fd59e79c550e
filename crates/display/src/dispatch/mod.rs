// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns decoded protocol events into a single superseding display state.

pub mod task;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::connection::ConnectionState;
use crate::protocol::{DisplayMessage, MessageKind, PowerReading};
use crate::sound::{SoundSink, ALERT_SOUND};

pub use task::{spawn_dispatch, Feed};

/// Default wattage at which a reading triggers the alert sound.
pub const DEFAULT_ALERT_THRESHOLD_WATTS: f64 = 2000.0;

/// What the display should show right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayContent {
    Power(PowerReading),
    Message(DisplayMessage),
    #[default]
    Idle,
}

/// Merged output of the dispatcher plus both connection indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayState {
    pub content: DisplayContent,
    pub push: ConnectionState,
    pub stream: ConnectionState,
}

/// Handle for one armed expiry. Only the most recently armed ticket is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTicket {
    pub generation: u64,
    pub after: Duration,
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatched {
    /// Observers should be told about the new content.
    pub changed: bool,
    /// Set when the new active message auto-expires.
    pub expiry: Option<ExpiryTicket>,
}

/// Sans-IO dispatcher. The caller owns the clock and calls
/// [`Dispatcher::expire`] when a ticket's delay has elapsed.
pub struct Dispatcher {
    active: Option<DisplayMessage>,
    reading: Option<PowerReading>,
    generation: u64,
    armed: Option<u64>,
    threshold_watts: f64,
    sound: Arc<dyn SoundSink>,
}

impl Dispatcher {
    pub fn new(sound: Arc<dyn SoundSink>) -> Self {
        Self {
            active: None,
            reading: None,
            generation: 0,
            armed: None,
            threshold_watts: DEFAULT_ALERT_THRESHOLD_WATTS,
            sound,
        }
    }

    pub fn with_threshold(mut self, watts: f64) -> Self {
        self.threshold_watts = watts;
        self
    }

    pub fn set_threshold(&mut self, watts: f64) {
        self.threshold_watts = watts;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold_watts
    }

    pub fn active(&self) -> Option<&DisplayMessage> {
        self.active.as_ref()
    }

    pub fn reading(&self) -> Option<&PowerReading> {
        self.reading.as_ref()
    }

    pub fn dispatch(&mut self, message: DisplayMessage) -> Dispatched {
        match message.kind {
            MessageKind::Config => {
                debug!("config message consumed");
                Dispatched::default()
            }
            MessageKind::Clear => {
                self.disarm();
                self.active = None;
                Dispatched { changed: true, expiry: None }
            }
            _ => {
                self.disarm();
                if let Some(sound) = message.audible_sound() {
                    self.sound.play(sound);
                }
                let expiry = message.expires_after().map(|after| self.arm(after));
                debug!(kind = %message.kind, expires = expiry.is_some(), "message active");
                self.active = Some(message);
                Dispatched { changed: true, expiry }
            }
        }
    }

    /// Clear the active message if `ticket` is still the armed one.
    /// Returns whether anything changed.
    pub fn expire(&mut self, ticket: ExpiryTicket) -> bool {
        if self.armed != Some(ticket.generation) {
            return false;
        }
        self.armed = None;
        self.active = None;
        debug!(generation = ticket.generation, "message expired");
        true
    }

    /// Replace the current reading. Returns true when this reading crossed
    /// the alert threshold from below and the alert sound was played.
    pub fn record_reading(&mut self, reading: PowerReading) -> bool {
        let below_before = self.reading.as_ref().is_none_or(|r| r.watts < self.threshold_watts);
        let crossed = below_before && reading.watts >= self.threshold_watts;
        if crossed {
            debug!(watts = reading.watts, threshold = self.threshold_watts, "threshold crossed");
            self.sound.play(ALERT_SOUND);
        }
        self.reading = Some(reading);
        crossed
    }

    /// Current content: the reading wins over any message.
    pub fn current(&self) -> DisplayContent {
        if let Some(reading) = &self.reading {
            DisplayContent::Power(reading.clone())
        } else if let Some(message) = &self.active {
            DisplayContent::Message(message.clone())
        } else {
            DisplayContent::Idle
        }
    }

    fn arm(&mut self, after: Duration) -> ExpiryTicket {
        self.generation += 1;
        self.armed = Some(self.generation);
        ExpiryTicket { generation: self.generation, after }
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
