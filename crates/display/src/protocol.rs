// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared by the display client and the relay.
//!
//! Push frames are flat JSON objects discriminated by `type`; stream events
//! use an internally-tagged enum so unknown event types fail to decode and
//! are dropped by the connection driver.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sound token that explicitly requests silence.
pub const SILENT_SOUND: &str = "none";

/// Discriminant of a [`DisplayMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Alert,
    Clear,
    Config,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Alert => "alert",
            Self::Clear => "clear",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    None,
    Pulse,
    Blink,
    Fade,
}

/// Optional presentation hints attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Animation>,
}

/// A display directive pushed from the relay to every connected display.
///
/// Payload fields are kind-specific: `content` for text, `image_url` for
/// images, `title`/`body` for alerts. A `duration_ms` of zero (or absent)
/// means the message stays until superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl DisplayMessage {
    fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            content: None,
            image_url: None,
            title: None,
            body: None,
            style: None,
            sound: None,
            duration_ms: None,
            priority: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::empty(MessageKind::Text) }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self { image_url: Some(url.into()), ..Self::empty(MessageKind::Image) }
    }

    pub fn alert(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::empty(MessageKind::Alert)
        }
    }

    pub fn clear() -> Self {
        Self::empty(MessageKind::Clear)
    }

    pub fn config() -> Self {
        Self::empty(MessageKind::Config)
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// How long the message stays active, or `None` when it is permanent.
    pub fn expires_after(&self) -> Option<Duration> {
        match self.duration_ms {
            Some(ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => None,
        }
    }

    /// Sound to play on activation. Empty tokens and `none` are silent.
    pub fn audible_sound(&self) -> Option<&str> {
        self.sound.as_deref().filter(|s| !s.is_empty() && *s != SILENT_SOUND)
    }
}

/// One instantaneous power sample from the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerReading {
    /// RFC3339 timestamp of the sample.
    pub timestamp: String,
    pub watts: f64,
    pub appliance_id: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_host: Option<String>,
}

/// Events carried by the unidirectional stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "power.reading")]
    PowerReading(PowerReading),
}

/// Client-to-relay identification and status frames.
///
/// These are consumed by the relay and never fanned out to other displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Hello {
        client: String,
    },
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

impl ClientFrame {
    pub fn hello(client: impl Into<String>) -> Self {
        Self::Hello { client: client.into() }
    }

    /// The wire `type` of every identification frame.
    pub const TYPES: [&'static str; 2] = ["hello", "status"];
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
