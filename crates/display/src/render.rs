// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-line textual rendering of the display state.

use crate::dispatch::{DisplayContent, DisplayState};
use crate::protocol::{DisplayMessage, MessageKind};

pub fn summary(state: &DisplayState) -> String {
    let body = match &state.content {
        DisplayContent::Idle => "idle".to_owned(),
        DisplayContent::Power(reading) => {
            format!("power {} {:.0}W", reading.nickname, reading.watts)
        }
        DisplayContent::Message(message) => message_line(message),
    };
    format!("{body} [push={} stream={}]", state.push, state.stream)
}

fn message_line(message: &DisplayMessage) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    match message.kind {
        MessageKind::Text => format!("text {:?}", field(&message.content)),
        MessageKind::Image => format!("image {}", field(&message.image_url)),
        MessageKind::Alert => {
            format!("alert {:?}: {:?}", field(&message.title), field(&message.body))
        }
        MessageKind::Clear | MessageKind::Config => message.kind.to_string(),
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
