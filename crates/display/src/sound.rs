// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Token played when a power reading crosses the alert threshold.
pub const ALERT_SOUND: &str = "alert";

/// Audio output port. Playback is fire-and-forget.
pub trait SoundSink: Send + Sync {
    fn play(&self, sound: &str);
}

/// Logs sound tokens instead of playing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSound;

impl SoundSink for TracingSound {
    fn play(&self, sound: &str) {
        tracing::info!(sound, "play sound");
    }
}
