// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect delay policies.

use std::time::Duration;

/// How long to wait before the next reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryPolicy {
    /// `min(base * growth^attempt, cap)`, giving up after `max_attempts`.
    Exponential { base: Duration, growth: f64, cap: Duration, max_attempts: u32 },
    /// Same delay forever.
    Fixed { delay: Duration },
}

impl RetryPolicy {
    /// Policy for the push WebSocket: 1s growing by 1.5x up to 30s, 20 attempts.
    pub fn bidirectional() -> Self {
        Self::Exponential {
            base: Duration::from_millis(1000),
            growth: 1.5,
            cap: Duration::from_millis(30_000),
            max_attempts: 20,
        }
    }

    /// Policy for the event stream: a supervisory kick every 5s.
    pub fn unidirectional() -> Self {
        Self::Fixed { delay: Duration::from_millis(5000) }
    }

    /// Delay before retry number `attempt` (zero-based), or `None` once the
    /// attempt budget is spent.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Self::Exponential { base, growth, cap, max_attempts } => {
                if attempt >= max_attempts {
                    return None;
                }
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let ms = base.as_millis() as f64 * growth.powi(exponent);
                let capped = ms.min(cap.as_millis() as f64);
                Some(Duration::from_millis(capped as u64))
            }
            Self::Fixed { delay } => Some(delay),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
