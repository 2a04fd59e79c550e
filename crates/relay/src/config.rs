// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Broadcast relay for marquee displays.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "marquee-relay", version, about)]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "MARQUEE_RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "MARQUEE_RELAY_PORT")]
    pub port: u16,

    /// Interval between liveness pings to each display, in milliseconds.
    #[arg(long, default_value_t = 30000, env = "MARQUEE_RELAY_HEARTBEAT_MS")]
    pub heartbeat_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "MARQUEE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json).
    #[arg(long, default_value = "text", env = "MARQUEE_LOG_FORMAT")]
    pub log_format: String,
}

impl RelayConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms.max(1))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            heartbeat_ms: 30000,
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
        }
    }
}
