// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::DEFAULT_ALERT_THRESHOLD_WATTS;

/// Display client for the marquee relay.
#[derive(Debug, clap::Parser)]
#[command(name = "marquee", version, about)]
pub struct Cli {
    /// Directory holding the persisted display configuration.
    #[arg(long, global = true, env = "MARQUEE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "MARQUEE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json).
    #[arg(long, global = true, env = "MARQUEE_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Connect to the relay and event stream and render until interrupted.
    Run(RunArgs),
    /// Inspect or change the stored configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Push endpoint override (ws:// or wss://).
    #[arg(long, env = "MARQUEE_WS_URL")]
    pub ws_url: Option<String>,

    /// Event stream endpoint override.
    #[arg(long, env = "MARQUEE_SSE_URL")]
    pub sse_url: Option<String>,

    /// Name announced to the relay on every connect.
    #[arg(long, env = "MARQUEE_CLIENT_NAME", default_value = "display")]
    pub client_name: String,
}

#[derive(Debug, clap::Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,
    /// Update fields of the stored configuration.
    Set(SetArgs),
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct SetArgs {
    #[arg(long)]
    pub ws_url: Option<String>,

    #[arg(long)]
    pub sse_url: Option<String>,

    #[arg(long, value_enum)]
    pub brightness: Option<BrightnessMode>,

    /// Alert threshold in watts.
    #[arg(long)]
    pub threshold: Option<f64>,
}

impl Cli {
    /// Explicit `--config-dir`, else `$HOME/.config/marquee`.
    pub fn config_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.config_dir {
            return Ok(dir.clone());
        }
        let home = std::env::var_os("HOME")
            .ok_or_else(|| anyhow::anyhow!("HOME is not set; pass --config-dir"))?;
        Ok(PathBuf::from(home).join(".config").join("marquee"))
    }
}

/// Display-mode preference consumed by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrightnessMode {
    #[default]
    Auto,
    Light,
    Dark,
}

/// The persisted client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub ws_url: String,
    pub sse_url: String,
    pub brightness_mode: BrightnessMode,
    pub alert_threshold_watts: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: String::new(),
            sse_url: String::new(),
            brightness_mode: BrightnessMode::Auto,
            alert_threshold_watts: DEFAULT_ALERT_THRESHOLD_WATTS,
        }
    }
}

impl ClientConfig {
    pub fn ws_endpoint(&self) -> Option<String> {
        non_empty(&self.ws_url)
    }

    pub fn sse_endpoint(&self) -> Option<String> {
        non_empty(&self.sse_url)
    }

    /// Apply `run` overrides for this process only.
    pub fn with_overrides(mut self, args: &RunArgs) -> Self {
        if let Some(url) = &args.ws_url {
            self.ws_url = url.trim().to_owned();
        }
        if let Some(url) = &args.sse_url {
            self.sse_url = url.trim().to_owned();
        }
        self
    }

    /// Apply `config set` fields. Returns whether anything changed.
    pub fn apply(&mut self, args: &SetArgs) -> bool {
        let before = self.clone();
        if let Some(url) = &args.ws_url {
            self.ws_url = url.trim().to_owned();
        }
        if let Some(url) = &args.sse_url {
            self.sse_url = url.trim().to_owned();
        }
        if let Some(mode) = args.brightness {
            self.brightness_mode = mode;
        }
        if let Some(watts) = args.threshold {
            self.alert_threshold_watts = watts;
        }
        *self != before
    }
}

fn non_empty(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_owned())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
