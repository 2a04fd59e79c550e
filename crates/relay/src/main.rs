// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use marquee::logging::init_tracing;
use marquee_relay::config::RelayConfig;

#[tokio::main]
async fn main() {
    let config = RelayConfig::parse();
    init_tracing(&config.log_level, &config.log_format);

    let shutdown = CancellationToken::new();
    {
        let sd = shutdown.clone();
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                _ = async {
                    if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
                } => info!("received SIGTERM"),
            }
            sd.cancel();
        });
    }

    if let Err(e) = marquee_relay::run(config, shutdown).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
