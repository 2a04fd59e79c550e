// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marquee relay: tracks connected displays and fans operator messages out
//! to all of them.

pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod transport;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::transport::build_router;

/// Bind the configured address and serve until `shutdown` fires.
pub async fn run(config: RelayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    serve(listener, config, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    config: RelayConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = Arc::new(RelayState::new(config, shutdown.clone()));
    tracing::info!(
        heartbeat_ms = state.config.heartbeat_ms,
        "marquee-relay listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
