// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::registry::ClientRegistry;

/// Shared relay state.
pub struct RelayState {
    pub registry: Arc<ClientRegistry>,
    pub config: RelayConfig,
    pub started_at: Instant,
    pub shutdown: CancellationToken,
}

impl RelayState {
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new()),
            config,
            started_at: Instant::now(),
            shutdown,
        }
    }
}
