// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring for a running display: both connections, the dispatch loop and
//! the renderer.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ClientConfig, ConfigCommand, RunArgs};
use crate::connection::{Connection, ConnectionHandle, ConnectionOptions};
use crate::dispatch::{spawn_dispatch, DisplayState, Dispatcher, Feed};
use crate::protocol::{DisplayMessage, StreamEvent};
use crate::render;
use crate::sound::{SoundSink, TracingSound};
use crate::store::{load_or_default, ConfigStore};
use crate::transport::{Connector, SseConnector, WsConnector};

/// Observer queue depth between each connection and the dispatcher.
const OBSERVER_CAPACITY: usize = 256;

/// External collaborators of a display.
pub struct Ports {
    pub push: Arc<dyn Connector>,
    pub stream: Arc<dyn Connector>,
    pub sound: Arc<dyn SoundSink>,
}

impl Ports {
    /// WebSocket push, SSE stream, logged sounds.
    pub fn live() -> anyhow::Result<Self> {
        Ok(Self {
            push: Arc::new(WsConnector),
            stream: Arc::new(SseConnector::new()?),
            sound: Arc::new(TracingSound),
        })
    }
}

/// A started display.
pub struct Display {
    pub push: ConnectionHandle<DisplayMessage>,
    pub stream: ConnectionHandle<StreamEvent>,
    pub state: watch::Receiver<DisplayState>,
    shutdown: CancellationToken,
    dispatch: JoinHandle<()>,
}

impl Display {
    /// Forward a host visibility change to both connections.
    pub async fn visibility_changed(&self, visible: bool) -> anyhow::Result<()> {
        self.push.visibility_changed(visible).await?;
        self.stream.visibility_changed(visible).await?;
        Ok(())
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.push.shutdown().await?;
        self.stream.shutdown().await?;
        self.shutdown.cancel();
        self.dispatch.await?;
        Ok(())
    }
}

/// Start both connections and the dispatcher for `config`.
pub async fn start_display(
    config: &ClientConfig,
    client_name: &str,
    ports: Ports,
) -> anyhow::Result<Display> {
    let push = Connection::<DisplayMessage>::spawn(
        ports.push,
        ConnectionOptions::bidirectional(client_name),
        config.ws_endpoint(),
    );
    let stream = Connection::<StreamEvent>::spawn(
        ports.stream,
        ConnectionOptions::unidirectional(),
        config.sse_endpoint(),
    );

    let push_feed = Feed::subscribe(&push, OBSERVER_CAPACITY).await?;
    let stream_feed = Feed::subscribe(&stream, OBSERVER_CAPACITY).await?;

    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(ports.sound).with_threshold(config.alert_threshold_watts);
    let (state, dispatch) = spawn_dispatch(dispatcher, push_feed, stream_feed, shutdown.clone());

    push.start().await?;
    stream.start().await?;
    info!(
        client = client_name,
        ws_url = %config.ws_url,
        sse_url = %config.sse_url,
        brightness = ?config.brightness_mode,
        "display started"
    );

    Ok(Display { push, stream, state, shutdown, dispatch })
}

/// `marquee run`: render until SIGINT/SIGTERM. SIGCONT counts as the display
/// becoming visible again after a suspension.
pub async fn run(store: &dyn ConfigStore, args: &RunArgs) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let config = load_or_default(store).with_overrides(args);
    if config.ws_endpoint().is_none() && config.sse_endpoint().is_none() {
        tracing::warn!("no endpoints configured; set them with `marquee config set`");
    }

    let display = start_display(&config, &args.client_name, Ports::live()?).await?;
    let mut state = display.state.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigcont = signal(SignalKind::from_raw(nix::sys::signal::Signal::SIGCONT as i32))?;

    info!("{}", render::summary(&state.borrow_and_update()));
    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                break;
            }
            _ = sigcont.recv() => {
                info!("resumed; reconnecting idle transports");
                display.visibility_changed(false).await?;
                display.visibility_changed(true).await?;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("{}", render::summary(&state.borrow_and_update()));
            }
        }
    }

    display.shutdown().await
}

/// `marquee config ...`. Returns the text to print.
pub fn config_command(store: &dyn ConfigStore, command: &ConfigCommand) -> anyhow::Result<String> {
    let mut config = load_or_default(store);
    if let ConfigCommand::Set(args) = command {
        if config.apply(args) {
            store.save(&config)?;
            info!("display config updated");
        }
    }
    Ok(serde_json::to_string_pretty(&config)?)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
