// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-healing connection: a sans-IO [`machine::ConnectionMachine`] driven
//! by a tokio actor that owns the transport, the retry timer and the
//! observer list.

pub mod machine;
pub mod observer;
pub mod retry;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::protocol::ClientFrame;
use crate::transport::{ConnectRequest, Connector, TransportEvent};

use self::machine::{Action, ConnectionMachine, Input};
use self::observer::Observers;
pub use self::retry::RetryPolicy;

/// Observable state of one transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered to connection observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent<M> {
    State(ConnectionState),
    Message(M),
}

/// Static settings for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Short transport label used in logs (`push`, `stream`).
    pub label: &'static str,
    pub policy: RetryPolicy,
    /// Client name announced in a hello frame after every successful open.
    /// `None` for unidirectional transports.
    pub hello: Option<String>,
}

impl ConnectionOptions {
    pub fn bidirectional(client: impl Into<String>) -> Self {
        Self { label: "push", policy: RetryPolicy::bidirectional(), hello: Some(client.into()) }
    }

    pub fn unidirectional() -> Self {
        Self { label: "stream", policy: RetryPolicy::unidirectional(), hello: None }
    }
}

enum Command<M> {
    Start,
    Stop,
    SetEndpoint(Option<String>),
    Visibility(bool),
    Subscribe { capacity: usize, reply: oneshot::Sender<mpsc::Receiver<ConnectionEvent<M>>> },
    Shutdown,
}

/// Cheap, clonable control surface of a running connection.
pub struct ConnectionHandle<M> {
    commands: mpsc::Sender<Command<M>>,
    state: watch::Receiver<ConnectionState>,
}

impl<M> Clone for ConnectionHandle<M> {
    fn clone(&self) -> Self {
        Self { commands: self.commands.clone(), state: self.state.clone() }
    }
}

impl<M: Send + 'static> ConnectionHandle<M> {
    /// Mark the connection as desired and open it if it is not already.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.send(Command::Start).await
    }

    /// Clear the desired flag, cancel any retry and close the transport.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(Command::Stop).await
    }

    /// Replace the endpoint. `None` or an empty URL disarms the connection.
    pub async fn set_endpoint(&self, url: Option<String>) -> anyhow::Result<()> {
        self.send(Command::SetEndpoint(url)).await
    }

    /// Report host visibility. A hidden-to-visible edge reconnects at once.
    pub async fn visibility_changed(&self, visible: bool) -> anyhow::Result<()> {
        self.send(Command::Visibility(visible)).await
    }

    /// Register an observer with a bounded queue of `capacity` events.
    pub async fn subscribe(
        &self,
        capacity: usize,
    ) -> anyhow::Result<mpsc::Receiver<ConnectionEvent<M>>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { capacity, reply }).await?;
        rx.await.map_err(|_| anyhow::anyhow!("connection task stopped"))
    }

    /// Stop and end the driver task.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(Command::Shutdown).await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel mirroring the connection state.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    async fn send(&self, command: Command<M>) -> anyhow::Result<()> {
        self.commands.send(command).await.map_err(|_| anyhow::anyhow!("connection task stopped"))
    }
}

/// The driver actor. Owns the machine and performs its actions.
pub struct Connection<M> {
    label: &'static str,
    hello: Option<String>,
    machine: ConnectionMachine,
    connector: Arc<dyn Connector>,
    commands: mpsc::Receiver<Command<M>>,
    events_tx: mpsc::Sender<TransportEvent>,
    events_rx: mpsc::Receiver<TransportEvent>,
    transport: Option<CancellationToken>,
    outbound: Option<mpsc::Sender<String>>,
    retry: Option<(Instant, u64)>,
    observers: Observers<M>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<M> Connection<M>
where
    M: DeserializeOwned + Clone + Send + 'static,
{
    /// Spawn a driver task. The connection starts disarmed; call
    /// [`ConnectionHandle::start`] to connect.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        options: ConnectionOptions,
        endpoint: Option<String>,
    ) -> ConnectionHandle<M> {
        let (commands_tx, commands) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::channel(256);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = Self {
            label: options.label,
            machine: ConnectionMachine::new(options.policy, options.hello.is_some(), endpoint),
            hello: options.hello,
            connector,
            commands,
            events_tx,
            events_rx,
            transport: None,
            outbound: None,
            retry: None,
            observers: Observers::new(options.label),
            state_tx,
        };
        tokio::spawn(driver.run());

        ConnectionHandle { commands: commands_tx, state: state_rx }
    }

    async fn run(mut self) {
        loop {
            let retry_at = self.retry.map(|(at, _)| at);
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.events_rx.recv() => self.handle_transport(event),
                _ = sleep_until(retry_at) => {
                    if let Some((_, generation)) = self.retry.take() {
                        self.apply(Input::RetryElapsed { generation });
                    }
                }
            }
        }
        self.apply(Input::Stop);
        debug!(transport = self.label, "connection driver stopped");
    }

    fn handle_command(&mut self, command: Command<M>) {
        match command {
            Command::Start => self.apply(Input::Start),
            Command::Stop => self.apply(Input::Stop),
            Command::SetEndpoint(url) => self.apply(Input::SetEndpoint(url)),
            Command::Visibility(visible) => self.apply(Input::Visibility { visible }),
            Command::Subscribe { capacity, reply } => {
                let rx = self.observers.register(capacity, self.machine.state());
                let _ = reply.send(rx);
            }
            Command::Shutdown => {}
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        if !self.machine.accepts(event.epoch()) {
            debug!(transport = self.label, epoch = event.epoch(), "ignoring stale transport event");
            return;
        }
        match event {
            TransportEvent::Opened { epoch, outbound } => {
                self.outbound = outbound;
                self.apply(Input::Opened { epoch });
            }
            TransportEvent::Frame { text, .. } => {
                if self.machine.state() != ConnectionState::Connected {
                    return;
                }
                match serde_json::from_str::<M>(&text) {
                    Ok(message) => self.observers.notify(ConnectionEvent::Message(message)),
                    Err(e) => {
                        debug!(transport = self.label, err = %e, "dropping malformed payload");
                    }
                }
            }
            TransportEvent::Closed { epoch, reason } => {
                debug!(transport = self.label, epoch, reason = %reason, "transport closed");
                self.transport = None;
                self.outbound = None;
                self.apply(Input::Closed { epoch });
            }
        }
    }

    fn apply(&mut self, input: Input) {
        for action in self.machine.handle(input) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Open { url, epoch } => {
                let cancel = CancellationToken::new();
                if let Some(previous) = self.transport.replace(cancel.clone()) {
                    previous.cancel();
                }
                debug!(transport = self.label, url = %url, epoch, "opening transport");
                self.connector.connect(ConnectRequest {
                    url,
                    epoch,
                    events: self.events_tx.clone(),
                    cancel,
                });
            }
            Action::Close => {
                if let Some(cancel) = self.transport.take() {
                    cancel.cancel();
                }
                self.outbound = None;
            }
            Action::ScheduleRetry { delay, generation } => {
                debug!(
                    transport = self.label,
                    delay_ms = delay.as_millis() as u64,
                    attempt = self.machine.attempt(),
                    "scheduling reconnect"
                );
                self.retry = Some((Instant::now() + delay, generation));
            }
            Action::CancelRetry => self.retry = None,
            Action::SendHello => self.send_hello(),
            Action::Notify(state) => {
                info!(transport = self.label, state = %state, "connection state changed");
                self.state_tx.send_replace(state);
                self.observers.notify(ConnectionEvent::State(state));
            }
        }
    }

    fn send_hello(&self) {
        let (Some(outbound), Some(client)) = (&self.outbound, &self.hello) else {
            return;
        };
        match serde_json::to_string(&ClientFrame::hello(client.clone())) {
            Ok(text) => {
                if outbound.try_send(text).is_err() {
                    debug!(transport = self.label, "hello not sent, transport is gone");
                }
            }
            Err(e) => debug!(transport = self.label, err = %e, "failed to encode hello"),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
