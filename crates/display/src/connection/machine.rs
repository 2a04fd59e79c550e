// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sans-IO reconnect state machine.
//!
//! The machine never touches sockets or clocks. Callers feed it [`Input`]s
//! and carry out the returned [`Action`]s. Every transport attempt is tagged
//! with an epoch and every armed retry with a generation, so events that
//! belong to a torn-down attempt or a cancelled timer are ignored.

use std::time::Duration;

use tracing::warn;

use super::retry::RetryPolicy;
use super::ConnectionState;

/// Something that happened to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Stop,
    SetEndpoint(Option<String>),
    Opened { epoch: u64 },
    Closed { epoch: u64 },
    RetryElapsed { generation: u64 },
    Visibility { visible: bool },
}

/// Side effect requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a new transport to `url`, tagging its events with `epoch`.
    Open { url: String, epoch: u64 },
    /// Tear down the live transport.
    Close,
    /// Feed back `RetryElapsed { generation }` after `delay`.
    ScheduleRetry { delay: Duration, generation: u64 },
    /// Drop the pending retry timer.
    CancelRetry,
    /// Send the identification frame on the live transport.
    SendHello,
    /// Tell observers about a state change.
    Notify(ConnectionState),
}

#[derive(Debug)]
pub struct ConnectionMachine {
    policy: RetryPolicy,
    hello: bool,
    endpoint: Option<String>,
    desired: bool,
    state: ConnectionState,
    attempt: u32,
    epoch: u64,
    live_epoch: Option<u64>,
    generation: u64,
    pending_retry: Option<u64>,
    visible: bool,
}

impl ConnectionMachine {
    /// `hello` selects whether a successful open emits [`Action::SendHello`].
    pub fn new(policy: RetryPolicy, hello: bool, endpoint: Option<String>) -> Self {
        Self {
            policy,
            hello,
            endpoint: normalize(endpoint),
            desired: false,
            state: ConnectionState::Disconnected,
            attempt: 0,
            epoch: 0,
            live_epoch: None,
            generation: 0,
            pending_retry: None,
            visible: true,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn desired(&self) -> bool {
        self.desired
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Retries spent since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn retry_pending(&self) -> bool {
        self.pending_retry.is_some()
    }

    /// Whether transport events tagged `epoch` belong to the live attempt.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.live_epoch == Some(epoch)
    }

    pub fn handle(&mut self, input: Input) -> Vec<Action> {
        let mut actions = Vec::new();
        match input {
            Input::Start => self.start(&mut actions),
            Input::Stop => self.stop(&mut actions),
            Input::SetEndpoint(url) => self.set_endpoint(url, &mut actions),
            Input::Opened { epoch } => self.opened(epoch, &mut actions),
            Input::Closed { epoch } => self.closed(epoch, &mut actions),
            Input::RetryElapsed { generation } => self.retry_elapsed(generation, &mut actions),
            Input::Visibility { visible } => self.visibility(visible, &mut actions),
        }
        actions
    }

    fn start(&mut self, actions: &mut Vec<Action>) {
        self.desired = true;
        // An explicit start restores the full retry budget.
        self.attempt = 0;
        if self.state == ConnectionState::Disconnected {
            self.cancel_retry(actions);
            self.open(actions);
        }
    }

    fn stop(&mut self, actions: &mut Vec<Action>) {
        self.desired = false;
        self.teardown(actions);
    }

    fn set_endpoint(&mut self, url: Option<String>, actions: &mut Vec<Action>) {
        let url = normalize(url);
        if url == self.endpoint {
            return;
        }
        self.endpoint = url;
        self.teardown(actions);
        if self.desired {
            self.attempt = 0;
            self.open(actions);
        }
    }

    fn opened(&mut self, epoch: u64, actions: &mut Vec<Action>) {
        if !self.accepts(epoch) || self.state != ConnectionState::Connecting {
            return;
        }
        self.attempt = 0;
        self.transition(ConnectionState::Connected, actions);
        if self.hello {
            actions.push(Action::SendHello);
        }
    }

    fn closed(&mut self, epoch: u64, actions: &mut Vec<Action>) {
        if !self.accepts(epoch) {
            return;
        }
        self.live_epoch = None;
        self.transition(ConnectionState::Disconnected, actions);
        if self.desired {
            self.schedule_retry(actions);
        }
    }

    fn retry_elapsed(&mut self, generation: u64, actions: &mut Vec<Action>) {
        if self.pending_retry != Some(generation) {
            return;
        }
        self.pending_retry = None;
        if self.desired && self.state == ConnectionState::Disconnected {
            self.open(actions);
        }
    }

    fn visibility(&mut self, visible: bool, actions: &mut Vec<Action>) {
        let resumed = visible && !self.visible;
        self.visible = visible;
        if resumed && self.desired && self.state == ConnectionState::Disconnected {
            self.cancel_retry(actions);
            self.open(actions);
        }
    }

    fn open(&mut self, actions: &mut Vec<Action>) {
        let Some(url) = self.endpoint.clone() else {
            return;
        };
        self.epoch += 1;
        self.live_epoch = Some(self.epoch);
        actions.push(Action::Open { url, epoch: self.epoch });
        self.transition(ConnectionState::Connecting, actions);
    }

    fn teardown(&mut self, actions: &mut Vec<Action>) {
        self.cancel_retry(actions);
        if self.live_epoch.take().is_some() {
            actions.push(Action::Close);
        }
        self.transition(ConnectionState::Disconnected, actions);
    }

    fn schedule_retry(&mut self, actions: &mut Vec<Action>) {
        match self.policy.delay(self.attempt) {
            Some(delay) => {
                self.attempt += 1;
                self.generation += 1;
                self.pending_retry = Some(self.generation);
                actions.push(Action::ScheduleRetry { delay, generation: self.generation });
            }
            None => {
                warn!(
                    attempts = self.attempt,
                    endpoint = self.endpoint.as_deref().unwrap_or_default(),
                    "retry budget exhausted; waiting for an explicit start"
                );
            }
        }
    }

    fn cancel_retry(&mut self, actions: &mut Vec<Action>) {
        if self.pending_retry.take().is_some() {
            actions.push(Action::CancelRetry);
        }
    }

    fn transition(&mut self, next: ConnectionState, actions: &mut Vec<Action>) {
        if self.state != next {
            self.state = next;
            actions.push(Action::Notify(next));
        }
    }
}

fn normalize(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_owned()).filter(|u| !u.is_empty())
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
