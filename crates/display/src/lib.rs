// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marquee display client: self-healing push and stream connections feeding
//! a superseding message dispatcher.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod logging;
pub mod protocol;
pub mod render;
pub mod run;
pub mod sound;
pub mod store;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
