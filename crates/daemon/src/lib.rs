// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dm-daemon: the `dmd` process
//!
//! Loads configuration, owns the PID lock and the app store, runs the engine,
//! and serves local requests over a Unix socket.

pub mod adapters;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use client::{ClientError, DaemonClient};
pub use config::{default_config_path, ConfigError, DaemonConfig, Paths};
pub use lifecycle::{startup, DaemonState, LifecycleError};
pub use protocol::{Request, Response};
