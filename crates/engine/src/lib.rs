// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Device management command engine
//!
//! Commands arrive from the server (via sync) or local clients, are queued,
//! and are processed by a single controller loop. Installs and uninstalls run
//! on a background handler that waits for the installer's completion.

mod background;
mod command;
mod config;
mod context;
mod controller;
mod engine;
mod error;
mod events;
mod maintenance;
mod queue;
mod reporter;

#[cfg(test)]
mod test_support;

pub use background::HandlerState;
pub use command::{Command, CommandKindTag, TaskMode};
pub use config::EngineConfig;
pub use context::EngineDeps;
pub use engine::{Engine, EngineStatus};
pub use error::{CommandError, EngineError};
