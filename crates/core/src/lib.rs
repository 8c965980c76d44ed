// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dm-core: pure types for the device action agent
//!
//! This crate provides:
//! - The per-app lifecycle state machine and the App entity
//! - Inbound command payloads, command results and upstream result entries
//! - Audit events, WAL operations and completion signals
//! - A clock abstraction for deterministic tests

pub mod app;
pub mod clock;
pub mod command;
pub mod completion;
pub mod event;
pub mod id;
pub mod operation;

pub use app::{
    App, Category, InstallType, Lifecycle, Outcome, Phase, Progress, Source, Step, Timestamps,
    TransitionError, Version,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{CommandPayload, CommandResult, PayloadError, ResultEntry, ResultStatus, Signal};
pub use completion::{CompletionCode, CompletionSink};
pub use event::{Event, EventType};
pub use id::{AppId, ReferenceId};
pub use operation::Operation;
