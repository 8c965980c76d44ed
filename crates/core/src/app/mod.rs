// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed app entity and its lifecycle state machine

mod entity;
mod lifecycle;
mod source;

pub use entity::{App, Timestamps};
pub use lifecycle::{Category, Lifecycle, Outcome, Phase, Progress, Step, TransitionError};
pub use source::{source_equals, version_differs, InstallType, Source, Version};
