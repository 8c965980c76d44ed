// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use dm_adapters::{InstallError, ServerError, StoreError};
use dm_core::{PayloadError, TransitionError};
use thiserror::Error;

/// Errors raised while running one command; always captured into its result
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Server(#[from] ServerError),
    #[error("installer error: {0}")]
    Install(#[from] InstallError),
    #[error("invalid transition: {0}")]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },
    #[error("app {0} is no longer tracked")]
    AppMissing(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("superseded by a newer self-update")]
    Superseded,
}

/// Errors that stop the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// A command reported a process-fatal result
    #[error("engine aborted: {0}")]
    Aborted(String),
    #[error("engine is already running")]
    AlreadyRunning,
}
