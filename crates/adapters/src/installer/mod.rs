// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform package installation

mod noop;
mod script;

pub use noop::NoOpInstallAdapter;
pub use script::ScriptInstallAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInstallAdapter, InstallCall};

use async_trait::async_trait;
use dm_core::{CompletionCode, CompletionSink, ReferenceId, Source, Version};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from installer operations
#[derive(Debug, Error)]
pub enum InstallError {
    /// Another action is running; try again later
    #[error("installer busy")]
    Busy,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("failed to start installer: {0}")]
    Spawn(String),
    #[error("install failed: {0}")]
    Failed(String),
}

/// What to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub reference: ReferenceId,
    pub package: String,
    pub source: Source,
    pub version: Option<Version>,
    /// Local package file, for downloaded or local-file sources
    pub file: Option<PathBuf>,
}

/// What to uninstall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallRequest {
    pub reference: ReferenceId,
    pub package: String,
}

/// How a triggered action proceeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triggered {
    /// Running; completion arrives later through the sink
    Started,
    /// Finished synchronously; the sink is not called
    Finished(CompletionCode),
}

/// Adapter for the platform installer
#[async_trait]
pub trait InstallAdapter: Clone + Send + Sync + 'static {
    /// Start installing a package
    async fn install(
        &self,
        request: &InstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError>;

    /// Start uninstalling a package
    async fn uninstall(
        &self,
        request: &UninstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError>;
}
