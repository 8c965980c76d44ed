// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op installer for dry runs.

use super::{InstallAdapter, InstallError, InstallRequest, Triggered, UninstallRequest};
use async_trait::async_trait;
use dm_core::{CompletionCode, CompletionSink};

/// Installer that reports every action as finished without doing anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpInstallAdapter;

impl NoOpInstallAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstallAdapter for NoOpInstallAdapter {
    async fn install(
        &self,
        _request: &InstallRequest,
        _sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        Ok(Triggered::Finished(CompletionCode::Success))
    }

    async fn uninstall(
        &self,
        _request: &UninstallRequest,
        _sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        Ok(Triggered::Finished(CompletionCode::Success))
    }
}
