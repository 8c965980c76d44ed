// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op server adapter for running without a management server.

use super::{DeviceIdentity, Release, ServerAdapter, ServerError};
use async_trait::async_trait;
use dm_core::ResultEntry;
use std::path::{Path, PathBuf};

/// Server adapter that accepts everything and never has work.
///
/// Used when no server URL is configured; commands then arrive only over
/// the local socket.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpServerAdapter;

impl NoOpServerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerAdapter for NoOpServerAdapter {
    async fn enroll(&self, _device: &DeviceIdentity) -> Result<(), ServerError> {
        Ok(())
    }

    async fn fetch_pending_commands(
        &self,
        _device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError> {
        Ok(Vec::new())
    }

    async fn submit_results(
        &self,
        _device_id: &str,
        _entries: &[ResultEntry],
    ) -> Result<(), ServerError> {
        Ok(())
    }

    async fn latest_release(&self) -> Result<Option<Release>, ServerError> {
        Ok(None)
    }

    async fn fetch_package(&self, _url: &str, _dest_dir: &Path) -> Result<PathBuf, ServerError> {
        Err(ServerError::Unavailable)
    }
}
