// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::installer::{InstallAdapter, InstallError, InstallRequest, Triggered, UninstallRequest};
use crate::server::{DeviceIdentity, Release, ServerAdapter, ServerError};
use async_trait::async_trait;
use dm_core::{CompletionSink, ResultEntry};
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Wrapper that adds tracing to any ServerAdapter
#[derive(Clone)]
pub struct TracedServerAdapter<S> {
    inner: S,
}

impl<S> TracedServerAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ServerAdapter> ServerAdapter for TracedServerAdapter<S> {
    async fn enroll(&self, device: &DeviceIdentity) -> Result<(), ServerError> {
        let span = tracing::info_span!("server.enroll", device_id = %device.device_id);
        async {
            tracing::info!(agent_version = %device.agent_version, "starting");
            let start = std::time::Instant::now();
            let result = self.inner.enroll(device).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "enrolled"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "enroll failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn fetch_pending_commands(
        &self,
        device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError> {
        let span = tracing::info_span!("server.fetch_commands", device_id);
        async {
            let result = self.inner.fetch_pending_commands(device_id).await;
            match &result {
                Ok(commands) => tracing::debug!(count = commands.len(), "fetched"),
                Err(e) => tracing::warn!(error = %e, "fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn submit_results(
        &self,
        device_id: &str,
        entries: &[ResultEntry],
    ) -> Result<(), ServerError> {
        let span = tracing::info_span!("server.submit_results", device_id, count = entries.len());
        async {
            let start = std::time::Instant::now();
            let result = self.inner.submit_results(device_id, entries).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "submitted"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "submit failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn latest_release(&self) -> Result<Option<Release>, ServerError> {
        let result = self.inner.latest_release().await;
        tracing::debug!(
            version = ?result.as_ref().ok().and_then(|r| r.as_ref()).map(|r| r.version.code),
            "checked latest release"
        );
        result
    }

    async fn fetch_package(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ServerError> {
        let span = tracing::info_span!("server.fetch_package", url);
        async {
            tracing::info!(dest = %dest_dir.display(), "downloading");
            let start = std::time::Instant::now();
            let result = self.inner.fetch_package(url, dest_dir).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(path) => tracing::info!(elapsed_ms, path = %path.display(), "downloaded"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "download failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any InstallAdapter
#[derive(Clone)]
pub struct TracedInstallAdapter<I> {
    inner: I,
}

impl<I> TracedInstallAdapter<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I: InstallAdapter> InstallAdapter for TracedInstallAdapter<I> {
    async fn install(
        &self,
        request: &InstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        let span = tracing::info_span!(
            "installer.install",
            package = %request.package,
            reference = %request.reference,
        );
        async {
            tracing::info!(source = %request.source, "starting");

            // Precondition: a local package file must exist
            if let Some(file) = &request.file {
                if !file.exists() {
                    tracing::error!(file = %file.display(), "package file does not exist");
                    return Err(InstallError::Failed(format!(
                        "package file does not exist: {}",
                        file.display()
                    )));
                }
            }

            let result = self.inner.install(request, sink).await;
            log_triggered(&result);
            result
        }
        .instrument(span)
        .await
    }

    async fn uninstall(
        &self,
        request: &UninstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        let span = tracing::info_span!(
            "installer.uninstall",
            package = %request.package,
            reference = %request.reference,
        );
        async {
            tracing::info!("starting");
            let result = self.inner.uninstall(request, sink).await;
            log_triggered(&result);
            result
        }
        .instrument(span)
        .await
    }
}

fn log_triggered(result: &Result<Triggered, InstallError>) {
    match result {
        Ok(Triggered::Started) => tracing::info!("started, awaiting completion"),
        Ok(Triggered::Finished(code)) => tracing::info!(%code, "finished"),
        // busy is retried next cycle
        Err(InstallError::Busy) => tracing::debug!("installer busy"),
        Err(e) => tracing::error!(error = %e, "failed to start"),
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
