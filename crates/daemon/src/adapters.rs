// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production adapters selected from the configuration

use crate::config::DaemonConfig;
use async_trait::async_trait;
use dm_adapters::{
    DeviceIdentity, HttpServerAdapter, InstallAdapter, InstallError, InstallRequest,
    NoOpInstallAdapter, NoOpServerAdapter, Release, ScriptInstallAdapter, ServerAdapter,
    ServerError, TracedInstallAdapter, TracedServerAdapter, Triggered, UninstallRequest,
};
use dm_core::{CompletionSink, ResultEntry, SystemClock};
use dm_engine::Engine;
use dm_storage::WalAppStore;
use std::path::{Path, PathBuf};

/// Engine with the daemon's concrete adapter types
pub type DaemonEngine = Engine<WalAppStore, DaemonServer, DaemonInstaller, SystemClock>;

/// The platform installer, or a dry run that touches nothing
#[derive(Clone)]
pub enum DaemonInstaller {
    Script(TracedInstallAdapter<ScriptInstallAdapter>),
    DryRun(TracedInstallAdapter<NoOpInstallAdapter>),
}

/// The management server, or none when no URL is configured
#[derive(Clone)]
pub enum DaemonServer {
    Http(TracedServerAdapter<HttpServerAdapter>),
    Local(TracedServerAdapter<NoOpServerAdapter>),
}

impl DaemonServer {
    pub fn from_config(config: &DaemonConfig) -> Self {
        match &config.server.base_url {
            Some(url) => {
                tracing::info!(%url, "using management server");
                DaemonServer::Http(TracedServerAdapter::new(HttpServerAdapter::new(
                    url.clone(),
                    config.server.timeout,
                )))
            }
            None => {
                tracing::info!("no management server configured, local commands only");
                DaemonServer::Local(TracedServerAdapter::new(NoOpServerAdapter::new()))
            }
        }
    }
}

impl DaemonInstaller {
    pub fn from_config(config: &DaemonConfig) -> Self {
        if config.installer.dry_run {
            tracing::warn!("installer dry run: actions are reported without running");
            return DaemonInstaller::DryRun(TracedInstallAdapter::new(NoOpInstallAdapter::new()));
        }
        DaemonInstaller::Script(TracedInstallAdapter::new(ScriptInstallAdapter::new(
            config.installer.install.clone(),
            config.installer.uninstall.clone(),
        )))
    }
}

#[async_trait]
impl ServerAdapter for DaemonServer {
    async fn enroll(&self, device: &DeviceIdentity) -> Result<(), ServerError> {
        match self {
            DaemonServer::Http(s) => s.enroll(device).await,
            DaemonServer::Local(s) => s.enroll(device).await,
        }
    }

    async fn fetch_pending_commands(
        &self,
        device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError> {
        match self {
            DaemonServer::Http(s) => s.fetch_pending_commands(device_id).await,
            DaemonServer::Local(s) => s.fetch_pending_commands(device_id).await,
        }
    }

    async fn submit_results(
        &self,
        device_id: &str,
        entries: &[ResultEntry],
    ) -> Result<(), ServerError> {
        match self {
            DaemonServer::Http(s) => s.submit_results(device_id, entries).await,
            DaemonServer::Local(s) => s.submit_results(device_id, entries).await,
        }
    }

    async fn latest_release(&self) -> Result<Option<Release>, ServerError> {
        match self {
            DaemonServer::Http(s) => s.latest_release().await,
            DaemonServer::Local(s) => s.latest_release().await,
        }
    }

    async fn fetch_package(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ServerError> {
        match self {
            DaemonServer::Http(s) => s.fetch_package(url, dest_dir).await,
            DaemonServer::Local(s) => s.fetch_package(url, dest_dir).await,
        }
    }
}

#[async_trait]
impl InstallAdapter for DaemonInstaller {
    async fn install(
        &self,
        request: &InstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        match self {
            DaemonInstaller::Script(i) => i.install(request, sink).await,
            DaemonInstaller::DryRun(i) => i.install(request, sink).await,
        }
    }

    async fn uninstall(
        &self,
        request: &UninstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        match self {
            DaemonInstaller::Script(i) => i.uninstall(request, sink).await,
            DaemonInstaller::DryRun(i) => i.uninstall(request, sink).await,
        }
    }
}
