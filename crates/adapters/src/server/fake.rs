// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake server adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{download_name, DeviceIdentity, Release, ServerAdapter, ServerError};
use async_trait::async_trait;
use dm_core::ResultEntry;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Recorded server call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCall {
    Enroll { device_id: String },
    FetchPendingCommands { device_id: String },
    SubmitResults { device_id: String, count: usize },
    LatestRelease,
    FetchPackage { url: String },
}

#[derive(Default)]
struct FakeServerState {
    enroll_failures: u32,
    pending: VecDeque<serde_json::Value>,
    submitted: Vec<ResultEntry>,
    submit_failures: u32,
    release: Option<Release>,
    packages: HashMap<String, Vec<u8>>,
}

/// Scriptable server adapter that records calls
#[derive(Clone, Default)]
pub struct FakeServerAdapter {
    state: Arc<Mutex<FakeServerState>>,
    calls: Arc<Mutex<Vec<ServerCall>>>,
}

impl FakeServerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ServerCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Fail the next `n` enroll calls
    pub fn fail_enroll(&self, n: u32) {
        self.lock().enroll_failures = n;
    }

    /// Fail the next `n` result submissions
    pub fn fail_submit(&self, n: u32) {
        self.lock().submit_failures = n;
    }

    /// Queue a payload for the next fetch
    pub fn push_command(&self, payload: serde_json::Value) {
        self.lock().pending.push_back(payload);
    }

    pub fn set_release(&self, release: Option<Release>) {
        self.lock().release = release;
    }

    /// Serve `bytes` when `url` is fetched
    pub fn set_package(&self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().packages.insert(url.to_string(), bytes.into());
    }

    /// Every successfully submitted result entry, in order
    pub fn submitted(&self) -> Vec<ResultEntry> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ServerCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl ServerAdapter for FakeServerAdapter {
    async fn enroll(&self, device: &DeviceIdentity) -> Result<(), ServerError> {
        self.record(ServerCall::Enroll {
            device_id: device.device_id.clone(),
        });
        let mut state = self.lock();
        if state.enroll_failures > 0 {
            state.enroll_failures -= 1;
            return Err(ServerError::Status(503));
        }
        Ok(())
    }

    async fn fetch_pending_commands(
        &self,
        device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError> {
        self.record(ServerCall::FetchPendingCommands {
            device_id: device_id.to_string(),
        });
        Ok(self.lock().pending.drain(..).collect())
    }

    async fn submit_results(
        &self,
        device_id: &str,
        entries: &[ResultEntry],
    ) -> Result<(), ServerError> {
        self.record(ServerCall::SubmitResults {
            device_id: device_id.to_string(),
            count: entries.len(),
        });
        let mut state = self.lock();
        if state.submit_failures > 0 {
            state.submit_failures -= 1;
            return Err(ServerError::Status(502));
        }
        state.submitted.extend_from_slice(entries);
        Ok(())
    }

    async fn latest_release(&self) -> Result<Option<Release>, ServerError> {
        self.record(ServerCall::LatestRelease);
        Ok(self.lock().release.clone())
    }

    async fn fetch_package(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ServerError> {
        self.record(ServerCall::FetchPackage {
            url: url.to_string(),
        });
        let bytes = self
            .lock()
            .packages
            .get(url)
            .cloned()
            .ok_or(ServerError::Status(404))?;
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(download_name(url));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
