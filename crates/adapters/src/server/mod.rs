// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream management server

mod http;
mod noop;

pub use http::HttpServerAdapter;
pub use noop::NoOpServerAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeServerAdapter, ServerCall};

use async_trait::async_trait;
use dm_core::{ResultEntry, Source, Version};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from server operations
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server not configured")]
    Unavailable,
}

/// Identity presented when enrolling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub agent_version: String,
}

/// A published build of the agent itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: Version,
    pub source: Source,
}

/// Adapter for the management server
#[async_trait]
pub trait ServerAdapter: Clone + Send + Sync + 'static {
    /// Register this device
    async fn enroll(&self, device: &DeviceIdentity) -> Result<(), ServerError>;

    /// Command payloads waiting for this device, in issue order
    async fn fetch_pending_commands(
        &self,
        device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError>;

    /// Report a batch of results
    async fn submit_results(
        &self,
        device_id: &str,
        entries: &[ResultEntry],
    ) -> Result<(), ServerError>;

    /// Latest published agent release, if any
    async fn latest_release(&self) -> Result<Option<Release>, ServerError>;

    /// Download a package into `dest_dir`, returning the local file path
    async fn fetch_package(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ServerError>;
}

/// File name for a package downloaded from `url`
pub(crate) fn download_name(url: &str) -> String {
    let last = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let clean: String = last
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let clean = clean.trim_start_matches('.');
    let unique = dm_core::ReferenceId::generate();
    if clean.is_empty() {
        format!("{}.pkg", unique)
    } else {
        format!("{}-{}", unique, clean)
    }
}
