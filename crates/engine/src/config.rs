// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration

use dm_core::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the controller, background handler and maintenance hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sleep between passes while not enrolled
    #[serde(with = "humantime_serde")]
    pub startup_interval: Duration,
    /// Sleep between passes once enrolled
    #[serde(with = "humantime_serde")]
    pub steady_interval: Duration,
    /// How long a blocking command may await its completion; `None` waits forever
    #[serde(with = "humantime_serde")]
    pub completion_timeout: Option<Duration>,
    pub enroll_max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub sync_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub self_update_interval: Duration,
    /// Where remote packages are downloaded
    pub download_dir: PathBuf,
    pub device_id: String,
    /// Package name of the agent itself
    pub agent_package: String,
    pub agent_version: Version,
    /// Hold all work except enrollment until the device is enrolled
    pub require_enrollment: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            startup_interval: Duration::from_secs(2),
            steady_interval: Duration::from_secs(60),
            completion_timeout: Some(Duration::from_secs(30 * 60)),
            enroll_max_attempts: 5,
            sync_interval: Duration::from_secs(15 * 60),
            self_update_interval: Duration::from_secs(6 * 60 * 60),
            download_dir: std::env::temp_dir().join("dmd-downloads"),
            device_id: String::new(),
            agent_package: "dmd".to_string(),
            agent_version: Version::new(0).with_name(env!("CARGO_PKG_VERSION")),
            require_enrollment: true,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
