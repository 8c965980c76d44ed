// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! ```toml
//! state_dir = "/var/lib/dmd"
//!
//! [engine]
//! device_id = "device-42"
//! steady_interval = "1m"
//!
//! [server]
//! base_url = "https://mdm.example.com/api"
//! timeout = "30s"
//!
//! [installer]
//! install = "pkg-install {file}"
//! uninstall = "pkg-remove {package}"
//! dry_run = false
//! ```

use dm_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not determine state directory")]
    NoStateDir,
}

/// Management server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Without a base URL commands arrive only over the local socket
    pub base_url: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Shell command templates for the platform installer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub install: String,
    pub uninstall: String,
    /// Report every action as succeeded without touching the system
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Defaults to `$XDG_STATE_HOME/dmd` or `~/.local/state/dmd`
    pub state_dir: Option<PathBuf>,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub installer: InstallerConfig,
}

impl DaemonConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read(path.to_path_buf(), e)),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Resolve every on-disk location the daemon uses
    pub fn paths(&self) -> Result<Paths, ConfigError> {
        let state_dir = match &self.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        Ok(Paths::new(state_dir))
    }
}

/// On-disk layout under the state directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    /// Lock file holding the daemon's PID
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub wal_path: PathBuf,
}

impl Paths {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("dmd.sock"),
            lock_path: state_dir.join("dmd.pid"),
            version_path: state_dir.join("dmd.version"),
            log_path: state_dir.join("dmd.log"),
            wal_path: state_dir.join("wal").join("apps.wal"),
            state_dir,
        }
    }
}

fn default_state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("dmd"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/dmd"))
}

/// Config file location: `$DMD_CONFIG`, else `$XDG_CONFIG_HOME/dmd/config.toml`
/// or `~/.config/dmd/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("DMD_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("dmd/config.toml"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".config/dmd/config.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
