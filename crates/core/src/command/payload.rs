// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound command payloads: `{ "cmd": <name>, <command-specific fields> }`

use crate::app::{Source, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors parsing an inbound command payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid command payload: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("command payload is missing \"cmd\"")]
    MissingCmd,
}

/// A parsed inbound command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CommandPayload {
    Enroll {
        #[serde(default)]
        id: Option<String>,
    },
    Sync {
        #[serde(default)]
        id: Option<String>,
    },
    InstallApp {
        #[serde(default)]
        id: Option<String>,
        package: String,
        source: Source,
        #[serde(default)]
        version: Option<Version>,
        #[serde(default)]
        remote_id: Option<String>,
    },
    UninstallApp {
        #[serde(default)]
        id: Option<String>,
        package: String,
    },
    SelfUpdate {
        #[serde(default)]
        id: Option<String>,
        source: Source,
        version: Version,
    },
}

impl CommandPayload {
    /// Parse a raw JSON payload
    pub fn parse(value: &serde_json::Value) -> Result<Self, PayloadError> {
        if value.get("cmd").is_none() {
            return Err(PayloadError::MissingCmd);
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// The upstream command or activity id, if the payload carries one
    pub fn id(&self) -> Option<&str> {
        match self {
            CommandPayload::Enroll { id }
            | CommandPayload::Sync { id }
            | CommandPayload::InstallApp { id, .. }
            | CommandPayload::UninstallApp { id, .. }
            | CommandPayload::SelfUpdate { id, .. } => id.as_deref(),
        }
    }

    /// The `cmd` name
    pub fn name(&self) -> &'static str {
        match self {
            CommandPayload::Enroll { .. } => "enroll",
            CommandPayload::Sync { .. } => "sync",
            CommandPayload::InstallApp { .. } => "install_app",
            CommandPayload::UninstallApp { .. } => "uninstall_app",
            CommandPayload::SelfUpdate { .. } => "self_update",
        }
    }

    /// Best-effort id extraction from a payload that failed to parse
    pub fn raw_id(value: &serde_json::Value) -> Option<String> {
        value.get("id").and_then(|v| v.as_str()).map(str::to_string)
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
