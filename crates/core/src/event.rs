// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit events emitted when an action settles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Info => write!(f, "info"),
            EventType::Warning => write!(f, "warning"),
            EventType::Error => write!(f, "error"),
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// What happened, e.g. "install"
    pub action: String,
    /// Kind of object acted upon, e.g. "app"
    pub resource_tag: String,
    pub object_name: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        event_type: EventType,
        action: impl Into<String>,
        resource_tag: impl Into<String>,
        object_name: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            action: action.into(),
            resource_tag: resource_tag.into(),
            object_name: object_name.into(),
            description: description.into(),
            timestamp,
        }
    }

    pub fn is_error(&self) -> bool {
        self.event_type == EventType::Error
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
