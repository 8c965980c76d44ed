// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log

use crate::app::App;
use crate::id::AppId;
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Track a new app; `app.id` is already assigned
    AppInsert { app: App },

    /// Replace the stored record of an app
    AppUpdate { app: App },

    /// Stop tracking an app
    AppDelete { id: AppId },
}

impl Operation {
    /// The app this operation touches, if it carries an id
    pub fn app_id(&self) -> Option<AppId> {
        match self {
            Operation::AppInsert { app } | Operation::AppUpdate { app } => app.id,
            Operation::AppDelete { id } => Some(*id),
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
