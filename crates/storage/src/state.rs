// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use dm_core::{App, AppId, Operation};
use std::collections::BTreeMap;

/// Materialized state built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub apps: BTreeMap<AppId, App>,
}

impl MaterializedState {
    /// Rebuild state from a sequence of operations
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut state = Self::default();
        for op in ops {
            state.apply(op);
        }
        state
    }

    /// Apps for a package, in local id order
    pub fn find_by_package(&self, package: &str) -> Vec<&App> {
        self.apps
            .values()
            .filter(|app| app.package == package)
            .collect()
    }

    /// Next local id: one past the highest stored id
    pub fn next_id(&self) -> AppId {
        AppId(self.apps.keys().next_back().map(|id| id.0).unwrap_or(0) + 1)
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::AppInsert { app } => match app.id {
                Some(id) => {
                    self.apps.insert(id, app.clone());
                }
                None => tracing::warn!(package = %app.package, "ignoring insert without id"),
            },

            Operation::AppUpdate { app } => {
                if let Some(stored) = app.id.and_then(|id| self.apps.get_mut(&id)) {
                    *stored = app.clone();
                }
            }

            Operation::AppDelete { id } => {
                self.apps.remove(id);
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
