// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory app store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AppStore, StoreError};
use async_trait::async_trait;
use dm_core::{App, AppId, Progress};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    LoadAll,
    FindByPackage { package: String },
    Get { id: AppId },
    Insert {
        package: String,
        progress: Option<Progress>,
    },
    Update {
        id: Option<AppId>,
        progress: Option<Progress>,
    },
    Delete { id: AppId },
}

#[derive(Default)]
struct FakeStoreState {
    apps: BTreeMap<AppId, App>,
    next_id: u64,
    fail_writes: bool,
}

/// In-memory app store that records calls
#[derive(Clone, Default)]
pub struct FakeAppStore {
    state: Arc<Mutex<FakeStoreState>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl FakeAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshot of every stored app
    pub fn apps(&self) -> Vec<App> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apps
            .values()
            .cloned()
            .collect()
    }

    /// The stored app for `package`, if exactly one exists
    pub fn app(&self, package: &str) -> Option<App> {
        let apps: Vec<App> = self
            .apps()
            .into_iter()
            .filter(|a| a.package == package)
            .collect();
        match apps.len() {
            1 => apps.into_iter().next(),
            _ => None,
        }
    }

    /// Lifecycle progress written by each insert and update, in order
    pub fn progress_log(&self, package: &str) -> Vec<Progress> {
        let ids: Vec<AppId> = self
            .apps()
            .iter()
            .filter(|a| a.package == package)
            .filter_map(|a| a.id)
            .collect();
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Insert {
                    package: p,
                    progress,
                } if p == package => progress,
                StoreCall::Update {
                    id: Some(id),
                    progress,
                } if ids.contains(&id) => progress,
                _ => None,
            })
            .collect()
    }

    /// Make every subsequent insert/update/delete fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_writes = fail;
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl AppStore for FakeAppStore {
    async fn load_all(&self) -> Result<Vec<App>, StoreError> {
        self.record(StoreCall::LoadAll);
        Ok(self.apps())
    }

    async fn find_by_package(&self, package: &str) -> Result<Vec<App>, StoreError> {
        self.record(StoreCall::FindByPackage {
            package: package.to_string(),
        });
        Ok(self
            .apps()
            .into_iter()
            .filter(|a| a.package == package)
            .collect())
    }

    async fn get(&self, id: AppId) -> Result<Option<App>, StoreError> {
        self.record(StoreCall::Get { id });
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apps
            .get(&id)
            .cloned())
    }

    async fn insert(&self, app: &App) -> Result<AppId, StoreError> {
        self.record(StoreCall::Insert {
            package: app.package.clone(),
            progress: app.lifecycle.progress(),
        });
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fail_writes {
            return Err(StoreError::Backend("write failed".to_string()));
        }
        state.next_id += 1;
        let id = AppId(state.next_id);
        let mut stored = app.clone();
        stored.id = Some(id);
        state.apps.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, app: &App) -> Result<usize, StoreError> {
        self.record(StoreCall::Update {
            id: app.id,
            progress: app.lifecycle.progress(),
        });
        let id = app
            .id
            .ok_or_else(|| StoreError::MissingId(app.package.clone()))?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fail_writes {
            return Err(StoreError::Backend("write failed".to_string()));
        }
        match state.apps.get_mut(&id) {
            Some(stored) => {
                *stored = app.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: AppId) -> Result<(), StoreError> {
        self.record(StoreCall::Delete { id });
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fail_writes {
            return Err(StoreError::Backend("write failed".to_string()));
        }
        state
            .apps
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
