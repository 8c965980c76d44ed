// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed app store

use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use async_trait::async_trait;
use dm_adapters::{AppStore, StoreError};
use dm_core::{App, AppId, Operation};
use std::path::Path;
use std::sync::{Arc, Mutex};

impl From<WalError> for StoreError {
    fn from(e: WalError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

impl Inner {
    /// Log first, then apply
    fn commit(&mut self, op: Operation) -> Result<(), StoreError> {
        self.wal.append(&op)?;
        self.state.apply(&op);
        Ok(())
    }
}

/// [`AppStore`] persisted to a JSON-lines write-ahead log
#[derive(Clone)]
pub struct WalAppStore {
    inner: Arc<Mutex<Inner>>,
}

impl WalAppStore {
    /// Open the log at `path`, replaying it into memory
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let wal = Wal::open(path)?;
        let ops = Wal::replay(path)?;
        let state = MaterializedState::from_ops(&ops);
        tracing::info!(
            path = %path.display(),
            ops = ops.len(),
            apps = state.apps.len(),
            "replayed app store"
        );
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { wal, state })),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AppStore for WalAppStore {
    async fn load_all(&self) -> Result<Vec<App>, StoreError> {
        Ok(self.lock().state.apps.values().cloned().collect())
    }

    async fn find_by_package(&self, package: &str) -> Result<Vec<App>, StoreError> {
        Ok(self
            .lock()
            .state
            .find_by_package(package)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn get(&self, id: AppId) -> Result<Option<App>, StoreError> {
        Ok(self.lock().state.apps.get(&id).cloned())
    }

    async fn insert(&self, app: &App) -> Result<AppId, StoreError> {
        let mut inner = self.lock();
        let id = inner.state.next_id();
        let mut stored = app.clone();
        stored.id = Some(id);
        inner.commit(Operation::AppInsert { app: stored })?;
        Ok(id)
    }

    async fn update(&self, app: &App) -> Result<usize, StoreError> {
        let id = app
            .id
            .ok_or_else(|| StoreError::MissingId(app.package.clone()))?;
        let mut inner = self.lock();
        if !inner.state.apps.contains_key(&id) {
            return Ok(0);
        }
        inner.commit(Operation::AppUpdate { app: app.clone() })?;
        Ok(1)
    }

    async fn delete(&self, id: AppId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.state.apps.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        inner.commit(Operation::AppDelete { id })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
