// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence of tracked apps

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAppStore, StoreCall};

use async_trait::async_trait;
use dm_core::{App, AppId};
use thiserror::Error;

/// Errors from app persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("app not found: {0}")]
    NotFound(AppId),
    #[error("app {0} has no local id")]
    MissingId(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Adapter for the app table
#[async_trait]
pub trait AppStore: Clone + Send + Sync + 'static {
    /// Every tracked app, ordered by local id
    async fn load_all(&self) -> Result<Vec<App>, StoreError>;

    /// Apps matching a package name, ordered by local id
    async fn find_by_package(&self, package: &str) -> Result<Vec<App>, StoreError>;

    /// Reload one app by local id
    async fn get(&self, id: AppId) -> Result<Option<App>, StoreError>;

    /// Persist a new app and return its assigned local id
    async fn insert(&self, app: &App) -> Result<AppId, StoreError>;

    /// Replace a stored app, returning the number of rows affected
    async fn update(&self, app: &App) -> Result<usize, StoreError>;

    /// Stop tracking an app
    async fn delete(&self, id: AppId) -> Result<(), StoreError>;
}
