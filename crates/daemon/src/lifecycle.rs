// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::time::{Duration, Instant};

use dm_adapters::AppStore;
use dm_core::{Outcome, SystemClock};
use dm_engine::{Engine, EngineDeps, EngineError};
use dm_storage::WalAppStore;
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::{DaemonEngine, DaemonInstaller, DaemonServer};
use crate::config::{ConfigError, DaemonConfig, Paths};

/// Failure reason recorded for actions cut short by a restart
pub const INTERRUPTED_REASON: &str = "interrupted by restart";

/// How long shutdown waits for the engine to finish its current pass
const ENGINE_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Daemon state during operation
pub struct DaemonState {
    pub config: DaemonConfig,
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub engine: DaemonEngine,
    /// The engine's controller loop
    pub engine_task: JoinHandle<Result<(), EngineError>>,
    /// Set once `engine_task` has been awaited to completion
    pub engine_stopped: bool,
    /// When daemon started
    pub start_time: Instant,
    /// Shutdown requested flag
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop the engine after its current pass
        self.engine.shutdown();
        if !self.engine_stopped {
            match tokio::time::timeout(ENGINE_STOP_TIMEOUT, &mut self.engine_task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!("Engine stopped with error: {}", e),
                Ok(Err(e)) => warn!("Engine task failed: {}", e),
                Err(_) => {
                    warn!("Engine did not stop in time, aborting");
                    self.engine_task.abort();
                }
            }
            self.engine_stopped = true;
        }

        // 2. Remove socket file
        if self.paths.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 3. Remove PID file
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Remove version file
        if self.paths.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 5. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] dm_storage::WalError),

    #[error("Store error: {0}")]
    Store(#[from] dm_adapters::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Start the daemon
pub async fn startup(config: &DaemonConfig, paths: &Paths) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config, paths).await {
        Ok(state) => Ok(state),
        // The files belong to the daemon holding the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(paths);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(
    config: &DaemonConfig,
    paths: &Paths,
) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&paths.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    let mut lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Create directories
    if let Some(parent) = paths.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.engine.download_dir)?;

    // Write version file
    std::fs::write(&paths.version_path, env!("CARGO_PKG_VERSION"))?;

    // 4. Load tracked apps from WAL
    let store = WalAppStore::open(&paths.wal_path)?;
    reconcile_state(&store).await?;

    // 5. Set up adapters (wrapped with tracing for observability)
    let deps = EngineDeps {
        store,
        server: DaemonServer::from_config(config),
        installer: DaemonInstaller::from_config(config),
    };
    let engine = Engine::new(deps, SystemClock, config.engine.clone());

    // 6. Remove stale socket and bind (LAST - only after all validation passes)
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let listener = UnixListener::bind(&paths.socket_path)
        .map_err(|e| LifecycleError::BindFailed(paths.socket_path.clone(), e))?;

    // 7. Start the controller loop
    let engine_task = engine.start();

    info!(device_id = %config.engine.device_id, "Daemon started");

    Ok(DaemonState {
        config: config.clone(),
        paths: paths.clone(),
        lock_file,
        listener,
        engine,
        engine_task,
        engine_stopped: false,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths) {
    // Remove socket if we created it
    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }

    // Remove version file
    if paths.version_path.exists() {
        let _ = std::fs::remove_file(&paths.version_path);
    }

    // Remove PID/lock file
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Settle apps left mid-action by a previous run as interrupted
async fn reconcile_state(store: &WalAppStore) -> Result<(), LifecycleError> {
    let apps = store.load_all().await?;
    info!("Loaded state: {} apps", apps.len());

    let interrupted: Vec<_> = apps
        .into_iter()
        .filter(|a| a.lifecycle.is_in_progress())
        .collect();
    if interrupted.is_empty() {
        return Ok(());
    }

    warn!(
        "Found {} apps mid-action from previous session, marking interrupted",
        interrupted.len()
    );
    for mut app in interrupted {
        let progress = app.lifecycle.progress();
        match app.completed(
            Outcome::Error,
            Some(INTERRUPTED_REASON.to_string()),
            &SystemClock,
        ) {
            Ok(()) => {
                store.update(&app).await?;
                warn!("  - {}: {:?} interrupted", app.package, progress);
            }
            Err(e) => warn!("  - {}: cannot settle: {}", app.package, e),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
