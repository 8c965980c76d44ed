// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::command::Command;
use crate::config::EngineConfig;
use crate::context::{Context, EngineDeps};
use crate::queue::Queued;
use dm_adapters::{FakeAppStore, FakeInstallAdapter, FakeServerAdapter};
use dm_core::{FakeClock, Version};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) type TestContext =
    Context<FakeAppStore, FakeServerAdapter, FakeInstallAdapter, FakeClock>;

pub(crate) const AGENT: &str = "com.example.agent";

pub(crate) fn test_config(dir: &Path) -> EngineConfig {
    EngineConfig {
        device_id: "device-1".to_string(),
        agent_package: AGENT.to_string(),
        agent_version: Version::new(10).with_name("1.0.0"),
        download_dir: dir.join("downloads"),
        require_enrollment: false,
        ..EngineConfig::default()
    }
}

pub(crate) struct Harness {
    pub(crate) store: FakeAppStore,
    pub(crate) server: FakeServerAdapter,
    pub(crate) installer: FakeInstallAdapter,
    pub(crate) clock: FakeClock,
    pub(crate) ctx: Arc<TestContext>,
    pub(crate) dir: TempDir,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub(crate) fn with_config(adjust: impl FnOnce(&mut EngineConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        adjust(&mut config);

        let store = FakeAppStore::new();
        let server = FakeServerAdapter::new();
        let installer = FakeInstallAdapter::new();
        let clock = FakeClock::new();
        let deps = EngineDeps {
            store: store.clone(),
            server: server.clone(),
            installer: installer.clone(),
        };
        let ctx = Arc::new(Context::new(deps, clock.clone(), config));
        Self {
            store,
            server,
            installer,
            clock,
            ctx,
            dir,
        }
    }

    pub(crate) fn command(&self, payload: Value) -> Command {
        Command::from_payload(payload, &self.ctx.config).unwrap()
    }

    pub(crate) fn submit(&self, payload: Value) {
        self.ctx.queues.submit(self.command(payload));
    }

    /// An accepted command with its in-flight guard, ready for a queue
    pub(crate) async fn accepted(&self, payload: Value) -> Queued {
        let mut command = self.command(payload);
        command.accept(&self.ctx).await.unwrap();
        Queued {
            command,
            guard: self.ctx.queues.in_flight.acquire(),
        }
    }

    pub(crate) fn local_file(&self, name: &str) -> Value {
        json!({ "type": "local_file", "path": self.dir.path().join(name) })
    }
}

pub(crate) fn install(id: &str, package: &str, source: Value) -> Value {
    json!({ "cmd": "install_app", "id": id, "package": package, "source": source })
}

pub(crate) fn uninstall(id: &str, package: &str) -> Value {
    json!({ "cmd": "uninstall_app", "id": id, "package": package })
}

/// Yield until `cond` holds
pub(crate) async fn settle(cond: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}
